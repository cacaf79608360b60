mod engine;
mod handle;
mod routine;

pub use engine::{Phase, SessionConfig, SessionSnapshot, SessionStatus, SessionTimer};
pub use handle::{CompletionSink, SessionHandle};
pub use routine::{Exercise, Routine};
