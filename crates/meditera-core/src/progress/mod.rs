mod achievement;
mod retry;
mod tracker;

pub use achievement::{Achievement, AchievementKind, ProgressRecord};
pub use retry::RetryPolicy;
pub use tracker::{ProgressTracker, TrackerSink, WorkoutRecord};
