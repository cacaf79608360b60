//! # Meditera Core Library
//!
//! This library provides the core logic for the Meditera guided workout app.
//! The presentation layer (the mobile UI, or the bundled CLI) renders the
//! state published here and forwards user intents.
//!
//! ## Architecture
//!
//! - **Session Timer**: A tick-driven state machine alternating exercise and
//!   rest phases through a routine
//! - **Session Handle**: Owns a running timer on a tokio interval and
//!   publishes events on a channel
//! - **Progress Tracker**: Counts completed workouts and awards achievements
//! - **Store**: Account/profile store trait with in-memory and SQLite backends
//! - **Storage**: TOML configuration and the SQLite store
//!
//! ## Key Components
//!
//! - [`SessionTimer`]: Core session state machine
//! - [`SessionHandle`]: Cancellable owner of a running session
//! - [`ProgressTracker`]: Workout count and achievement rules
//! - [`AccountStore`]: Trait for account backends
//! - [`Config`]: Application configuration management

pub mod auth;
pub mod error;
pub mod events;
pub mod progress;
pub mod session;
pub mod storage;
pub mod store;

pub use auth::{AuthState, Authenticator};
pub use error::{AuthError, ConfigError, CoreError, DatabaseError, PersistenceError, ValidationError};
pub use events::Event;
pub use progress::{
    Achievement, AchievementKind, ProgressRecord, ProgressTracker, RetryPolicy, TrackerSink,
    WorkoutRecord,
};
pub use session::{
    CompletionSink, Exercise, Phase, Routine, SessionConfig, SessionHandle, SessionSnapshot,
    SessionStatus, SessionTimer,
};
pub use storage::{Config, SqliteStore};
pub use store::{AccountStore, MemoryStore, UserId};
