//! Core error types for meditera-core.
//!
//! Every error is scoped to a single user action. Authentication errors are
//! shown to the user, persistence errors may be retried, and validation
//! errors reject a workout before it starts.

use std::path::PathBuf;
use thiserror::Error;

use crate::store::UserId;

/// Core error type for meditera-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Sign-up / sign-in failures
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Account store failures
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

impl CoreError {
    /// Whether retrying the same call could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, CoreError::Persistence(e) if e.is_transient())
    }
}

/// Authentication errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Unknown email or wrong password
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// An account already exists for this email
    #[error("An account already exists for {0}")]
    EmailInUse(String),

    /// Email is not shaped like an address
    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    /// Password shorter than the minimum length
    #[error("Password must be at least {min_len} characters")]
    WeakPassword { min_len: usize },

    /// Operation requires a signed-in user
    #[error("Not signed in")]
    NotSignedIn,
}

/// Account store errors.
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// Backend temporarily unreachable
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// No profile document for this user
    #[error("Unknown user: {0}")]
    UnknownUser(UserId),

    /// Underlying database failure
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Retry policy gave up
    #[error("Giving up after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<CoreError>,
    },
}

impl PersistenceError {
    /// Unavailable backends and locked databases are worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PersistenceError::Unavailable(_) | PersistenceError::Database(DatabaseError::Locked)
        )
    }
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Stored row could not be decoded
    #[error("Corrupt row in {table}: {message}")]
    CorruptRow { table: String, message: String },

    /// Database is locked
    #[error("Database is locked")]
    Locked,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown dot-path key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Home directory could not be resolved
    #[error("Could not determine data directory")]
    NoDataDir,
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Empty collection
    #[error("Empty collection: {0}")]
    EmptyCollection(String),

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

// Helper implementations for converting from other error types

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg)
                if matches!(
                    e.code,
                    rusqlite::ErrorCode::DatabaseLocked | rusqlite::ErrorCode::DatabaseBusy
                ) =>
            {
                DatabaseError::Locked
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Persistence(PersistenceError::Database(err.into()))
    }
}

impl From<DatabaseError> for CoreError {
    fn from(err: DatabaseError) -> Self {
        CoreError::Persistence(PersistenceError::Database(err))
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
