//! Account/profile store abstraction.
//!
//! A store is a document service keyed by user id holding credentials, a
//! scalar workout count and an append-only achievement list. The hosted
//! backend stays behind this trait; [`MemoryStore`] is the in-process fake
//! and `storage::SqliteStore` the local persistent implementation.

mod credentials;
mod memory;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use credentials::{normalize_email, validate_password, PasswordHash, MIN_PASSWORD_LEN};
pub use memory::MemoryStore;

use crate::error::Result;
use crate::progress::{Achievement, ProgressRecord};

/// Opaque account identifier issued by the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Every account backend implements this trait.
///
/// Calls are blocking; callers that must not stall (the session tick loop)
/// dispatch them onto a blocking pool.
pub trait AccountStore: Send + Sync {
    /// Register credentials and create an empty profile.
    fn create_user(&self, email: &str, password: &str) -> Result<UserId>;

    /// Check credentials. Unknown emails and wrong passwords are indistinguishable.
    fn sign_in(&self, email: &str, password: &str) -> Result<UserId>;

    /// End the backend session for `user_id`.
    fn sign_out(&self, _user_id: &UserId) -> Result<()> {
        Ok(()) // default no-op
    }

    fn workout_count(&self, user_id: &UserId) -> Result<u32>;

    fn set_workout_count(&self, user_id: &UserId, count: u32) -> Result<()>;

    /// Append to the user's achievement list. Appending an id that is
    /// already stored is a no-op, so retries cannot duplicate.
    fn append_achievement(&self, user_id: &UserId, achievement: &Achievement) -> Result<()>;

    /// Achievements in award order.
    fn achievements(&self, user_id: &UserId) -> Result<Vec<Achievement>>;

    fn progress(&self, user_id: &UserId) -> Result<ProgressRecord> {
        Ok(ProgressRecord {
            user_id: user_id.clone(),
            workout_count: self.workout_count(user_id)?,
            achievements: self.achievements(user_id)?,
        })
    }
}
