pub mod account;
pub mod config;
pub mod progress;
pub mod routine;
pub mod workout;

use std::sync::Arc;

use meditera_core::{Authenticator, Config, ProgressTracker, SqliteStore};

pub type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Store, auth state and tracker for one CLI invocation.
pub struct Context {
    pub store: Arc<SqliteStore>,
    pub auth: Authenticator<SqliteStore>,
    pub tracker: Arc<ProgressTracker<SqliteStore>>,
}

impl Context {
    /// Open the database and resume the persisted sign-in.
    pub fn open(config: &Config) -> Result<Self, Box<dyn std::error::Error>> {
        let store = Arc::new(SqliteStore::open()?);
        let auth = Authenticator::restore(Arc::clone(&store), store.current_user()?);
        let tracker =
            Arc::new(ProgressTracker::new(Arc::clone(&store)).with_retry(config.retry));
        Ok(Self {
            store,
            auth,
            tracker,
        })
    }
}

pub fn print_json<T: serde::Serialize>(value: &T) -> CommandResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
