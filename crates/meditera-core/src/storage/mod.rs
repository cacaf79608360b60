mod config;
pub mod database;
pub mod migrations;

pub use config::{Config, LogConfig, WorkoutConfig};
pub use database::SqliteStore;

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/meditera[-dev]/` based on MEDITERA_ENV.
///
/// Set MEDITERA_ENV=dev to use development data directory, or
/// MEDITERA_DATA_DIR to use an explicit directory.
///
/// # Errors
/// Returns an error if the directory cannot be created.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("MEDITERA_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir().ok_or(ConfigError::NoDataDir)?.join(".config");
            let env = std::env::var("MEDITERA_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("meditera-dev")
            } else {
                base_dir.join("meditera")
            }
        }
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::LoadFailed {
        path: dir.clone(),
        message: e.to_string(),
    })?;
    Ok(dir)
}
