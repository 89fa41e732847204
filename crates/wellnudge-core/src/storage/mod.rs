mod activity;
mod config;

pub use activity::{ActivityDb, ActivityRecord, WaterRecord};
pub use config::{Config, EngineSettingsConfig, FilePreferenceStore};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/wellnudge[-dev]/`, or `WELLNUDGE_DATA_DIR` when set.
///
/// Set WELLNUDGE_ENV=dev to use the development data directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("WELLNUDGE_DATA_DIR") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("WELLNUDGE_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("wellnudge-dev")
            } else {
                base_dir.join("wellnudge")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
