//! Core error types for wellnudge-core.
//!
//! The reminder engine itself never fails a tick: collaborator failures are
//! logged and absorbed. These types cover the fallible edges around it --
//! configuration files, the activity database, notification registration and
//! the runtime command channel.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for wellnudge-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// External notification channel errors
    #[error("Notification error: {0}")]
    Notification(#[from] NotificationError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The engine task has shut down and no longer accepts commands
    #[error("Reminder engine is no longer running")]
    EngineStopped,
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

    /// Data directory could not be resolved or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Errors reported by a `NotificationChannel` implementation.
#[derive(Error, Debug)]
pub enum NotificationError {
    /// The platform refused to schedule the trigger (e.g. permission revoked)
    #[error("Trigger '{id}' was rejected: {reason}")]
    Rejected { id: String, reason: String },

    /// The channel has been shut down
    #[error("Notification channel closed")]
    Closed,
}

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Unknown reminder category name
    #[error("Unknown reminder category '{0}' (expected water, eye_rest or movement)")]
    UnknownCategory(String),

    /// Malformed trigger identifier
    #[error("Malformed trigger id '{0}'")]
    MalformedTriggerId(String),

    /// Malformed wall-clock time
    #[error("Invalid time of day '{0}' (expected HH:MM)")]
    InvalidTimeOfDay(String),

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseLocked {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notification_error_converts_into_core_error() {
        let err: CoreError = NotificationError::Rejected {
            id: "water-g1-0".into(),
            reason: "permission denied".into(),
        }
        .into();
        assert!(matches!(err, CoreError::Notification(_)));
        assert!(err.to_string().contains("water-g1-0"));
    }

    #[test]
    fn validation_error_message_names_the_category() {
        let err = ValidationError::UnknownCategory("coffee".into());
        assert!(err.to_string().contains("coffee"));
    }
}
