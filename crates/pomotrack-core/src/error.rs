//! Core error types for pomotrack-core.
//!
//! One `thiserror` hierarchy covers the whole library. The four request-level
//! variants (`InvalidTransition`, `Conflict`, `Policy`, `NotFound`) are always
//! reported to the caller as-is; the core never retries internally.

use std::path::PathBuf;
use thiserror::Error;

use crate::session::SessionStatus;

/// Core error type for pomotrack-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// The requested session transition is not legal from the current status.
    #[error("cannot {action} a session that is {status}")]
    InvalidTransition {
        action: &'static str,
        status: SessionStatus,
    },

    /// The owner already has an active (running or paused) session.
    #[error("an active session already exists for '{owner}'")]
    Conflict { owner: String },

    /// The task has already fulfilled its estimated work intervals.
    #[error("task '{task_id}' has already completed all estimated pomodoros")]
    Policy { task_id: String },

    /// Referenced session or task is absent or not owned by the caller.
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    /// Database-related errors
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("database is locked")]
    Locked,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
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
