//! Core error types for scroll2study-core.
//!
//! This module defines the error hierarchy using thiserror. Tracking
//! operations surface these to the caller and abandon the pending write;
//! nothing here retries on its own.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for scroll2study-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// No credential, an invalid credential, or the session signed out
    #[error("Not authenticated: {0}")]
    NotAuthenticated(String),

    /// Referenced catalog item or document is missing
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Backing store or remote service failure
    #[error("Remote error from '{service}' (status {status:?}): {message}")]
    Remote {
        service: String,
        status: Option<u16>,
        message: String,
    },

    /// A document or remote response was not in the expected shape
    #[error("Parse error: {0}")]
    Parse(String),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn remote(service: &str, status: Option<u16>, message: impl Into<String>) -> Self {
        CoreError::Remote {
            service: service.to_string(),
            status,
            message: message.into(),
        }
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

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// Another writer got there first; the write was rolled back
    #[error("Write conflict: {0}")]
    Conflict(String),
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

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Missing required configuration key
    #[error("Missing required configuration key: {0}")]
    MissingKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Validation errors.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    /// Email address rejected by the local rules
    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    /// Password rejected by the local rules
    #[error("Invalid password: {0}")]
    InvalidPassword(String),

    /// Two catalog items claim the same grid cell
    #[error("Duplicate catalog cell ({subject}, level {level}): '{existing}' and '{duplicate}'")]
    DuplicateCell {
        subject: String,
        level: u32,
        existing: String,
        duplicate: String,
    },

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

// Helper implementations for converting from other error types

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseBusy
                    || err.code == rusqlite::ErrorCode::DatabaseLocked
                {
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

impl From<reqwest::Error> for CoreError {
    fn from(err: reqwest::Error) -> Self {
        CoreError::remote(
            "http",
            err.status().map(|s| s.as_u16()),
            err.to_string(),
        )
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
