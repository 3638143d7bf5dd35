//! Error types for jsondb operations

use std::path::PathBuf;

use thiserror::Error;

use crate::identity::EntryId;

/// Storage layer errors.
///
/// Serialization and I/O failures keep the underlying error as their source;
/// nothing is recovered locally.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Entry not found: {id}")]
    NotFound { id: EntryId },

    #[error("Invalid entry id {id:?}: {reason}")]
    InvalidId { id: String, reason: String },

    #[error("Serialization failed for entry {id}: {source}")]
    Serialization {
        id: EntryId,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Scanner is not positioned on an entry ({state})")]
    ScannerNotPositioned { state: &'static str },
}

impl StorageError {
    /// Whether this error is the canonical "no record for this id" signal.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }

    /// The id a NotFound error refers to.
    pub fn not_found_id(&self) -> Option<&EntryId> {
        match self {
            StorageError::NotFound { id } => Some(id),
            _ => None,
        }
    }

    /// Wrap an I/O error with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all jsondb errors.
#[derive(Debug, Error)]
pub enum JsonDbError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl JsonDbError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, JsonDbError::Storage(e) if e.is_not_found())
    }
}

/// Result type alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type alias for jsondb operations.
pub type JsonDbResult<T> = Result<T, JsonDbError>;

// =============================================================================
// TESTS
// =============================================================================
