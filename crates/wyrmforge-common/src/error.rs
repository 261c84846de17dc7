//! Error types shared across Wyrmforge crates.

use thiserror::Error;

use crate::version::VersionError;

/// Errors raised while reading, migrating or writing a state snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Schema version problem
    #[error("Version error: {0}")]
    Version(#[from] VersionError),

    /// Snapshot is not a JSON object
    #[error("Invalid snapshot: {0}")]
    InvalidFormat(String),
}

/// Result type alias for snapshot operations.
pub type SnapshotResult<T> = Result<T, SnapshotError>;
