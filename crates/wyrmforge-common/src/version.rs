//! Snapshot schema versions.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Current snapshot schema version.
pub const CURRENT_SCHEMA_VERSION: u32 = 5;

/// Oldest schema version the migration pipeline understands.
///
/// Snapshots without a version tag are treated as this version.
pub const MIN_SUPPORTED_VERSION: u32 = 1;

/// Errors related to snapshot versioning.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VersionError {
    /// Snapshot written by a newer build.
    #[error("Snapshot version {found} is from a newer game version (current: {current})")]
    TooNew {
        /// Found version.
        found: u32,
        /// Current supported version.
        current: u32,
    },

    /// Migration step failed.
    #[error("Failed to migrate from version {from} to {to}: {reason}")]
    MigrationFailed {
        /// Source version.
        from: u32,
        /// Target version.
        to: u32,
        /// Reason for failure.
        reason: String,
    },
}

/// Result type for version operations.
pub type VersionResult<T> = Result<T, VersionError>;

/// Compatibility of a snapshot with this build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VersionCompatibility {
    /// Same version, loads as is.
    Full,
    /// Older version, migrated forward on load.
    MigrationRequired,
    /// Newer version, cannot be loaded.
    Incompatible,
}

impl VersionCompatibility {
    /// Checks if the snapshot can be loaded.
    #[must_use]
    pub fn can_load(self) -> bool {
        !matches!(self, Self::Incompatible)
    }

    /// Checks if migration is needed.
    #[must_use]
    pub fn needs_migration(self) -> bool {
        matches!(self, Self::MigrationRequired)
    }
}

/// Checks compatibility between a snapshot version and the current version.
#[must_use]
pub fn check_compatibility(version: u32) -> VersionCompatibility {
    if version == CURRENT_SCHEMA_VERSION {
        VersionCompatibility::Full
    } else if version < CURRENT_SCHEMA_VERSION {
        VersionCompatibility::MigrationRequired
    } else {
        VersionCompatibility::Incompatible
    }
}

/// Validates that a snapshot can be loaded with the current version.
pub fn validate_version(version: u32) -> VersionResult<VersionCompatibility> {
    match check_compatibility(version) {
        VersionCompatibility::Incompatible => Err(VersionError::TooNew {
            found: version,
            current: CURRENT_SCHEMA_VERSION,
        }),
        compat => Ok(compat),
    }
}
