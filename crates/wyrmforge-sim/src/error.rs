//! Aggregate error type for the simulation core.

use thiserror::Error;
use wyrmforge_common::{SnapshotError, VersionError};

use crate::crafting::CraftingError;
use crate::economy::EconomyError;
use crate::gear::GearError;
use crate::progression::ProgressionError;
use crate::runes::RuneError;
use crate::travel::TravelError;

/// Any error a simulation operation can report.
#[derive(Debug, Error)]
pub enum SimError {
    /// Currency errors
    #[error(transparent)]
    Economy(#[from] EconomyError),
    /// Travel state machine errors
    #[error(transparent)]
    Travel(#[from] TravelError),
    /// Gear errors
    #[error(transparent)]
    Gear(#[from] GearError),
    /// Rune socketing errors
    #[error(transparent)]
    Rune(#[from] RuneError),
    /// Crafting errors
    #[error(transparent)]
    Crafting(#[from] CraftingError),
    /// Level and encounter errors
    #[error(transparent)]
    Progression(#[from] ProgressionError),
    /// Snapshot decoding errors
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
    /// Schema version errors
    #[error(transparent)]
    Version(#[from] VersionError),
}

/// Result type for simulation operations.
pub type SimResult<T> = Result<T, SimError>;
