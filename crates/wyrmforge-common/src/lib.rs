//! # Wyrmforge Common
//!
//! Common types shared by the Wyrmforge crates:
//! - ID types (GearId, RuneId, RecipeId, SetId)
//! - Snapshot schema versions
//! - Snapshot error types

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod error;
pub mod ids;
pub mod version;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::*;
    pub use crate::ids::*;
    pub use crate::version::*;
}

pub use prelude::*;
