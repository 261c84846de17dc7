//! ID types for items, runes, recipes and sets.
//!
//! Snapshot ids are plain strings (`gear_12`, `rune_3`, `iron_helm`) so saves
//! written by older builds keep resolving.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates an id from any string-like value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the id as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }
    };
}

string_id!(
    /// Unique identifier for a gear piece. Preserved across inventory/equip moves.
    GearId
);

string_id!(
    /// Unique identifier for a rune.
    RuneId
);

string_id!(
    /// Identifier of a crafting recipe.
    RecipeId
);

string_id!(
    /// Identifier of a gear set.
    SetId
);

/// Monotonic id allocator persisted with the game state.
///
/// A single counter feeds every generated id so two items never share one,
/// whatever their kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdSequence(u64);

impl Default for IdSequence {
    fn default() -> Self {
        Self(1)
    }
}

impl IdSequence {
    /// Creates a sequence starting at the given raw value.
    #[must_use]
    pub const fn starting_at(next: u64) -> Self {
        Self(next)
    }

    /// Returns the raw value the next allocation will use.
    #[must_use]
    pub const fn peek(self) -> u64 {
        self.0
    }

    fn bump(&mut self) -> u64 {
        let id = self.0;
        self.0 = self.0.saturating_add(1);
        id
    }

    /// Allocates a new gear id.
    pub fn next_gear_id(&mut self) -> GearId {
        GearId(format!("gear_{}", self.bump()))
    }

    /// Allocates a new rune id.
    pub fn next_rune_id(&mut self) -> RuneId {
        RuneId(format!("rune_{}", self.bump()))
    }
}
