//! # Wyrmforge Sim
//!
//! The simulation core of Wyrmforge, an idle dragon game.
//!
//! This crate owns the game state and every rule that mutates it:
//! - Economy (currencies, upgrade costs)
//! - Progression (distance, levels, encounters, enemies)
//! - Travel state machine
//! - Itemization (gear, sets, runes, materials, loot tables)
//! - Crafting
//! - Snapshot migration
//! - The engine instance and its command gateway
//!
//! Nothing here performs I/O. Time comes from a [`Clock`] and randomness from
//! a seedable generator, so a run is reproducible.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod clock;
pub mod crafting;
pub mod economy;
pub mod engine;
pub mod error;
pub mod events;
pub mod gateway;
pub mod gear;
pub mod loot;
pub mod materials;
pub mod migration;
pub mod progression;
pub mod runes;
pub mod sets;
pub mod state;
pub mod stats;
pub mod travel;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::clock::*;
    pub use crate::crafting::*;
    pub use crate::economy::*;
    pub use crate::engine::*;
    pub use crate::error::*;
    pub use crate::events::*;
    pub use crate::gateway::*;
    pub use crate::gear::*;
    pub use crate::loot::*;
    pub use crate::materials::*;
    pub use crate::migration::*;
    pub use crate::progression::*;
    pub use crate::runes::*;
    pub use crate::sets::*;
    pub use crate::state::*;
    pub use crate::stats::*;
    pub use crate::travel::*;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_game_through_gateway() {
        let mut engine = Engine::builder()
            .seed(1)
            .clock(ManualClock::new(0))
            .build();
        let outcome = engine.handle(Command::Init { state: None });
        assert!(outcome.success);

        engine.handle(Command::StartTravel);
        let events = engine.advance(15_000.0 / engine.state().travel_speed() + 1.0);
        assert_eq!(events.len(), 1);
        assert_eq!(engine.state().current_level, 2);
        assert!(engine.state().world_map.completed_levels.contains(&1));
        assert_eq!(engine.state().currencies.balance_of(CurrencyKey::Steak), 75);
    }
}
