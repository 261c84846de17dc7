//! The game state aggregate.
//!
//! Everything persisted between sessions lives in [`GameState`]. Subsystems
//! extend it with `impl GameState` blocks in their own modules.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use wyrmforge_common::{IdSequence, CURRENT_SCHEMA_VERSION};

use crate::crafting::{default_recipes, CraftingRecipe};
use crate::economy::{Currencies, Upgrades};
use crate::gear::{starter_gear, GearPiece, GearSlot};
use crate::materials::MaterialStock;
use crate::progression::level_distance_target;
use crate::runes::Rune;
use crate::sets::{default_sets, GearSet};
use crate::stats::DragonStats;
use crate::travel::TravelState;

/// Region every new game starts in.
pub const STARTING_REGION: &str = "Dragonspire Mountains";

/// World map progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorldMap {
    /// Levels the player may select
    pub unlocked_levels: Vec<u32>,
    /// Levels completed at least once, without duplicates
    pub completed_levels: Vec<u32>,
    /// Region name
    pub current_region: String,
    /// Boss respawn timers by level, unix ms
    pub boss_timers: BTreeMap<u32, u64>,
}

impl Default for WorldMap {
    fn default() -> Self {
        Self {
            unlocked_levels: vec![1],
            completed_levels: Vec::new(),
            current_region: STARTING_REGION.to_string(),
            boss_timers: BTreeMap::new(),
        }
    }
}

impl WorldMap {
    /// Records a completed level. Returns `false` if it was already recorded.
    pub fn record_completed(&mut self, level: u32) -> bool {
        if self.completed_levels.contains(&level) {
            return false;
        }
        self.completed_levels.push(level);
        true
    }

    /// Unlocks a level. Returns `false` if it was already unlocked.
    pub fn unlock(&mut self, level: u32) -> bool {
        if self.unlocked_levels.contains(&level) {
            return false;
        }
        self.unlocked_levels.push(level);
        true
    }

    /// Checks whether a level is unlocked.
    #[must_use]
    pub fn is_unlocked(&self, level: u32) -> bool {
        self.unlocked_levels.contains(&level)
    }
}

/// Encounter progress on the current level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LevelState {
    /// Enemy quota
    pub total_enemies: u32,
    /// Enemies spawned so far
    pub enemies_spawned: u32,
    /// Enemies defeated so far
    pub enemies_defeated: u32,
    /// Quota reached
    pub is_complete: bool,
    /// Every tenth level is a boss level
    pub is_boss_level: bool,
}

/// The root game state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GameState {
    /// Snapshot schema version
    pub schema_version: u32,
    /// Unix ms of the last simulation step
    pub last_tick_ms: u64,
    /// Simulated play time
    pub playtime_sec: f64,

    /// Current level, starting at 1
    pub current_level: u32,
    /// Distance over all levels
    pub total_distance: f64,
    /// Distance on the current level
    pub level_distance: f64,
    /// Distance the current level requires
    pub level_distance_target: f64,
    /// Travel mode
    pub travel_state: TravelState,
    /// Enemies defeated over the whole game
    pub enemies_defeated: u64,
    /// Bosses defeated over the whole game
    pub bosses_defeated: u64,
    /// World map progress
    pub world_map: WorldMap,
    /// Current encounter
    pub current_level_state: LevelState,

    /// Currency balances
    pub currencies: Currencies,
    /// Upgrade levels
    pub upgrades: Upgrades,
    /// Derived stats
    pub dragon_stats: DragonStats,

    /// Equipped pieces, at most one per slot
    pub equipped_gear: BTreeMap<GearSlot, GearPiece>,
    /// Unequipped pieces
    pub inventory: Vec<GearPiece>,
    /// Material counts
    pub materials: MaterialStock,
    /// Crafting recipes
    pub recipes: Vec<CraftingRecipe>,
    /// Gear sets
    pub available_sets: Vec<GearSet>,
    /// Runes not in any socket
    pub rune_inventory: Vec<Rune>,
    /// Allocator for gear and rune ids
    pub id_sequence: IdSequence,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new(0)
    }
}

impl GameState {
    /// Creates a fresh game at level 1 with the starter gear.
    #[must_use]
    pub fn new(now_ms: u64) -> Self {
        let mut id_sequence = IdSequence::default();
        let inventory = starter_gear(&mut id_sequence);

        let mut state = Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            last_tick_ms: now_ms,
            playtime_sec: 0.0,
            current_level: 1,
            total_distance: 0.0,
            level_distance: 0.0,
            level_distance_target: level_distance_target(1),
            travel_state: TravelState::default(),
            enemies_defeated: 0,
            bosses_defeated: 0,
            world_map: WorldMap::default(),
            current_level_state: LevelState::default(),
            currencies: Currencies::default(),
            upgrades: Upgrades::default(),
            dragon_stats: DragonStats::default(),
            equipped_gear: BTreeMap::new(),
            inventory,
            materials: MaterialStock::default(),
            recipes: default_recipes(),
            available_sets: default_sets(),
            rune_inventory: Vec::new(),
            id_sequence,
        };
        state.reset_encounter();
        state.refresh_stats();
        state
    }

    /// Serializes the state to a JSON value.
    pub fn to_snapshot(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_state_defaults() {
        let state = GameState::new(1_000);
        assert_eq!(state.schema_version, CURRENT_SCHEMA_VERSION);
        assert_eq!(state.last_tick_ms, 1_000);
        assert_eq!(state.current_level, 1);
        assert!((state.level_distance_target - 15_000.0).abs() < f64::EPSILON);
        assert_eq!(state.travel_state, TravelState::Hovering);
        assert_eq!(state.world_map.unlocked_levels, vec![1]);
        assert_eq!(state.current_level_state.total_enemies, 25);
        assert!(!state.current_level_state.is_boss_level);
        assert_eq!(state.recipes.len(), 5);
        assert_eq!(state.available_sets.len(), 3);
    }

    #[test]
    fn test_snapshot_field_names() {
        let state = GameState::new(0);
        let json = state.to_snapshot().expect("serialize");
        assert_eq!(json["schemaVersion"], CURRENT_SCHEMA_VERSION);
        assert_eq!(json["travelState"], "HOVERING");
        assert_eq!(json["levelDistanceTarget"], 15_000.0);
        assert_eq!(json["worldMap"]["currentRegion"], STARTING_REGION);
        assert_eq!(json["currencies"]["steak"]["unlocked"], true);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut state = GameState::new(42);
        state.level_distance = 321.5;
        state.world_map.record_completed(1);

        let json = serde_json::to_string(&state).expect("serialize");
        let back: GameState = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, state);
    }

    #[test]
    fn test_world_map_idempotent() {
        let mut map = WorldMap::default();
        assert!(map.record_completed(3));
        assert!(!map.record_completed(3));
        assert_eq!(map.completed_levels, vec![3]);
        assert!(!map.unlock(1));
        assert!(map.unlock(2));
        assert!(map.is_unlocked(2));
    }
}
