//! Progression: distance accrual, level completion, encounters and enemies.

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::economy::CurrencyKey;
use crate::loot::{EnemyKind, Reward};
use crate::state::{GameState, LevelState};

/// Distance the first level requires, in meters.
pub const BASE_LEVEL_DISTANCE: f64 = 15_000.0;
/// Extra distance each further level requires.
pub const LEVEL_DISTANCE_STEP: f64 = 3_000.0;
/// Travel speed at a zero fire rate multiplier, meters per second.
pub const BASE_TRAVEL_SPEED: f64 = 10.0;
/// How strongly the fire rate multiplier feeds travel speed.
pub const FIRE_RATE_SPEED_FACTOR: f64 = 0.1;
/// Every tenth level is a boss level.
pub const BOSS_LEVEL_INTERVAL: u32 = 10;
/// Highest level a restored snapshot may carry.
pub const MAX_LEVEL: u32 = 1_000_000;

/// Progression error types.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProgressionError {
    /// Level not unlocked on the world map
    #[error("Level {0} is locked")]
    LevelLocked(u32),
    /// Encounter complete or every enemy already spawned
    #[error("No enemies left to spawn: {spawned}/{total}")]
    EncounterExhausted {
        /// Enemies spawned
        spawned: u32,
        /// Enemy quota
        total: u32,
    },
}

/// Result type for progression operations.
pub type ProgressionResult<T> = Result<T, ProgressionError>;

/// Distance level `level` requires.
#[must_use]
pub fn level_distance_target(level: u32) -> f64 {
    BASE_LEVEL_DISTANCE + f64::from(level.saturating_sub(1)) * LEVEL_DISTANCE_STEP
}

/// Enemy stat multiplier: +50% per level, +0.1% per 5 meters into the level.
#[must_use]
pub fn enemy_stat_multiplier(level: u32, level_distance: f64) -> f64 {
    1.0 + 0.5 * f64::from(level.saturating_sub(1)) + 0.001 * (level_distance.max(0.0) / 5.0).floor()
}

/// Travel speed in meters per second.
#[must_use]
pub fn travel_speed(fire_rate_multiplier: f64) -> f64 {
    BASE_TRAVEL_SPEED * (1.0 + fire_rate_multiplier * FIRE_RATE_SPEED_FACTOR)
}

/// Rewards for completing `level` by distance.
#[must_use]
pub fn level_rewards(level: u32) -> Vec<Reward> {
    let mut rewards = vec![Reward::currency(
        CurrencyKey::Steak,
        50 + 25 * u64::from(level),
    )];
    match level {
        5 => rewards.push(Reward::currency(CurrencyKey::Gold, 100)),
        10 => rewards.push(Reward::currency(CurrencyKey::Dragonscales, 10)),
        20 => rewards.push(Reward::currency(CurrencyKey::Gems, 5)),
        _ => {},
    }
    rewards
}

/// Rewards for clearing the enemy quota of `level`.
#[must_use]
pub fn encounter_rewards(level: u32, is_boss_level: bool) -> Vec<Reward> {
    let mut rewards = Vec::new();
    if is_boss_level {
        rewards.push(Reward::currency(
            CurrencyKey::Dragonscales,
            2 + u64::from(level / 10),
        ));
    }
    rewards.push(Reward::currency(
        CurrencyKey::Gold,
        (10.0 * 1.08_f64.powi(level_exponent(level))).floor() as u64,
    ));
    rewards
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

fn level_exponent(level: u32) -> i32 {
    i32::try_from(level).unwrap_or(i32::MAX)
}

/// Base hp and damage of an enemy before the distance multiplier.
#[must_use]
pub fn enemy_base_stats(level: u32, kind: EnemyKind) -> (f64, f64) {
    let (hp, hp_growth, damage, damage_growth) = match kind {
        EnemyKind::Normal => (5.0, 1.12_f64, 2.0, 1.08_f64),
        EnemyKind::Boss => (25.0, 1.15_f64, 4.0, 1.12_f64),
    };
    let n = level_exponent(level);
    (hp * hp_growth.powi(n), damage * damage_growth.powi(n))
}

/// A spawned enemy. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enemy {
    /// Position in the encounter, starting at 1
    pub id: u32,
    /// Level it spawned on
    pub level: u32,
    /// Normal or boss
    #[serde(rename = "type")]
    pub kind: EnemyKind,
    /// Current health
    pub hp: u64,
    /// Maximum health
    pub max_hp: u64,
    /// Damage per hit
    pub damage: u64,
    /// Boss abilities
    pub abilities: Vec<String>,
    /// Loot granted on defeat
    pub loot_table: Vec<Reward>,
}

/// A level finished by distance or by manual advance.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelUp {
    /// Level that was completed
    pub completed_level: u32,
    /// Level now current
    pub new_level: u32,
    /// Rewards applied
    pub rewards: Vec<Reward>,
}

/// An enemy quota cleared.
#[derive(Debug, Clone, PartialEq)]
pub struct EncounterClear {
    /// Level whose quota was cleared
    pub cleared_level: u32,
    /// Level now current
    pub new_level: u32,
    /// Whether it was a boss level
    pub was_boss_level: bool,
    /// Rewards applied
    pub rewards: Vec<Reward>,
}

/// Result of defeating an enemy.
#[derive(Debug, Clone, PartialEq)]
pub struct EnemyDefeat {
    /// Loot applied
    pub rewards: Vec<Reward>,
    /// Set when the defeat cleared the quota
    pub cleared: Option<EncounterClear>,
}

impl GameState {
    /// Current travel speed in meters per second.
    #[must_use]
    pub fn travel_speed(&self) -> f64 {
        travel_speed(self.dragon_stats.fire_rate_multiplier)
    }

    /// Enemy stat multiplier at the current position.
    #[must_use]
    pub fn enemy_stat_multiplier(&self) -> f64 {
        enemy_stat_multiplier(self.current_level, self.level_distance)
    }

    /// Starts a fresh encounter for the current level.
    pub fn reset_encounter(&mut self) {
        let level = self.current_level;
        self.current_level_state = LevelState {
            total_enemies: 20_u32.saturating_add(level.saturating_mul(5)),
            enemies_spawned: 0,
            enemies_defeated: 0,
            is_complete: false,
            is_boss_level: level % BOSS_LEVEL_INTERVAL == 0,
        };
    }

    /// Moves to the next level with `carry` meters already travelled on it.
    fn enter_next_level(&mut self, carry: f64) -> u32 {
        let completed = self.current_level;
        self.world_map.record_completed(completed);

        self.current_level = completed.saturating_add(1);
        self.world_map.unlock(self.current_level);
        self.level_distance = carry.max(0.0);
        self.level_distance_target = level_distance_target(self.current_level);

        self.reset_encounter();
        self.unlock_recipes();
        self.current_level
    }

    /// Completes the current level, carrying distance past the target over.
    ///
    /// Also used for a manual advance, where the carried distance is never negative.
    pub fn complete_level(&mut self) -> LevelUp {
        let completed_level = self.current_level;
        let carry = self.level_distance - self.level_distance_target;

        let new_level = self.enter_next_level(carry);
        let rewards = level_rewards(completed_level);
        self.apply_rewards(&rewards);

        info!("Level {completed_level} complete, now on level {new_level}");
        LevelUp {
            completed_level,
            new_level,
            rewards,
        }
    }

    /// Accrues distance for `dt_secs` of travel and completes every level passed.
    ///
    /// Nothing moves unless the travel state is advancing.
    pub fn accrue_distance(&mut self, dt_secs: f64) -> Vec<LevelUp> {
        if !self.travel_state.accrues_distance() || dt_secs <= 0.0 {
            return Vec::new();
        }

        let travelled = self.travel_speed() * dt_secs;
        if !travelled.is_finite() {
            return Vec::new();
        }
        self.level_distance += travelled;
        self.total_distance += travelled;

        let mut completed = Vec::new();
        while self.level_distance >= self.level_distance_target {
            completed.push(self.complete_level());
        }
        completed
    }

    /// Clamps progress restored from a snapshot into ranges a step can handle.
    ///
    /// The level distance never exceeds the target afterwards, so the next
    /// step completes at most one level from the stored position.
    pub fn clamp_progress(&mut self) {
        self.current_level = self.current_level.clamp(1, MAX_LEVEL);
        if !self.level_distance_target.is_finite() || self.level_distance_target <= 0.0 {
            self.level_distance_target = level_distance_target(self.current_level);
        }
        self.level_distance = finite_or_zero(self.level_distance).min(self.level_distance_target);
        self.total_distance = finite_or_zero(self.total_distance);
        self.playtime_sec = finite_or_zero(self.playtime_sec);
    }

    /// Jumps to an unlocked level with a fresh encounter and no distance on it.
    pub fn select_level(&mut self, level: u32) -> ProgressionResult<()> {
        if !self.world_map.is_unlocked(level) {
            return Err(ProgressionError::LevelLocked(level));
        }
        self.current_level = level;
        self.level_distance = 0.0;
        self.level_distance_target = level_distance_target(level);
        self.reset_encounter();

        debug!("Selected level {level}");
        Ok(())
    }

    /// Spawns the next enemy of the encounter with a rolled loot table.
    ///
    /// The first enemy of a boss level is the boss.
    pub fn spawn_enemy<R: Rng>(&mut self, rng: &mut R) -> ProgressionResult<Enemy> {
        let encounter = self.current_level_state;
        if encounter.is_complete || encounter.enemies_spawned >= encounter.total_enemies {
            return Err(ProgressionError::EncounterExhausted {
                spawned: encounter.enemies_spawned,
                total: encounter.total_enemies,
            });
        }

        let kind = if encounter.is_boss_level && encounter.enemies_spawned == 0 {
            EnemyKind::Boss
        } else {
            EnemyKind::Normal
        };
        let level = self.current_level;
        let multiplier = self.enemy_stat_multiplier();
        let (hp, damage) = enemy_base_stats(level, kind);
        let hp = (hp * multiplier).floor() as u64;

        let enemy = Enemy {
            id: encounter.enemies_spawned + 1,
            level,
            kind,
            hp,
            max_hp: hp,
            damage: (damage * multiplier).floor() as u64,
            abilities: match kind {
                EnemyKind::Boss => vec!["charge".to_string(), "firebreath".to_string()],
                EnemyKind::Normal => Vec::new(),
            },
            loot_table: self.roll_enemy_loot(kind, rng),
        };
        self.current_level_state.enemies_spawned += 1;

        debug!("Spawned {kind:?} enemy {} on level {level}", enemy.id);
        Ok(enemy)
    }

    /// Records an enemy defeat and applies its loot.
    ///
    /// `known` is the spawned enemy when the caller still has it; otherwise loot
    /// is rolled fresh, treating the first defeat of a boss level as the boss.
    /// Reaching the quota clears the encounter and moves to the next level.
    pub fn defeat_enemy<R: Rng>(&mut self, known: Option<Enemy>, rng: &mut R) -> EnemyDefeat {
        self.current_level_state.enemies_defeated += 1;
        self.enemies_defeated += 1;

        let rewards = match known {
            Some(enemy) => enemy.loot_table,
            None => {
                let encounter = &self.current_level_state;
                let kind = if encounter.is_boss_level && encounter.enemies_defeated == 1 {
                    EnemyKind::Boss
                } else {
                    EnemyKind::Normal
                };
                self.roll_enemy_loot(kind, rng)
            },
        };
        self.apply_rewards(&rewards);

        let encounter = self.current_level_state;
        let cleared = (encounter.enemies_defeated >= encounter.total_enemies)
            .then(|| self.clear_encounter());

        EnemyDefeat { rewards, cleared }
    }

    fn clear_encounter(&mut self) -> EncounterClear {
        self.current_level_state.is_complete = true;
        let cleared_level = self.current_level;
        let was_boss_level = self.current_level_state.is_boss_level;

        let rewards = encounter_rewards(cleared_level, was_boss_level);
        self.apply_rewards(&rewards);
        if was_boss_level {
            self.bosses_defeated += 1;
        }

        let new_level = self.enter_next_level(0.0);
        info!(
            "Encounter on level {cleared_level} cleared{}, now on level {new_level}",
            if was_boss_level { " (boss)" } else { "" }
        );

        EncounterClear {
            cleared_level,
            new_level,
            was_boss_level,
            rewards,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::travel::TravelState;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn advancing_state() -> GameState {
        let mut state = GameState::new(0);
        state.travel_state = TravelState::Advancing;
        state
    }

    #[test]
    fn test_level_targets() {
        assert!((level_distance_target(1) - 15_000.0).abs() < f64::EPSILON);
        assert!((level_distance_target(2) - 18_000.0).abs() < f64::EPSILON);
        assert!((level_distance_target(3) - 21_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_stat_multiplier() {
        assert!((enemy_stat_multiplier(1, 0.0) - 1.0).abs() < 1e-12);
        assert!((enemy_stat_multiplier(3, 0.0) - 2.0).abs() < 1e-12);
        assert!((enemy_stat_multiplier(1, 4_999.0) - 1.999).abs() < 1e-9);
    }

    #[test]
    fn test_distance_overflow_carries_into_next_level() {
        let mut state = advancing_state();
        state.level_distance = 14_990.0;
        assert!((state.travel_speed() - 11.0).abs() < 1e-12);

        let completed = state.accrue_distance(1.0);
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].new_level, 2);
        assert_eq!(state.current_level, 2);
        assert!((state.level_distance - 1.0).abs() < 1e-9);
        assert!((state.level_distance_target - 18_000.0).abs() < f64::EPSILON);
        assert!((state.total_distance - 11.0).abs() < 1e-9);
        assert_eq!(state.world_map.completed_levels, vec![1]);
        assert!(state.world_map.is_unlocked(2));
        // floor(50 + 25)
        assert_eq!(state.currencies.balance_of(CurrencyKey::Steak), 75);
    }

    #[test]
    fn test_long_step_completes_several_levels() {
        let mut state = advancing_state();
        // 11 m/s for 3000 s covers levels 1 and 2 (33 km)
        let completed = state.accrue_distance(3_000.0);
        assert_eq!(completed.len(), 2);
        assert_eq!(state.current_level, 3);
        assert!((state.level_distance - 0.0).abs() < 1e-6);
    }

    #[test]
    fn test_completed_levels_not_duplicated() {
        let mut state = GameState::new(0);
        state.complete_level();
        state.select_level(1).expect("unlocked");
        state.complete_level();
        assert_eq!(state.world_map.completed_levels, vec![1]);
        assert_eq!(state.world_map.unlocked_levels, vec![1, 2]);
    }

    #[test]
    fn test_manual_advance_does_not_carry_negative_distance() {
        let mut state = GameState::new(0);
        state.level_distance = 500.0;
        state.complete_level();
        assert!((state.level_distance - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_milestone_rewards_unlock_currencies() {
        let mut state = GameState::new(0);
        state.current_level = 5;
        let up = state.complete_level();
        assert_eq!(up.new_level, 6);
        assert_eq!(state.currencies.balance_of(CurrencyKey::Gold), 100);
        assert!(state.currencies.is_unlocked(CurrencyKey::Gold));
        assert_eq!(state.currencies.balance_of(CurrencyKey::Steak), 175);
    }

    #[test]
    fn test_encounter_quota_and_boss_flag() {
        let mut state = GameState::new(0);
        state.current_level = 10;
        state.reset_encounter();
        assert_eq!(state.current_level_state.total_enemies, 70);
        assert!(state.current_level_state.is_boss_level);
    }

    #[test]
    fn test_huge_level_saturates_quota() {
        let mut state = GameState::new(0);
        state.current_level = u32::MAX;
        state.reset_encounter();
        assert_eq!(state.current_level_state.total_enemies, u32::MAX);
    }

    #[test]
    fn test_clamp_progress_bounds_restored_values() {
        let mut state = advancing_state();
        state.current_level = u32::MAX;
        state.level_distance = 1e300;
        state.level_distance_target = f64::NAN;
        state.total_distance = f64::INFINITY;

        state.clamp_progress();
        assert_eq!(state.current_level, MAX_LEVEL);
        assert!((state.level_distance_target - level_distance_target(MAX_LEVEL)).abs() < 1e-6);
        assert!((state.level_distance - state.level_distance_target).abs() < 1e-6);
        assert!(state.total_distance.abs() < f64::EPSILON);

        let completed = state.accrue_distance(1.0);
        assert_eq!(completed.len(), 1);
        assert_eq!(state.current_level, MAX_LEVEL + 1);
    }

    #[test]
    fn test_select_locked_level() {
        let mut state = GameState::new(0);
        assert_eq!(state.select_level(4), Err(ProgressionError::LevelLocked(4)));
        assert_eq!(state.current_level, 1);
    }

    #[test]
    fn test_select_level_resets_distance() {
        let mut state = GameState::new(0);
        state.complete_level();
        state.level_distance = 900.0;
        state.select_level(1).expect("unlocked");
        assert_eq!(state.current_level, 1);
        assert!((state.level_distance - 0.0).abs() < f64::EPSILON);
        assert!((state.level_distance_target - 15_000.0).abs() < f64::EPSILON);
        assert_eq!(state.current_level_state.enemies_spawned, 0);
    }

    #[test]
    fn test_first_enemy_of_boss_level_is_boss() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut state = GameState::new(0);
        state.current_level = 10;
        state.reset_encounter();

        let boss = state.spawn_enemy(&mut rng).expect("spawn");
        assert_eq!(boss.kind, EnemyKind::Boss);
        assert_eq!(boss.id, 1);
        assert_eq!(boss.abilities, vec!["charge", "firebreath"]);
        // 25 × 1.15^10 × (1 + 4.5)
        assert_eq!(boss.max_hp, (25.0 * 1.15_f64.powi(10) * 5.5).floor() as u64);

        let next = state.spawn_enemy(&mut rng).expect("spawn");
        assert_eq!(next.kind, EnemyKind::Normal);
        assert_eq!(next.id, 2);
    }

    #[test]
    fn test_spawn_stops_at_quota() {
        let mut rng = ChaCha8Rng::seed_from_u64(12);
        let mut state = GameState::new(0);
        state.current_level_state.total_enemies = 1;
        state.spawn_enemy(&mut rng).expect("spawn");
        assert_eq!(
            state.spawn_enemy(&mut rng),
            Err(ProgressionError::EncounterExhausted {
                spawned: 1,
                total: 1
            })
        );
    }

    #[test]
    fn test_boss_defeat_grants_dragonscales_and_gear() {
        let mut rng = ChaCha8Rng::seed_from_u64(13);
        let mut state = GameState::new(0);
        state.current_level = 10;
        state.reset_encounter();
        let inventory_before = state.inventory.len();

        let defeat = state.defeat_enemy(None, &mut rng);
        let scales: u64 = defeat
            .rewards
            .iter()
            .map(|r| r.currency_amount(CurrencyKey::Dragonscales))
            .sum();
        assert_eq!(scales, 2);
        assert!(defeat.rewards.iter().any(|r| matches!(r, Reward::Gear { .. })));
        assert!(state.inventory.len() > inventory_before);
        assert_eq!(state.currencies.balance_of(CurrencyKey::Dragonscales), 2);
        assert!(defeat.cleared.is_none());
    }

    #[test]
    fn test_quota_clear_advances_level() {
        let mut rng = ChaCha8Rng::seed_from_u64(14);
        let mut state = GameState::new(0);
        state.current_level = 10;
        state.reset_encounter();
        state.current_level_state.total_enemies = 2;
        state.current_level_state.enemies_defeated = 1;
        state.level_distance = 1_234.0;

        let defeat = state.defeat_enemy(None, &mut rng);
        let cleared = defeat.cleared.expect("quota reached");
        assert!(cleared.was_boss_level);
        assert_eq!(cleared.new_level, 11);
        assert_eq!(state.bosses_defeated, 1);
        assert_eq!(state.current_level, 11);
        assert!((state.level_distance - 0.0).abs() < f64::EPSILON);
        assert_eq!(state.current_level_state.enemies_defeated, 0);
        assert_eq!(state.enemies_defeated, 1);
        // floor(10 × 1.08^10) = 21
        let gold: u64 = cleared
            .rewards
            .iter()
            .map(|r| r.currency_amount(CurrencyKey::Gold))
            .sum();
        assert_eq!(gold, 21);
        // floor(2 + 10/10) = 3
        let scales: u64 = cleared
            .rewards
            .iter()
            .map(|r| r.currency_amount(CurrencyKey::Dragonscales))
            .sum();
        assert_eq!(scales, 3);
    }

    #[test]
    fn test_known_enemy_loot_is_used() {
        let mut rng = ChaCha8Rng::seed_from_u64(15);
        let mut state = GameState::new(0);
        let enemy = state.spawn_enemy(&mut rng).expect("spawn");
        let expected = enemy.loot_table.clone();

        let defeat = state.defeat_enemy(Some(enemy), &mut rng);
        assert_eq!(defeat.rewards, expected);
    }

    proptest! {
        #[test]
        fn test_no_distance_unless_advancing(dt in 0.0f64..200_000.0, which in 0usize..4) {
            let states = [
                TravelState::Hovering,
                TravelState::Retreating,
                TravelState::Gate,
                TravelState::TravelToTarget,
            ];
            let mut state = GameState::new(0);
            state.travel_state = states[which];
            state.level_distance = 100.0;

            let completed = state.accrue_distance(dt);
            prop_assert!(completed.is_empty());
            prop_assert_eq!(state.level_distance, 100.0);
            prop_assert_eq!(state.total_distance, 0.0);
        }

        #[test]
        fn test_targets_strictly_increase(level in 1u32..100_000) {
            prop_assert!(level_distance_target(level + 1) > level_distance_target(level));
        }
    }
}
