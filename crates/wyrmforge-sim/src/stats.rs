//! Stat blocks and the derived dragon stats.
//!
//! `DragonStats` is never edited directly. It is recomputed by [`derive_stats`]
//! from the base values, upgrade levels, equipped gear, socketed runes and
//! active set bonuses whenever one of those inputs changes.

use serde::{Deserialize, Serialize};

use crate::gear::GearPiece;
use crate::sets::active_set_bonuses;
use crate::state::GameState;

/// Dragon damage before upgrades and gear.
pub const BASE_DAMAGE: u32 = 2;
/// Dragon health before upgrades and gear.
pub const BASE_HP: u32 = 10;
/// Fire rate multiplier before upgrades and gear.
pub const BASE_FIRE_RATE: f64 = 1.0;

const DAMAGE_PER_UPGRADE: u32 = 2;
const HP_PER_UPGRADE: u32 = 8;
const FIRE_RATE_PER_UPGRADE: f64 = 0.3;
/// Gear fire rate is dampened before it reaches the multiplier.
const GEAR_FIRE_RATE_WEIGHT: f64 = 0.1;
/// Each enhancement level adds 10% to a piece's own stats.
const ENHANCEMENT_STEP: f64 = 0.1;

/// A sparse stat block. Only populated stats apply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatBlock {
    /// Flat damage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub damage: Option<u32>,
    /// Flat health
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<u32>,
    /// Fire rate bonus
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fire_rate: Option<f64>,
    /// Critical hit chance (0-1)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crit_chance: Option<f64>,
    /// Critical damage multiplier bonus
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crit_damage: Option<f64>,
    /// Bonus gold drops
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "forgegoldFind")]
    pub gold_find: Option<f64>,
    /// Bonus dragonscale drops
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        rename = "dragonScaleFind"
    )]
    pub dragonscale_find: Option<f64>,
}

impl StatBlock {
    /// Sets flat damage. Zero leaves the stat unpopulated.
    #[must_use]
    pub fn with_damage(mut self, damage: u32) -> Self {
        self.damage = (damage > 0).then_some(damage);
        self
    }

    /// Sets flat health. Zero leaves the stat unpopulated.
    #[must_use]
    pub fn with_health(mut self, health: u32) -> Self {
        self.health = (health > 0).then_some(health);
        self
    }

    /// Sets the fire rate bonus.
    #[must_use]
    pub fn with_fire_rate(mut self, fire_rate: f64) -> Self {
        self.fire_rate = Some(fire_rate);
        self
    }

    /// Sets crit chance and crit damage.
    #[must_use]
    pub fn with_crit(mut self, chance: f64, damage: f64) -> Self {
        self.crit_chance = (chance > 0.0).then_some(chance);
        self.crit_damage = (damage > 0.0).then_some(damage);
        self
    }

    /// Sets the find bonuses.
    #[must_use]
    pub fn with_find(mut self, gold: f64, dragonscale: f64) -> Self {
        self.gold_find = Some(gold);
        self.dragonscale_find = Some(dragonscale);
        self
    }

    /// Checks whether no stat is populated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Dense sum of stat blocks.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StatTotals {
    /// Total damage
    pub damage: u32,
    /// Total health
    pub health: u32,
    /// Total fire rate bonus
    pub fire_rate: f64,
    /// Total crit chance
    pub crit_chance: f64,
    /// Total crit damage
    pub crit_damage: f64,
    /// Total gold find
    pub gold_find: f64,
    /// Total dragonscale find
    pub dragonscale_find: f64,
}

impl StatTotals {
    /// Adds a block unscaled.
    pub fn add(&mut self, block: &StatBlock) {
        self.add_scaled(block, 1.0);
    }

    /// Adds a block scaled by `factor`. Damage and health are floored per block.
    pub fn add_scaled(&mut self, block: &StatBlock, factor: f64) {
        let scale_flat = |v: Option<u32>| (f64::from(v.unwrap_or(0)) * factor).floor() as u32;
        let scale = |v: Option<f64>| v.unwrap_or(0.0) * factor;

        self.damage = self.damage.saturating_add(scale_flat(block.damage));
        self.health = self.health.saturating_add(scale_flat(block.health));
        self.fire_rate += scale(block.fire_rate);
        self.crit_chance += scale(block.crit_chance);
        self.crit_damage += scale(block.crit_damage);
        self.gold_find += scale(block.gold_find);
        self.dragonscale_find += scale(block.dragonscale_find);
    }
}

/// Derived dragon stats.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DragonStats {
    /// Maximum health
    pub max_hp: u32,
    /// Current health, never above `max_hp`
    pub current_hp: u32,
    /// Damage per hit
    pub damage: u32,
    /// Fire rate multiplier, also drives travel speed
    pub fire_rate_multiplier: f64,
    /// Number of dragons
    pub dragon_count: u32,
    /// Critical hit chance from gear, runes and sets
    pub crit_chance: f64,
    /// Critical damage bonus from gear, runes and sets
    pub crit_damage: f64,
}

impl Default for DragonStats {
    fn default() -> Self {
        Self {
            max_hp: BASE_HP,
            current_hp: BASE_HP,
            damage: BASE_DAMAGE,
            fire_rate_multiplier: BASE_FIRE_RATE,
            dragon_count: 1,
            crit_chance: 0.0,
            crit_damage: 0.0,
        }
    }
}

/// Sums the contribution of every equipped piece.
///
/// Each piece adds its own stats scaled by its enhancement level, plus the
/// stats of every rune sitting in its sockets; each set then adds its highest
/// qualifying bonus tier.
#[must_use]
pub fn equipment_totals<'a>(
    equipped: impl IntoIterator<Item = &'a GearPiece> + Clone,
    sets: &[crate::sets::GearSet],
) -> StatTotals {
    let mut totals = StatTotals::default();

    for piece in equipped.clone() {
        let multiplier = 1.0 + f64::from(piece.enhancement) * ENHANCEMENT_STEP;
        totals.add_scaled(&piece.stats, multiplier);
        for rune in piece.sockets.iter().filter_map(|s| s.rune.as_ref()) {
            totals.add(&rune.stats);
        }
    }

    for bonus in active_set_bonuses(equipped, sets) {
        totals.add(&bonus.tier.stats);
    }

    totals
}

/// Derives the dragon stats from the state.
///
/// Current health carries over from the previous stats and is clamped to the
/// new maximum.
#[must_use]
pub fn derive_stats(state: &GameState) -> DragonStats {
    let upgrades = &state.upgrades;
    let gear = equipment_totals(state.equipped_gear.values(), &state.available_sets);

    let max_hp = BASE_HP
        .saturating_add(upgrades.health.saturating_mul(HP_PER_UPGRADE))
        .saturating_add(gear.health);

    DragonStats {
        max_hp,
        current_hp: state.dragon_stats.current_hp.min(max_hp),
        damage: BASE_DAMAGE
            .saturating_add(upgrades.damage.saturating_mul(DAMAGE_PER_UPGRADE))
            .saturating_add(gear.damage),
        fire_rate_multiplier: BASE_FIRE_RATE
            + f64::from(upgrades.fire_rate) * FIRE_RATE_PER_UPGRADE
            + gear.fire_rate * GEAR_FIRE_RATE_WEIGHT,
        dragon_count: 1 + upgrades.extra_dragons,
        crit_chance: gear.crit_chance,
        crit_damage: gear.crit_damage,
    }
}

impl GameState {
    /// Recomputes the derived dragon stats.
    pub fn refresh_stats(&mut self) {
        self.dragon_stats = derive_stats(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gear::{GearSlot, Rarity, RuneSocket, SocketType};
    use crate::runes::{Rune, RuneRarity, RuneType};
    use wyrmforge_common::{GearId, RuneId, SetId};

    fn piece(id: &str, slot: GearSlot, stats: StatBlock) -> GearPiece {
        GearPiece::new(GearId::new(id), "Test Piece", Rarity::Common, slot, 1, stats)
    }

    #[test]
    fn test_fresh_stats() {
        let state = GameState::new(0);
        let stats = derive_stats(&state);
        assert_eq!(stats.damage, 2);
        assert_eq!(stats.max_hp, 10);
        assert!((stats.fire_rate_multiplier - 1.0).abs() < f64::EPSILON);
        assert_eq!(stats.dragon_count, 1);
    }

    #[test]
    fn test_enhancement_scales_piece_stats() {
        let mut state = GameState::new(0);
        let mut claws = piece("c", GearSlot::Claws, StatBlock::default().with_damage(10));
        claws.enhancement = 5;
        state.equipped_gear.insert(GearSlot::Claws, claws);
        state.refresh_stats();

        // 10 × 1.5 = 15
        assert_eq!(state.dragon_stats.damage, 2 + 15);
    }

    #[test]
    fn test_gear_fire_rate_is_dampened() {
        let mut state = GameState::new(0);
        state.equipped_gear.insert(
            GearSlot::Ring,
            piece("r", GearSlot::Ring, StatBlock::default().with_fire_rate(2.0)),
        );
        state.upgrades.fire_rate = 1;
        state.refresh_stats();
        assert!((state.dragon_stats.fire_rate_multiplier - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_socketed_rune_contributes() {
        let mut state = GameState::new(0);
        let mut claws = piece("c", GearSlot::Claws, StatBlock::default().with_damage(4));
        claws.sockets.push(RuneSocket {
            id: "socket_0".to_string(),
            socket_type: SocketType::Damage,
            rune: Some(Rune {
                id: RuneId::new("rune_1"),
                name: "Lesser Rune of Strength".to_string(),
                rune_type: RuneType::Strength,
                rarity: RuneRarity::Lesser,
                level: 1,
                stats: StatBlock::default().with_damage(3),
                socket_types: vec![SocketType::Damage],
                description: String::new(),
            }),
        });
        state.equipped_gear.insert(GearSlot::Claws, claws);
        state.refresh_stats();
        assert_eq!(state.dragon_stats.damage, 2 + 4 + 3);
    }

    #[test]
    fn test_current_hp_clamped_to_max() {
        let mut state = GameState::new(0);
        let mut helm = piece("h", GearSlot::Helm, StatBlock::default().with_health(20));
        helm.set_id = None;
        state.equipped_gear.insert(GearSlot::Helm, helm);
        state.refresh_stats();
        state.dragon_stats.current_hp = 30;

        state.equipped_gear.clear();
        state.refresh_stats();
        assert_eq!(state.dragon_stats.max_hp, 10);
        assert_eq!(state.dragon_stats.current_hp, 10);
    }

    #[test]
    fn test_set_bonus_in_totals() {
        let state = GameState::new(0);
        let mut helm = piece("h", GearSlot::Helm, StatBlock::default());
        helm.set_id = Some(SetId::new("stormguard_set"));
        let mut chest = piece("c", GearSlot::Chest, StatBlock::default());
        chest.set_id = Some(SetId::new("stormguard_set"));

        let totals = equipment_totals([&helm, &chest], &state.available_sets);
        assert_eq!(totals.health, 20);
        assert!((totals.fire_rate - 0.05).abs() < 1e-9);
    }
}
