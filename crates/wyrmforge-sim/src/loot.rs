//! Procedural loot: weighted rarity selection and gear, rune and material rolls.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;
use wyrmforge_common::IdSequence;

use crate::economy::CurrencyKey;
use crate::gear::{GearPiece, GearSlot, Rarity, RuneSocket, SlotCategory, SocketType};
use crate::materials::{MaterialRarity, MaterialType};
use crate::runes::{Rune, RuneRarity, RuneType};
use crate::sets::GearSet;
use crate::state::GameState;
use crate::stats::StatBlock;

const GEAR_WEIGHTS_NORMAL: [f64; 5] = [70.0, 20.0, 8.0, 1.5, 0.5];
const GEAR_WEIGHTS_BOSS: [f64; 5] = [30.0, 40.0, 20.0, 8.0, 2.0];
const RUNE_WEIGHTS_NORMAL: [f64; 3] = [70.0, 25.0, 5.0];
const RUNE_WEIGHTS_BOSS: [f64; 3] = [40.0, 45.0, 15.0];
const MATERIAL_WEIGHTS_NORMAL: [f64; 3] = [70.0, 25.0, 5.0];
const MATERIAL_WEIGHTS_BOSS: [f64; 3] = [40.0, 35.0, 25.0];

const BOSS_RUNE_CHANCE: f64 = 0.25;

/// Whether an enemy is a regular one or a level boss.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnemyKind {
    /// Regular enemy
    #[default]
    Normal,
    /// Boss, first enemy of every tenth level
    Boss,
}

/// A rolled material drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialDrop {
    /// Material kind
    #[serde(rename = "type")]
    pub material_type: MaterialType,
    /// Units dropped
    pub amount: u64,
    /// Drop tier
    pub rarity: MaterialRarity,
}

/// A single reward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Reward {
    /// Currency payout
    Currency {
        /// Currency credited
        #[serde(rename = "currencyType")]
        currency: CurrencyKey,
        /// Amount credited
        amount: u64,
    },
    /// Gear piece
    Gear {
        /// The piece
        gear: GearPiece,
    },
    /// Material drop
    Material {
        /// The drop
        material: MaterialDrop,
    },
    /// Rune
    Rune {
        /// The rune
        rune: Rune,
    },
}

impl Reward {
    /// Currency payout shorthand.
    #[must_use]
    pub const fn currency(currency: CurrencyKey, amount: u64) -> Self {
        Self::Currency { currency, amount }
    }

    /// Amount of `key` this reward pays, zero for non-currency rewards.
    #[must_use]
    pub fn currency_amount(&self, key: CurrencyKey) -> u64 {
        match self {
            Self::Currency { currency, amount } if *currency == key => *amount,
            _ => 0,
        }
    }
}

/// Maps a draw in `[0, Σw)` to the index whose cumulative band contains it.
///
/// Returns the first `i` with `draw < Σ_{j≤i} w_j`. Draws past the total fall
/// back to the last positively weighted index.
#[must_use]
pub fn index_for_draw(weights: &[f64], draw: f64) -> Option<usize> {
    let mut cumulative = 0.0;
    let mut last_positive = None;
    for (i, weight) in weights.iter().enumerate() {
        if *weight <= 0.0 {
            continue;
        }
        cumulative += weight;
        last_positive = Some(i);
        if draw < cumulative {
            return Some(i);
        }
    }
    last_positive
}

/// Picks an index with probability proportional to its weight.
///
/// Returns `None` when no weight is positive.
pub fn weighted_index<R: Rng>(weights: &[f64], rng: &mut R) -> Option<usize> {
    let total: f64 = weights.iter().filter(|w| **w > 0.0).sum();
    if total <= 0.0 || !total.is_finite() {
        return None;
    }
    index_for_draw(weights, rng.gen_range(0.0..total))
}

/// Gear rarity weights for an enemy of `kind` at `level`.
///
/// Higher levels move up to 20 points of weight from common to the higher tiers.
#[must_use]
pub fn gear_rarity_weights(level: u32, kind: EnemyKind) -> [f64; 5] {
    let mut weights = match kind {
        EnemyKind::Normal => GEAR_WEIGHTS_NORMAL,
        EnemyKind::Boss => GEAR_WEIGHTS_BOSS,
    };
    let bonus = (f64::from(level) * 0.5).min(20.0);
    weights[0] -= bonus;
    weights[1] += bonus * 0.6;
    weights[2] += bonus * 0.3;
    weights[3] += bonus * 0.1;
    weights
}

fn jittered_level<R: Rng>(level: u32, spread: f64, rng: &mut R) -> u32 {
    let offset = ((rng.gen::<f64>() - 0.5) * spread).floor() as i64;
    (i64::from(level) + offset).max(1) as u32
}

fn pick<'a, T, R: Rng>(items: &'a [T], rng: &mut R, fallback: &'a T) -> &'a T {
    items.choose(rng).unwrap_or(fallback)
}

/// Rolls a gear drop.
pub fn roll_gear<R: Rng>(
    level: u32,
    kind: EnemyKind,
    sets: &[GearSet],
    ids: &mut IdSequence,
    rng: &mut R,
) -> GearPiece {
    let slot = *pick(&GearSlot::ALL, rng, &GearSlot::Helm);
    let rarity = weighted_index(&gear_rarity_weights(level, kind), rng)
        .and_then(|i| Rarity::ALL.get(i).copied())
        .unwrap_or(Rarity::Common);

    let noun = pick(slot.nouns(), rng, &"Relic");
    let prefix = pick(rarity.prefixes(), rng, &"Plain");

    let l = f64::from(level);
    let m = rarity.stat_multiplier();
    let mut stats = StatBlock::default();
    match slot.category() {
        SlotCategory::Offensive => stats = stats.with_damage(((2.0 + l * 0.3) * m).floor() as u32),
        SlotCategory::Defensive => stats = stats.with_health(((3.0 + l * 0.5) * m).floor() as u32),
        SlotCategory::Utility => stats = stats.with_fire_rate((0.1 + l * 0.01) * m),
    }

    let secondary = rarity.secondary_stat_chance();
    if rarity != Rarity::Common {
        if rng.gen::<f64>() < secondary && stats.damage.is_none() {
            stats = stats.with_damage(((1.0 + l * 0.1) * m * 0.5).floor() as u32);
        }
        if rng.gen::<f64>() < secondary && stats.health.is_none() {
            stats = stats.with_health(((2.0 + l * 0.2) * m * 0.5).floor() as u32);
        }
    }

    let set_id = if rng.gen::<f64>() < rarity.set_chance() {
        let candidates: Vec<&GearSet> = sets.iter().filter(|s| s.includes(slot)).collect();
        candidates.choose(rng).map(|set| set.id.clone())
    } else {
        None
    };

    let socket_chance = 0.3 + l * 0.01;
    let mut sockets = Vec::new();
    for i in 0..rarity.max_sockets() {
        if rng.gen::<f64>() < socket_chance {
            let socket_type = *pick(&SocketType::ALL, rng, &SocketType::Damage);
            sockets.push(RuneSocket::empty(i, socket_type));
        }
    }

    let mut piece = GearPiece::new(
        ids.next_gear_id(),
        format!("{prefix} {noun}"),
        rarity,
        slot,
        jittered_level(level, 4.0, rng),
        stats,
    )
    .with_description(format!(
        "Level {level} {} equipment found in combat.",
        rarity.name()
    ));
    piece.set_id = set_id;
    piece.sockets = sockets;
    piece
}

/// Rolls a rune drop.
pub fn roll_rune<R: Rng>(
    level: u32,
    kind: EnemyKind,
    ids: &mut IdSequence,
    rng: &mut R,
) -> Rune {
    let weights = match kind {
        EnemyKind::Normal => RUNE_WEIGHTS_NORMAL,
        EnemyKind::Boss => RUNE_WEIGHTS_BOSS,
    };
    let rarity = weighted_index(&weights, rng)
        .and_then(|i| RuneRarity::ALL.get(i).copied())
        .unwrap_or(RuneRarity::Lesser);
    let rune_type = *pick(&RuneType::ALL, rng, &RuneType::Strength);

    Rune::new(
        ids.next_rune_id(),
        rune_type,
        rarity,
        jittered_level(level, 6.0, rng),
    )
}

/// Rolls a material drop. Bosses draw from every material and drop double.
pub fn roll_material<R: Rng>(level: u32, kind: EnemyKind, rng: &mut R) -> MaterialDrop {
    let (pool, weights, multiplier): (&[MaterialType], _, u64) = match kind {
        EnemyKind::Normal => (&MaterialType::COMMON[..], MATERIAL_WEIGHTS_NORMAL, 1),
        EnemyKind::Boss => (&MaterialType::ALL[..], MATERIAL_WEIGHTS_BOSS, 2),
    };
    let material_type = *pick(pool, rng, &MaterialType::Emberdust);
    let rarity = weighted_index(&weights, rng)
        .and_then(|i| MaterialRarity::ALL.get(i).copied())
        .unwrap_or(MaterialRarity::Common);

    MaterialDrop {
        material_type,
        amount: (rarity.base_amount(level) * multiplier).max(1),
        rarity,
    }
}

/// Rolls the loot of one enemy.
///
/// Bosses always drop dragonscales, a gear piece and a material, and sometimes
/// a rune. Normal enemies drop a steak and have level-scaled gear and material
/// chances.
pub fn enemy_loot<R: Rng>(
    level: u32,
    kind: EnemyKind,
    sets: &[GearSet],
    ids: &mut IdSequence,
    rng: &mut R,
) -> Vec<Reward> {
    let l = f64::from(level);
    let mut rewards = Vec::new();

    match kind {
        EnemyKind::Boss => {
            rewards.push(Reward::currency(CurrencyKey::Steak, 5));
            rewards.push(Reward::currency(
                CurrencyKey::Dragonscales,
                1 + u64::from(level / 10),
            ));
            rewards.push(Reward::Gear {
                gear: roll_gear(level, kind, sets, ids, rng),
            });
            rewards.push(Reward::Material {
                material: roll_material(level, kind, rng),
            });
            if rng.gen::<f64>() < BOSS_RUNE_CHANCE {
                rewards.push(Reward::Rune {
                    rune: roll_rune(level, kind, ids, rng),
                });
            }
        },
        EnemyKind::Normal => {
            rewards.push(Reward::currency(CurrencyKey::Steak, 1));
            if rng.gen::<f64>() < (0.05 + l * 0.002).min(0.15) {
                rewards.push(Reward::Gear {
                    gear: roll_gear(level, kind, sets, ids, rng),
                });
            }
            if rng.gen::<f64>() < (0.3 + l * 0.01).min(0.7) {
                rewards.push(Reward::Material {
                    material: roll_material(level, kind, rng),
                });
            }
        },
    }

    rewards
}

impl GameState {
    /// Rolls loot for an enemy of `kind` on the current level.
    pub fn roll_enemy_loot<R: Rng>(&mut self, kind: EnemyKind, rng: &mut R) -> Vec<Reward> {
        enemy_loot(
            self.current_level,
            kind,
            &self.available_sets,
            &mut self.id_sequence,
            rng,
        )
    }

    /// Applies rewards: currencies are credited and unlocked, items go to their inventories.
    ///
    /// Currency rewards for entries missing from the state are skipped.
    pub fn apply_rewards(&mut self, rewards: &[Reward]) {
        for reward in rewards {
            match reward {
                Reward::Currency { currency, amount } => {
                    self.currencies.earn(*currency, *amount);
                },
                Reward::Gear { gear } => self.inventory.push(gear.clone()),
                Reward::Material { material } => {
                    self.materials.add(material.material_type, material.amount);
                },
                Reward::Rune { rune } => self.rune_inventory.push(rune.clone()),
            }
        }
        debug!("Applied {} rewards", rewards.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sets::default_sets;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_level_shift_moves_common_weight() {
        let weights = gear_rarity_weights(40, EnemyKind::Normal);
        assert!((weights[0] - 50.0).abs() < 1e-9);
        assert!((weights[1] - 32.0).abs() < 1e-9);
        assert!((weights[2] - 14.0).abs() < 1e-9);
        assert!((weights[3] - 3.5).abs() < 1e-9);
        assert!((weights[4] - 0.5).abs() < 1e-9);

        // capped at 20
        assert_eq!(
            gear_rarity_weights(100, EnemyKind::Boss),
            gear_rarity_weights(40, EnemyKind::Boss)
        );
    }

    #[test]
    fn test_weighted_index_skips_zero_weights() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..100 {
            assert_eq!(weighted_index(&[0.0, 3.0, 0.0], &mut rng), Some(1));
        }
        assert_eq!(weighted_index(&[0.0, 0.0], &mut rng), None);
        assert_eq!(weighted_index(&[], &mut rng), None);
    }

    #[test]
    fn test_boss_loot_guarantees() {
        let sets = default_sets();
        let mut ids = IdSequence::default();
        let mut rng = ChaCha8Rng::seed_from_u64(99);

        for _ in 0..20 {
            let loot = enemy_loot(10, EnemyKind::Boss, &sets, &mut ids, &mut rng);
            assert_eq!(
                loot.iter().map(|r| r.currency_amount(CurrencyKey::Dragonscales)).sum::<u64>(),
                2
            );
            assert!(loot.iter().any(|r| matches!(r, Reward::Gear { .. })));
            assert!(loot.iter().any(|r| matches!(r, Reward::Material { .. })));
        }
    }

    #[test]
    fn test_rolled_gear_shape() {
        let sets = default_sets();
        let mut ids = IdSequence::default();
        let mut rng = ChaCha8Rng::seed_from_u64(5);

        for _ in 0..200 {
            let piece = roll_gear(12, EnemyKind::Boss, &sets, &mut ids, &mut rng);
            assert!(piece.sockets.len() <= piece.rarity.max_sockets());
            assert!(piece.level >= 10 && piece.level <= 13);
            match piece.slot.category() {
                SlotCategory::Offensive => assert!(piece.stats.damage.is_some()),
                SlotCategory::Defensive => assert!(piece.stats.health.is_some()),
                SlotCategory::Utility => assert!(piece.stats.fire_rate.is_some()),
            }
            if let Some(set_id) = &piece.set_id {
                let set = sets.iter().find(|s| &s.id == set_id).expect("known set");
                assert!(set.includes(piece.slot));
            }
        }
    }

    #[test]
    fn test_normal_material_pool_is_common() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..200 {
            let drop = roll_material(1, EnemyKind::Normal, &mut rng);
            assert!(MaterialType::COMMON.contains(&drop.material_type));
            assert_eq!(drop.amount, 1);
        }
    }

    #[test]
    fn test_boss_material_amount_doubles() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        for _ in 0..50 {
            let drop = roll_material(10, EnemyKind::Boss, &mut rng);
            assert_eq!(drop.amount, drop.rarity.base_amount(10) * 2);
        }
    }

    #[test]
    fn test_apply_rewards_routes_items() {
        let mut state = GameState::new(0);
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let rune = roll_rune(3, EnemyKind::Normal, &mut state.id_sequence, &mut rng);
        let rewards = vec![
            Reward::currency(CurrencyKey::Gems, 3),
            Reward::Material {
                material: MaterialDrop {
                    material_type: MaterialType::Frostmetal,
                    amount: 2,
                    rarity: MaterialRarity::Rare,
                },
            },
            Reward::Rune { rune },
        ];

        state.apply_rewards(&rewards);
        assert_eq!(state.currencies.balance_of(CurrencyKey::Gems), 3);
        assert!(state.currencies.is_unlocked(CurrencyKey::Gems));
        assert_eq!(state.materials.count(MaterialType::Frostmetal), 2);
        assert_eq!(state.rune_inventory.len(), 1);
    }

    #[test]
    fn test_reward_wire_shape() {
        let json = serde_json::to_value(Reward::currency(CurrencyKey::Steak, 1)).expect("serialize");
        assert_eq!(json["type"], "currency");
        assert_eq!(json["currencyType"], "steak");
        assert_eq!(json["amount"], 1);
    }

    proptest! {
        #[test]
        fn test_draw_lands_in_its_band(
            weights in prop::collection::vec(0.01f64..100.0, 1..8),
            fraction in 0.0f64..1.0,
        ) {
            let total: f64 = weights.iter().sum();
            let draw = fraction * total;
            prop_assume!(draw < total);

            let i = index_for_draw(&weights, draw).expect("positive weights");
            let below: f64 = weights[..i].iter().sum();
            let through: f64 = weights[..=i].iter().sum();
            prop_assert!(below <= draw);
            prop_assert!(draw < through || i == weights.len() - 1);
        }

        #[test]
        fn test_seeded_selection_is_reproducible(seed in any::<u64>()) {
            let weights = gear_rarity_weights(7, EnemyKind::Normal);
            let a = weighted_index(&weights, &mut ChaCha8Rng::seed_from_u64(seed));
            let b = weighted_index(&weights, &mut ChaCha8Rng::seed_from_u64(seed));
            prop_assert_eq!(a, b);
            prop_assert!(a.is_some_and(|i| i < weights.len()));
        }
    }
}
