//! Gear sets and their tiered bonuses.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use wyrmforge_common::SetId;

use crate::gear::{GearPiece, GearSlot};
use crate::stats::StatBlock;

/// One bonus tier of a set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetBonusTier {
    /// Equipped pieces needed
    pub pieces: u32,
    /// Stats granted
    pub stats: StatBlock,
    /// Display text
    pub description: String,
}

/// A named gear set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GearSet {
    /// Set id
    pub id: SetId,
    /// Display name
    pub name: String,
    /// Flavour text
    #[serde(default)]
    pub description: String,
    /// Member slots
    pub pieces: Vec<GearSlot>,
    /// Bonus tiers
    pub bonuses: Vec<SetBonusTier>,
}

impl GearSet {
    /// Checks whether the set has a member in `slot`.
    #[must_use]
    pub fn includes(&self, slot: GearSlot) -> bool {
        self.pieces.contains(&slot)
    }

    /// Highest tier whose threshold `equipped` meets.
    #[must_use]
    pub fn best_tier(&self, equipped: u32) -> Option<&SetBonusTier> {
        self.bonuses
            .iter()
            .filter(|tier| tier.pieces <= equipped)
            .max_by_key(|tier| tier.pieces)
    }
}

/// A set bonus currently in effect.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActiveSetBonus<'a> {
    /// The set
    pub set: &'a GearSet,
    /// Number of its pieces equipped
    pub equipped_pieces: u32,
    /// The single tier that applies
    pub tier: &'a SetBonusTier,
}

/// Resolves which set bonuses the equipped pieces activate.
///
/// Tiers do not stack: only the highest qualifying tier of each set applies.
/// Pieces naming an unknown set are ignored.
pub fn active_set_bonuses<'g, 's>(
    equipped: impl IntoIterator<Item = &'g GearPiece>,
    sets: &'s [GearSet],
) -> Vec<ActiveSetBonus<'s>> {
    let mut counts: BTreeMap<&SetId, u32> = BTreeMap::new();
    let equipped: Vec<&GearPiece> = equipped.into_iter().collect();
    for set_id in equipped.iter().filter_map(|piece| piece.set_id.as_ref()) {
        *counts.entry(set_id).or_default() += 1;
    }

    sets.iter()
        .filter_map(|set| {
            let count = counts.get(&set.id).copied()?;
            set.best_tier(count).map(|tier| ActiveSetBonus {
                set,
                equipped_pieces: count,
                tier,
            })
        })
        .collect()
}

fn tier(pieces: u32, stats: StatBlock, description: &str) -> SetBonusTier {
    SetBonusTier {
        pieces,
        stats,
        description: description.to_string(),
    }
}

/// The sets available in a new game.
#[must_use]
pub fn default_sets() -> Vec<GearSet> {
    vec![
        GearSet {
            id: SetId::new("dragonfire_set"),
            name: "Dragonfire Regalia".to_string(),
            description: "Ancient armor forged in dragonflame, enhances offensive capabilities."
                .to_string(),
            pieces: vec![
                GearSlot::Helm,
                GearSlot::Chest,
                GearSlot::Claws,
                GearSlot::BreathFocus,
            ],
            bonuses: vec![
                tier(
                    2,
                    StatBlock::default().with_damage(5).with_fire_rate(0.1),
                    "Dragon's Fury: +5 Damage, +0.1 Fire Rate",
                ),
                tier(
                    4,
                    StatBlock::default()
                        .with_damage(15)
                        .with_fire_rate(0.3)
                        .with_crit(0.1, 0.0),
                    "Infernal Might: +15 Damage, +0.3 Fire Rate, +10% Crit Chance",
                ),
            ],
        },
        GearSet {
            id: SetId::new("stormguard_set"),
            name: "Stormguard Armor".to_string(),
            description: "Lightning-infused protection that amplifies defensive power."
                .to_string(),
            pieces: vec![
                GearSlot::Helm,
                GearSlot::Chest,
                GearSlot::WingGuards,
                GearSlot::TailSpike,
            ],
            bonuses: vec![
                tier(
                    2,
                    StatBlock::default().with_health(20).with_fire_rate(0.05),
                    "Storm Shield: +20 Health, +0.05 Fire Rate",
                ),
                tier(
                    4,
                    StatBlock::default()
                        .with_health(50)
                        .with_damage(8)
                        .with_fire_rate(0.15),
                    "Tempest Guard: +50 Health, +8 Damage, +0.15 Fire Rate",
                ),
            ],
        },
        GearSet {
            id: SetId::new("shadowweave_set"),
            name: "Shadowweave Collection".to_string(),
            description: "Mystical accessories that enhance critical strike power.".to_string(),
            pieces: vec![
                GearSlot::Charm,
                GearSlot::Ring,
                GearSlot::BreathFocus,
                GearSlot::WingGuards,
            ],
            bonuses: vec![
                tier(
                    2,
                    StatBlock::default().with_crit(0.08, 0.2),
                    "Shadow Strike: +8% Crit Chance, +20% Crit Damage",
                ),
                tier(
                    4,
                    StatBlock::default().with_crit(0.2, 0.6).with_damage(10),
                    "Void Mastery: +20% Crit Chance, +60% Crit Damage, +10 Damage",
                ),
            ],
        },
    ]
}
