//! Crafting: recipe unlocking and material-to-gear conversion.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use wyrmforge_common::{GearId, RecipeId};

use crate::gear::{GearPiece, GearSlot, Rarity};
use crate::materials::{MaterialCost, MaterialType};
use crate::state::GameState;
use crate::stats::StatBlock;

/// Crafting error types.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CraftingError {
    /// Recipe not found
    #[error("Recipe not found: {0}")]
    RecipeNotFound(RecipeId),
    /// Recipe still locked
    #[error("Recipe locked: {0}")]
    Locked(RecipeId),
    /// Level too low
    #[error("Level too low: need {required}, have {current}")]
    LevelTooLow {
        /// Required level
        required: u32,
        /// Current level
        current: u32,
    },
    /// Missing material
    #[error("Missing material: {material:?}, need {needed}, have {have}")]
    MissingMaterial {
        /// Material that's missing
        material: MaterialType,
        /// Amount needed
        needed: u64,
        /// Amount available
        have: u64,
    },
}

/// Result type for crafting operations.
pub type CraftingResult<T> = Result<T, CraftingError>;

/// A crafting recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CraftingRecipe {
    /// Recipe id
    pub id: RecipeId,
    /// Name of the produced piece
    pub name: String,
    /// Slot of the produced piece
    pub slot: GearSlot,
    /// Rarity of the produced piece
    pub target_rarity: Rarity,
    /// Level needed to unlock and craft
    pub required_level: u32,
    /// Materials consumed
    pub materials: Vec<MaterialCost>,
    /// Stats of the produced piece
    pub base_stats: StatBlock,
    /// Once true, stays true
    #[serde(default)]
    pub unlocked: bool,
}

impl CraftingRecipe {
    /// Creates a recipe builder.
    pub fn builder(
        id: impl Into<RecipeId>,
        name: impl Into<String>,
        slot: GearSlot,
        rarity: Rarity,
    ) -> RecipeBuilder {
        RecipeBuilder::new(id.into(), name, slot, rarity)
    }
}

/// Builder for creating recipes.
#[derive(Debug)]
pub struct RecipeBuilder {
    id: RecipeId,
    name: String,
    slot: GearSlot,
    rarity: Rarity,
    required_level: u32,
    materials: Vec<MaterialCost>,
    base_stats: StatBlock,
}

impl RecipeBuilder {
    fn new(id: RecipeId, name: impl Into<String>, slot: GearSlot, rarity: Rarity) -> Self {
        Self {
            id,
            name: name.into(),
            slot,
            rarity,
            required_level: 1,
            materials: Vec::new(),
            base_stats: StatBlock::default(),
        }
    }

    /// Sets the required level.
    #[must_use]
    pub const fn required_level(mut self, level: u32) -> Self {
        self.required_level = level;
        self
    }

    /// Adds a material requirement.
    #[must_use]
    pub fn material(mut self, material: MaterialType, amount: u64) -> Self {
        self.materials.push(MaterialCost::new(material, amount));
        self
    }

    /// Sets the produced stats.
    #[must_use]
    pub const fn stats(mut self, stats: StatBlock) -> Self {
        self.base_stats = stats;
        self
    }

    /// Builds the recipe. Level-1 recipes start unlocked.
    #[must_use]
    pub fn build(self) -> CraftingRecipe {
        CraftingRecipe {
            id: self.id,
            name: self.name,
            slot: self.slot,
            target_rarity: self.rarity,
            unlocked: self.required_level <= 1,
            required_level: self.required_level,
            materials: self.materials,
            base_stats: self.base_stats,
        }
    }
}

/// The recipes of a new game.
#[must_use]
pub fn default_recipes() -> Vec<CraftingRecipe> {
    use MaterialType::*;

    vec![
        CraftingRecipe::builder("iron_helm", "Iron Crown", GearSlot::Helm, Rarity::Common)
            .material(Emberdust, 3)
            .material(Frostshards, 2)
            .stats(StatBlock::default().with_health(8))
            .build(),
        CraftingRecipe::builder("iron_claws", "Iron Talons", GearSlot::Claws, Rarity::Common)
            .material(Emberdust, 2)
            .material(Stormmotes, 2)
            .stats(StatBlock::default().with_damage(4))
            .build(),
        CraftingRecipe::builder("steel_chest", "Steel Plate", GearSlot::Chest, Rarity::Rare)
            .required_level(5)
            .material(Emberore, 1)
            .material(Frostmetal, 1)
            .material(Emberdust, 10)
            .stats(StatBlock::default().with_health(15).with_damage(2))
            .build(),
        CraftingRecipe::builder("storm_ring", "Storm Band", GearSlot::Ring, Rarity::Rare)
            .required_level(8)
            .material(Stormsteel, 1)
            .material(Stormmotes, 8)
            .material(Frostshards, 5)
            .stats(StatBlock::default().with_fire_rate(0.8).with_damage(3))
            .build(),
        CraftingRecipe::builder(
            "shadow_focus",
            "Shadow Orb",
            GearSlot::BreathFocus,
            Rarity::Epic,
        )
        .required_level(12)
        .material(Shadowessence, 2)
        .material(Emberore, 2)
        .material(Stormsteel, 1)
        .stats(StatBlock::default().with_fire_rate(1.2).with_damage(8))
        .build(),
    ]
}

impl GameState {
    /// Unlocks every recipe whose level requirement is met. Returns how many changed.
    pub fn unlock_recipes(&mut self) -> usize {
        let level = self.current_level;
        let mut unlocked = 0;
        for recipe in &mut self.recipes {
            if !recipe.unlocked && level >= recipe.required_level {
                recipe.unlocked = true;
                unlocked += 1;
                info!("Unlocked recipe {}", recipe.id);
            }
        }
        unlocked
    }

    /// Gets a recipe by id.
    #[must_use]
    pub fn recipe(&self, id: &RecipeId) -> Option<&CraftingRecipe> {
        self.recipes.iter().find(|r| &r.id == id)
    }

    /// Checks every requirement of a recipe.
    pub fn validate_craft(&self, id: &RecipeId) -> CraftingResult<&CraftingRecipe> {
        let recipe = self
            .recipe(id)
            .ok_or_else(|| CraftingError::RecipeNotFound(id.clone()))?;
        if !recipe.unlocked {
            return Err(CraftingError::Locked(id.clone()));
        }
        if self.current_level < recipe.required_level {
            return Err(CraftingError::LevelTooLow {
                required: recipe.required_level,
                current: self.current_level,
            });
        }
        if let Some(short) = self.materials.shortfall(&recipe.materials) {
            return Err(CraftingError::MissingMaterial {
                material: short.material_type,
                needed: short.amount,
                have: self.materials.count(short.material_type),
            });
        }
        Ok(recipe)
    }

    /// Checks whether a recipe can be crafted right now.
    ///
    /// Missing materials or level give `Ok(false)`; unknown or locked recipes are errors.
    pub fn can_craft(&self, id: &RecipeId) -> CraftingResult<bool> {
        match self.validate_craft(id) {
            Ok(_) => Ok(true),
            Err(CraftingError::MissingMaterial { .. } | CraftingError::LevelTooLow { .. }) => {
                Ok(false)
            },
            Err(e) => Err(e),
        }
    }

    /// Consumes the recipe's materials and adds the crafted piece to the inventory.
    pub fn craft_gear(&mut self, id: &RecipeId) -> CraftingResult<GearId> {
        let recipe = self.validate_craft(id)?.clone();

        if let Err(short) = self.materials.consume(&recipe.materials) {
            return Err(CraftingError::MissingMaterial {
                material: short.material_type,
                needed: short.amount,
                have: self.materials.count(short.material_type),
            });
        }

        let gear_id = self.id_sequence.next_gear_id();
        let piece = GearPiece::new(
            gear_id.clone(),
            recipe.name.as_str(),
            recipe.target_rarity,
            recipe.slot,
            self.current_level,
            recipe.base_stats,
        )
        .with_description(format!(
            "Crafted {} equipment made with precision.",
            recipe.target_rarity.name()
        ));
        self.inventory.push(piece);

        debug!("Crafted {gear_id} from {id}");
        Ok(gear_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stocked_state() -> GameState {
        let mut state = GameState::new(0);
        state.materials.add(MaterialType::Emberdust, 5);
        state.materials.add(MaterialType::Frostshards, 2);
        state
    }

    #[test]
    fn test_default_unlocks() {
        let state = GameState::new(0);
        let unlocked: Vec<_> = state
            .recipes
            .iter()
            .filter(|r| r.unlocked)
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(unlocked, vec!["iron_helm", "iron_claws"]);
    }

    #[test]
    fn test_craft_consumes_and_produces() {
        let mut state = stocked_state();
        state.current_level = 3;
        let before = state.inventory.len();

        let id = state.craft_gear(&RecipeId::new("iron_helm")).expect("craft");
        assert_eq!(state.materials.count(MaterialType::Emberdust), 2);
        assert_eq!(state.materials.count(MaterialType::Frostshards), 0);
        assert_eq!(state.inventory.len(), before + 1);

        let piece = state.inventory.iter().find(|p| p.id == id).expect("crafted");
        assert_eq!(piece.level, 3);
        assert_eq!(piece.enhancement, 0);
        assert_eq!(piece.stats.health, Some(8));
        assert!(piece.sockets.is_empty());
    }

    #[test]
    fn test_craft_missing_material_deducts_nothing() {
        let mut state = stocked_state();
        let before = state.clone();

        let result = state.craft_gear(&RecipeId::new("iron_claws"));
        assert_eq!(
            result,
            Err(CraftingError::MissingMaterial {
                material: MaterialType::Stormmotes,
                needed: 2,
                have: 0,
            })
        );
        assert_eq!(state, before);
        assert_eq!(state.can_craft(&RecipeId::new("iron_claws")), Ok(false));
    }

    #[test]
    fn test_locked_and_unknown_recipes() {
        let mut state = stocked_state();
        assert_eq!(
            state.craft_gear(&RecipeId::new("steel_chest")),
            Err(CraftingError::Locked(RecipeId::new("steel_chest")))
        );
        assert!(matches!(
            state.can_craft(&RecipeId::new("dragon_egg")),
            Err(CraftingError::RecipeNotFound(_))
        ));
    }

    #[test]
    fn test_unlock_is_permanent() {
        let mut state = GameState::new(0);
        state.current_level = 8;
        assert_eq!(state.unlock_recipes(), 2);

        state.current_level = 1;
        assert_eq!(state.unlock_recipes(), 0);
        assert!(state.recipe(&RecipeId::new("storm_ring")).is_some_and(|r| r.unlocked));
    }
}
