//! Gear pieces, slots, rarities, equipping and enhancement.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use wyrmforge_common::{GearId, IdSequence, SetId};

use crate::economy::{CurrencyKey, EconomyError};
use crate::runes::Rune;
use crate::state::GameState;
use crate::stats::StatBlock;

/// Highest enhancement level a piece can reach.
pub const MAX_ENHANCEMENT: u32 = 25;

const ENHANCEMENT_BASE_COST: f64 = 100.0;
const ENHANCEMENT_GROWTH: f64 = 1.25;

/// Gear error types.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GearError {
    /// No piece with this id in the inventory or equipped
    #[error("Gear not found: {0}")]
    NotFound(GearId),
    /// Piece does not belong in the target slot
    #[error("Gear {gear} is {item_slot:?} gear and cannot go in {target:?}")]
    SlotMismatch {
        /// Piece being equipped
        gear: GearId,
        /// The piece's own slot
        item_slot: GearSlot,
        /// Requested slot
        target: GearSlot,
    },
    /// Nothing equipped in the slot
    #[error("Nothing equipped in {0:?}")]
    SlotEmpty(GearSlot),
    /// Enhancement cap reached
    #[error("Gear {0} is already at max enhancement")]
    MaxEnhancement(GearId),
    /// Could not pay for enhancement
    #[error(transparent)]
    Economy(#[from] EconomyError),
}

/// Result type for gear operations.
pub type GearResult<T> = Result<T, GearError>;

/// Equipment slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GearSlot {
    /// Head
    Helm,
    /// Body
    Chest,
    /// Front claws
    Claws,
    /// Tail
    TailSpike,
    /// Wings
    WingGuards,
    /// Charm
    Charm,
    /// Ring
    Ring,
    /// Breath focus
    BreathFocus,
}

/// What a slot's primary stat is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotCategory {
    /// Rolls damage
    Offensive,
    /// Rolls health
    Defensive,
    /// Rolls fire rate
    Utility,
}

impl GearSlot {
    /// All slots.
    pub const ALL: [Self; 8] = [
        Self::Helm,
        Self::Chest,
        Self::Claws,
        Self::TailSpike,
        Self::WingGuards,
        Self::Charm,
        Self::Ring,
        Self::BreathFocus,
    ];

    /// Primary stat category of the slot.
    #[must_use]
    pub const fn category(self) -> SlotCategory {
        match self {
            Self::Claws | Self::TailSpike => SlotCategory::Offensive,
            Self::Helm | Self::Chest | Self::WingGuards => SlotCategory::Defensive,
            Self::Charm | Self::Ring | Self::BreathFocus => SlotCategory::Utility,
        }
    }

    /// Base nouns used in generated item names.
    #[must_use]
    pub const fn nouns(self) -> &'static [&'static str] {
        match self {
            Self::Helm => &["Crown", "Helm", "Circlet", "Diadem", "Cap"],
            Self::Chest => &["Plate", "Mail", "Armor", "Cuirass", "Vest"],
            Self::Claws => &["Talons", "Claws", "Blades", "Rippers", "Hooks"],
            Self::TailSpike => &["Spike", "Barb", "Point", "Thorn", "Stinger"],
            Self::WingGuards => &["Guards", "Shields", "Plates", "Covers", "Mantles"],
            Self::Charm => &["Charm", "Amulet", "Pendant", "Talisman", "Ward"],
            Self::Ring => &["Ring", "Band", "Loop", "Circle", "Signet"],
            Self::BreathFocus => &["Focus", "Orb", "Crystal", "Stone", "Lens"],
        }
    }
}

/// Gear rarity tiers, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Rarity {
    /// Common
    Common,
    /// Rare
    Rare,
    /// Epic
    Epic,
    /// Legendary
    Legendary,
    /// Mythic
    Mythic,
}

impl Rarity {
    /// All tiers in ascending order.
    pub const ALL: [Self; 5] = [
        Self::Common,
        Self::Rare,
        Self::Epic,
        Self::Legendary,
        Self::Mythic,
    ];

    /// Multiplier applied to rolled stats.
    #[must_use]
    pub const fn stat_multiplier(self) -> f64 {
        match self {
            Self::Common => 1.0,
            Self::Rare => 1.5,
            Self::Epic => 2.5,
            Self::Legendary => 4.0,
            Self::Mythic => 6.0,
        }
    }

    /// Multiplier applied to enhancement cost.
    #[must_use]
    pub const fn enhancement_multiplier(self) -> f64 {
        match self {
            Self::Common => 1.0,
            Self::Rare => 1.5,
            Self::Epic => 2.0,
            Self::Legendary => 3.0,
            Self::Mythic => 5.0,
        }
    }

    /// Most sockets a dropped piece of this rarity can have.
    #[must_use]
    pub const fn max_sockets(self) -> usize {
        match self {
            Self::Common => 0,
            Self::Rare => 1,
            Self::Epic => 2,
            Self::Legendary => 3,
            Self::Mythic => 4,
        }
    }

    /// Chance that a dropped piece belongs to a set.
    #[must_use]
    pub const fn set_chance(self) -> f64 {
        match self {
            Self::Common => 0.05,
            Self::Rare => 0.15,
            Self::Epic => 0.25,
            Self::Legendary => 0.40,
            Self::Mythic => 0.60,
        }
    }

    /// Chance of each secondary stat roll.
    #[must_use]
    pub const fn secondary_stat_chance(self) -> f64 {
        match self {
            Self::Common => 0.0,
            Self::Rare => 0.3,
            Self::Epic => 0.5,
            Self::Legendary => 0.7,
            Self::Mythic => 0.9,
        }
    }

    /// Name prefixes for generated items.
    #[must_use]
    pub const fn prefixes(self) -> &'static [&'static str] {
        match self {
            Self::Common => &["Crude", "Simple", "Basic", "Plain", "Worn"],
            Self::Rare => &["Fine", "Quality", "Polished", "Sturdy", "Sharp"],
            Self::Epic => &["Masterwork", "Superior", "Gleaming", "Powerful", "Enchanted"],
            Self::Legendary => &["Ancient", "Legendary", "Mythical", "Celestial", "Divine"],
            Self::Mythic => &["Godlike", "Primordial", "Eternal", "Transcendent", "Ultimate"],
        }
    }

    /// Display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Common => "Common",
            Self::Rare => "Rare",
            Self::Epic => "Epic",
            Self::Legendary => "Legendary",
            Self::Mythic => "Mythic",
        }
    }
}

/// Socket types a rune can be placed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SocketType {
    /// Offensive socket
    Damage,
    /// Defensive socket
    Defense,
    /// Utility socket
    Utility,
}

impl SocketType {
    /// All socket types.
    pub const ALL: [Self; 3] = [Self::Damage, Self::Defense, Self::Utility];
}

/// A rune socket on a gear piece.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuneSocket {
    /// Socket id, unique within its piece
    pub id: String,
    /// Accepted socket type
    pub socket_type: SocketType,
    /// The socketed rune
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rune: Option<Rune>,
}

impl RuneSocket {
    /// Creates an empty socket.
    #[must_use]
    pub fn empty(index: usize, socket_type: SocketType) -> Self {
        Self {
            id: format!("socket_{index}"),
            socket_type,
            rune: None,
        }
    }
}

/// A piece of gear.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GearPiece {
    /// Unique id
    pub id: GearId,
    /// Display name
    pub name: String,
    /// Rarity tier
    pub rarity: Rarity,
    /// Slot the piece fits
    pub slot: GearSlot,
    /// Item level
    pub level: u32,
    /// Enhancement level, 0..=25
    #[serde(default)]
    pub enhancement: u32,
    /// Base stats
    #[serde(default)]
    pub stats: StatBlock,
    /// Set membership
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_id: Option<SetId>,
    /// Rune sockets
    #[serde(default)]
    pub sockets: Vec<RuneSocket>,
    /// Flavour text
    #[serde(default)]
    pub description: String,
}

impl GearPiece {
    /// Creates an unenhanced piece with no sockets and no set.
    #[must_use]
    pub fn new(
        id: GearId,
        name: impl Into<String>,
        rarity: Rarity,
        slot: GearSlot,
        level: u32,
        stats: StatBlock,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            rarity,
            slot,
            level,
            enhancement: 0,
            stats,
            set_id: None,
            sockets: Vec::new(),
            description: String::new(),
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Gold cost of the next enhancement level.
    #[must_use]
    pub fn enhancement_cost(&self) -> u64 {
        enhancement_cost(self.rarity, self.enhancement)
    }
}

/// Gold cost to enhance a piece from `current` to `current + 1`.
#[must_use]
pub fn enhancement_cost(rarity: Rarity, current: u32) -> u64 {
    let exponent = i32::try_from(current).unwrap_or(i32::MAX);
    (ENHANCEMENT_BASE_COST * rarity.enhancement_multiplier() * ENHANCEMENT_GROWTH.powi(exponent))
        .floor() as u64
}

/// The two pieces a new dragon starts with in its inventory.
pub fn starter_gear(ids: &mut IdSequence) -> Vec<GearPiece> {
    vec![
        GearPiece::new(
            ids.next_gear_id(),
            "Iron Talons",
            Rarity::Common,
            GearSlot::Claws,
            1,
            StatBlock::default().with_damage(2),
        )
        .with_description("Basic iron claws for a young dragon."),
        GearPiece::new(
            ids.next_gear_id(),
            "Leather Crown",
            Rarity::Common,
            GearSlot::Helm,
            1,
            StatBlock::default().with_health(5),
        )
        .with_description("A simple leather headpiece."),
    ]
}

/// Where a gear piece currently lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GearLocation {
    /// Equipped in a slot
    Equipped(GearSlot),
    /// At an index of the inventory
    Inventory(usize),
}

impl GameState {
    /// Finds a piece, equipped pieces first.
    #[must_use]
    pub fn locate_gear(&self, id: &GearId) -> Option<GearLocation> {
        self.equipped_gear
            .iter()
            .find(|(_, piece)| &piece.id == id)
            .map(|(slot, _)| GearLocation::Equipped(*slot))
            .or_else(|| {
                self.inventory
                    .iter()
                    .position(|piece| &piece.id == id)
                    .map(GearLocation::Inventory)
            })
    }

    /// Borrows a piece by location.
    #[must_use]
    pub fn gear_at(&self, location: GearLocation) -> Option<&GearPiece> {
        match location {
            GearLocation::Equipped(slot) => self.equipped_gear.get(&slot),
            GearLocation::Inventory(index) => self.inventory.get(index),
        }
    }

    /// Mutably borrows a piece by location.
    pub fn gear_at_mut(&mut self, location: GearLocation) -> Option<&mut GearPiece> {
        match location {
            GearLocation::Equipped(slot) => self.equipped_gear.get_mut(&slot),
            GearLocation::Inventory(index) => self.inventory.get_mut(index),
        }
    }

    /// Moves a piece from the inventory into `slot`.
    ///
    /// A piece already in the slot goes back to the inventory.
    pub fn equip_gear(&mut self, id: &GearId, slot: GearSlot) -> GearResult<()> {
        let index = self
            .inventory
            .iter()
            .position(|piece| &piece.id == id)
            .ok_or_else(|| GearError::NotFound(id.clone()))?;

        let item_slot = self.inventory[index].slot;
        if item_slot != slot {
            return Err(GearError::SlotMismatch {
                gear: id.clone(),
                item_slot,
                target: slot,
            });
        }

        let piece = self.inventory.remove(index);
        if let Some(previous) = self.equipped_gear.insert(slot, piece) {
            self.inventory.push(previous);
        }
        self.refresh_stats();

        debug!("Equipped {id} in {slot:?}");
        Ok(())
    }

    /// Moves the piece in `slot` back to the inventory.
    pub fn unequip_gear(&mut self, slot: GearSlot) -> GearResult<GearId> {
        let piece = self
            .equipped_gear
            .remove(&slot)
            .ok_or(GearError::SlotEmpty(slot))?;
        let id = piece.id.clone();
        self.inventory.push(piece);
        self.refresh_stats();

        debug!("Unequipped {id} from {slot:?}");
        Ok(id)
    }

    /// Raises a piece's enhancement by one, paying in gold.
    ///
    /// `slot` is a hint for where the piece is equipped; when it does not hold
    /// the piece the inventory and the other slots are searched. Returns the
    /// new enhancement level.
    pub fn enhance_gear(&mut self, id: &GearId, slot: Option<GearSlot>) -> GearResult<u32> {
        let hinted = slot
            .filter(|s| self.equipped_gear.get(s).is_some_and(|p| &p.id == id))
            .map(GearLocation::Equipped);
        let location = hinted
            .or_else(|| {
                self.inventory
                    .iter()
                    .position(|p| &p.id == id)
                    .map(GearLocation::Inventory)
            })
            .or_else(|| self.locate_gear(id))
            .ok_or_else(|| GearError::NotFound(id.clone()))?;

        let piece = self
            .gear_at(location)
            .ok_or_else(|| GearError::NotFound(id.clone()))?;
        if piece.enhancement >= MAX_ENHANCEMENT {
            return Err(GearError::MaxEnhancement(id.clone()));
        }
        let cost = piece.enhancement_cost();

        self.currencies.spend(CurrencyKey::Gold, cost)?;

        let level = match self.gear_at_mut(location) {
            Some(piece) => {
                piece.enhancement += 1;
                piece.enhancement
            },
            None => return Err(GearError::NotFound(id.clone())),
        };
        if matches!(location, GearLocation::Equipped(_)) {
            self.refresh_stats();
        }

        debug!("Enhanced {id} to +{level} for {cost} gold");
        Ok(level)
    }
}
