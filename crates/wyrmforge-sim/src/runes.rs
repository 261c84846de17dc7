//! Runes and socketing.
//!
//! A socketed rune is stored whole inside its socket, so unsocketing can hand
//! the same rune back to the free-rune inventory.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use wyrmforge_common::{GearId, RuneId};

use crate::gear::{GearLocation, SocketType};
use crate::state::GameState;
use crate::stats::StatBlock;

/// Rune error types.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RuneError {
    /// Gear id not found
    #[error("Gear not found: {0}")]
    GearNotFound(GearId),
    /// Rune id not in the free-rune inventory
    #[error("Rune not found: {0}")]
    RuneNotFound(RuneId),
    /// Socket index past the piece's sockets
    #[error("Gear {gear} has {sockets} sockets, index {index} is out of range")]
    SocketOutOfRange {
        /// Gear piece
        gear: GearId,
        /// Requested index
        index: usize,
        /// Sockets on the piece
        sockets: usize,
    },
    /// Rune does not fit the socket type
    #[error("Rune {rune} does not fit a {socket_type:?} socket")]
    Incompatible {
        /// Rune being socketed
        rune: RuneId,
        /// Type of the target socket
        socket_type: SocketType,
    },
    /// Socket already holds a rune
    #[error("Socket {index} of {gear} is occupied")]
    SocketOccupied {
        /// Gear piece
        gear: GearId,
        /// Socket index
        index: usize,
    },
    /// Socket holds no rune
    #[error("Socket {index} of {gear} is empty")]
    SocketEmpty {
        /// Gear piece
        gear: GearId,
        /// Socket index
        index: usize,
    },
}

/// Result type for rune operations.
pub type RuneResult<T> = Result<T, RuneError>;

/// Rune kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuneType {
    /// Damage
    Strength,
    /// Health
    Vitality,
    /// Fire rate
    Agility,
    /// Crits
    Focus,
    /// Find bonuses
    Fortune,
}

impl RuneType {
    /// All rune types.
    pub const ALL: [Self; 5] = [
        Self::Strength,
        Self::Vitality,
        Self::Agility,
        Self::Focus,
        Self::Fortune,
    ];

    /// Socket types this rune fits.
    #[must_use]
    pub fn compatible_sockets(self) -> Vec<SocketType> {
        match self {
            Self::Strength | Self::Focus => vec![SocketType::Damage],
            Self::Vitality => vec![SocketType::Defense],
            Self::Agility => vec![SocketType::Damage, SocketType::Utility],
            Self::Fortune => vec![SocketType::Utility],
        }
    }

    /// Stats of a rune of this type at `level`, scaled by a rarity multiplier.
    #[must_use]
    pub fn stats(self, level: u32, multiplier: f64) -> StatBlock {
        let l = f64::from(level);
        let block = StatBlock::default();
        match self {
            Self::Strength => block.with_damage(((2.0 + l * 0.2) * multiplier).floor() as u32),
            Self::Vitality => block.with_health(((5.0 + l * 0.3) * multiplier).floor() as u32),
            Self::Agility => block.with_fire_rate((0.05 + l * 0.01) * multiplier),
            Self::Focus => block.with_crit(
                (0.02 + l * 0.001) * multiplier,
                (0.05 + l * 0.002) * multiplier,
            ),
            Self::Fortune => {
                block.with_find((0.1 + l * 0.01) * multiplier, (0.05 + l * 0.005) * multiplier)
            },
        }
    }

    /// Capitalised name.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Strength => "Strength",
            Self::Vitality => "Vitality",
            Self::Agility => "Agility",
            Self::Focus => "Focus",
            Self::Fortune => "Fortune",
        }
    }
}

/// Rune rarity tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RuneRarity {
    /// ×1
    Lesser,
    /// ×2
    Greater,
    /// ×4
    Perfect,
}

impl RuneRarity {
    /// All tiers in ascending order.
    pub const ALL: [Self; 3] = [Self::Lesser, Self::Greater, Self::Perfect];

    /// Stat multiplier.
    #[must_use]
    pub const fn multiplier(self) -> f64 {
        match self {
            Self::Lesser => 1.0,
            Self::Greater => 2.0,
            Self::Perfect => 4.0,
        }
    }

    /// Display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Lesser => "Lesser",
            Self::Greater => "Greater",
            Self::Perfect => "Perfect",
        }
    }
}

/// A rune.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rune {
    /// Unique id
    pub id: RuneId,
    /// Display name
    pub name: String,
    /// Rune kind
    #[serde(rename = "type")]
    pub rune_type: RuneType,
    /// Rarity tier
    pub rarity: RuneRarity,
    /// Rune level
    pub level: u32,
    /// Stats granted while socketed
    #[serde(default)]
    pub stats: StatBlock,
    /// Socket types the rune fits
    pub socket_types: Vec<SocketType>,
    /// Flavour text
    #[serde(default)]
    pub description: String,
}

impl Rune {
    /// Builds a rune with the stats and compatibility of its type.
    #[must_use]
    pub fn new(id: RuneId, rune_type: RuneType, rarity: RuneRarity, level: u32) -> Self {
        Self {
            id,
            name: format!("{} Rune of {}", rarity.name(), rune_type.title()),
            rune_type,
            rarity,
            level,
            stats: rune_type.stats(level, rarity.multiplier()),
            socket_types: rune_type.compatible_sockets(),
            description: format!(
                "A {} rune that enhances {} abilities.",
                rarity.name().to_lowercase(),
                rune_type.title().to_lowercase()
            ),
        }
    }

    /// Checks whether the rune fits a socket type.
    #[must_use]
    pub fn fits(&self, socket_type: SocketType) -> bool {
        self.socket_types.contains(&socket_type)
    }
}

impl GameState {
    fn socket_location(&self, gear: &GearId, index: usize) -> RuneResult<GearLocation> {
        let location = self
            .locate_gear(gear)
            .ok_or_else(|| RuneError::GearNotFound(gear.clone()))?;
        let sockets = self.gear_at(location).map_or(0, |piece| piece.sockets.len());
        if index >= sockets {
            return Err(RuneError::SocketOutOfRange {
                gear: gear.clone(),
                index,
                sockets,
            });
        }
        Ok(location)
    }

    /// Moves a rune from the free-rune inventory into a gear socket.
    ///
    /// Every check runs before anything moves, so a rejected socketing leaves
    /// both the gear and the rune inventory untouched.
    pub fn socket_rune(&mut self, gear: &GearId, rune: &RuneId, index: usize) -> RuneResult<()> {
        let location = self.socket_location(gear, index)?;
        let rune_index = self
            .rune_inventory
            .iter()
            .position(|r| &r.id == rune)
            .ok_or_else(|| RuneError::RuneNotFound(rune.clone()))?;

        let socket = self
            .gear_at(location)
            .and_then(|piece| piece.sockets.get(index))
            .ok_or_else(|| RuneError::GearNotFound(gear.clone()))?;
        if !self.rune_inventory[rune_index].fits(socket.socket_type) {
            return Err(RuneError::Incompatible {
                rune: rune.clone(),
                socket_type: socket.socket_type,
            });
        }
        if socket.rune.is_some() {
            return Err(RuneError::SocketOccupied {
                gear: gear.clone(),
                index,
            });
        }

        let taken = self.rune_inventory.remove(rune_index);
        if let Some(socket) = self
            .gear_at_mut(location)
            .and_then(|piece| piece.sockets.get_mut(index))
        {
            socket.rune = Some(taken);
        }
        if matches!(location, GearLocation::Equipped(_)) {
            self.refresh_stats();
        }

        debug!("Socketed {rune} into {gear} socket {index}");
        Ok(())
    }

    /// Takes the rune out of a socket and returns it to the rune inventory.
    pub fn unsocket_rune(&mut self, gear: &GearId, index: usize) -> RuneResult<RuneId> {
        let location = self.socket_location(gear, index)?;
        let taken = self
            .gear_at_mut(location)
            .and_then(|piece| piece.sockets.get_mut(index))
            .and_then(|socket| socket.rune.take())
            .ok_or_else(|| RuneError::SocketEmpty {
                gear: gear.clone(),
                index,
            })?;

        let id = taken.id.clone();
        self.rune_inventory.push(taken);
        if matches!(location, GearLocation::Equipped(_)) {
            self.refresh_stats();
        }

        debug!("Unsocketed {id} from {gear} socket {index}");
        Ok(id)
    }
}
