//! Command gateway.
//!
//! Every inbound [`Command`] goes through [`Engine::handle`], which runs it to
//! completion and returns the events to emit. Rejected commands leave the
//! state unchanged and report `success: false`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use wyrmforge_common::{GearId, RecipeId, RuneId};

use crate::economy::{CurrencyKey, UpgradeType};
use crate::engine::Engine;
use crate::error::{SimError, SimResult};
use crate::events::GameEvent;
use crate::gear::GearSlot;
use crate::state::GameState;

/// Commands from the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Command {
    /// Loads a snapshot, or starts fresh without one
    Init {
        /// Persisted snapshot
        #[serde(default)]
        state: Option<Value>,
    },
    /// Asks for the state to persist
    RequestSave,
    /// Liveness check
    Ping,
    /// Credits a currency
    AddCurrency {
        /// Currency to credit
        #[serde(default)]
        currency: CurrencyKey,
        /// Amount
        amount: u64,
    },
    /// Buys one upgrade level
    #[serde(rename_all = "camelCase")]
    PurchaseUpgrade {
        /// Upgrade to buy
        upgrade_type: UpgradeType,
    },
    /// Skips to the next level
    AdvanceLevel,
    /// Completes the current level
    CompleteLevel,
    /// Spawns the next enemy of the encounter
    SpawnEnemy,
    /// Reports an enemy defeat
    #[serde(rename_all = "camelCase")]
    EnemyDefeated {
        /// Id from the spawn event
        enemy_id: u32,
    },
    /// Jumps to an unlocked level
    SelectLevel {
        /// Level to select
        level: u32,
    },
    /// Equips a piece into a slot
    #[serde(rename_all = "camelCase")]
    EquipGear {
        /// Piece to equip
        gear_id: GearId,
        /// Target slot
        slot: GearSlot,
    },
    /// Moves the piece in a slot back to the inventory
    UnequipGear {
        /// Slot to empty
        slot: GearSlot,
    },
    /// Enhances a piece by one level
    #[serde(rename_all = "camelCase")]
    EnhanceGear {
        /// Piece to enhance
        gear_id: GearId,
        /// Slot to look in first
        #[serde(default)]
        slot: Option<GearSlot>,
    },
    /// Crafts a recipe
    #[serde(rename_all = "camelCase")]
    CraftGear {
        /// Recipe to craft
        recipe_id: RecipeId,
    },
    /// Puts a rune into a socket
    #[serde(rename_all = "camelCase")]
    SocketRune {
        /// Piece holding the socket
        gear_id: GearId,
        /// Rune from the rune inventory
        rune_id: RuneId,
        /// Socket position
        socket_index: usize,
    },
    /// Takes a rune out of a socket
    #[serde(rename_all = "camelCase")]
    UnsocketRune {
        /// Piece holding the socket
        gear_id: GearId,
        /// Socket position
        socket_index: usize,
    },
    /// Starts advancing
    StartTravel,
    /// Stops and hovers
    StopTravel,
}

impl Command {
    /// Wire name of the command.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Init { .. } => "init",
            Self::RequestSave => "request-save",
            Self::Ping => "ping",
            Self::AddCurrency { .. } => "add-currency",
            Self::PurchaseUpgrade { .. } => "purchase-upgrade",
            Self::AdvanceLevel => "advance-level",
            Self::CompleteLevel => "complete-level",
            Self::SpawnEnemy => "spawn-enemy",
            Self::EnemyDefeated { .. } => "enemy-defeated",
            Self::SelectLevel { .. } => "select-level",
            Self::EquipGear { .. } => "equip-gear",
            Self::UnequipGear { .. } => "unequip-gear",
            Self::EnhanceGear { .. } => "enhance-gear",
            Self::CraftGear { .. } => "craft-gear",
            Self::SocketRune { .. } => "socket-rune",
            Self::UnsocketRune { .. } => "unsocket-rune",
            Self::StartTravel => "start-travel",
            Self::StopTravel => "stop-travel",
        }
    }
}

/// Result of handling one command.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandOutcome {
    /// Whether the command took effect
    pub success: bool,
    /// Events to emit, in order
    pub events: Vec<GameEvent>,
}

impl CommandOutcome {
    fn success(events: Vec<GameEvent>) -> Self {
        Self {
            success: true,
            events,
        }
    }

    fn failure(events: Vec<GameEvent>) -> Self {
        Self {
            success: false,
            events,
        }
    }
}

/// Emits the state on success, nothing on failure.
fn settle<T>(state: &GameState, command: &'static str, result: SimResult<T>) -> CommandOutcome {
    match result {
        Ok(_) => CommandOutcome::success(vec![GameEvent::state_update(state)]),
        Err(e) => {
            debug!("Rejected {command}: {e}");
            CommandOutcome::failure(Vec::new())
        },
    }
}

impl Engine {
    /// Handles one command to completion.
    pub fn handle(&mut self, command: Command) -> CommandOutcome {
        let kind = command.kind();
        match command {
            Command::Init { state } => CommandOutcome::success(self.init(state)),
            Command::RequestSave => {
                CommandOutcome::success(vec![GameEvent::state_update(&self.state)])
            },
            Command::Ping => CommandOutcome::success(vec![GameEvent::Pong]),
            Command::AddCurrency { currency, amount } => {
                let credited = self.state.add_currency(currency, amount);
                if !credited {
                    debug!("Rejected {kind}: no {currency:?} entry");
                }
                let events = vec![GameEvent::state_update(&self.state)];
                if credited {
                    CommandOutcome::success(events)
                } else {
                    CommandOutcome::failure(events)
                }
            },
            Command::PurchaseUpgrade { upgrade_type } => {
                let result = self.state.purchase_upgrade(upgrade_type).map_err(SimError::from);
                settle(&self.state, kind, result)
            },
            Command::AdvanceLevel | Command::CompleteLevel => {
                let up = self.state.complete_level();
                self.live_enemies.clear();
                CommandOutcome::success(vec![
                    up.into(),
                    GameEvent::state_update(&self.state),
                ])
            },
            Command::SpawnEnemy => match self.state.spawn_enemy(&mut self.rng) {
                Ok(enemy) => {
                    self.live_enemies.insert(enemy.id, enemy.clone());
                    CommandOutcome::success(vec![
                        GameEvent::EnemySpawn { enemy },
                        GameEvent::state_update(&self.state),
                    ])
                },
                Err(e) => {
                    debug!("Rejected {kind}: {e}");
                    CommandOutcome::failure(vec![GameEvent::state_update(&self.state)])
                },
            },
            Command::EnemyDefeated { enemy_id } => {
                let known = self.live_enemies.remove(&enemy_id);
                let defeat = self.state.defeat_enemy(known, &mut self.rng);

                let mut events = vec![GameEvent::EnemyDefeated {
                    enemy_id,
                    rewards: defeat.rewards,
                }];
                if let Some(clear) = defeat.cleared {
                    self.live_enemies.clear();
                    events.push(clear.into());
                }
                events.push(GameEvent::state_update(&self.state));
                CommandOutcome::success(events)
            },
            Command::SelectLevel { level } => {
                let result = self.state.select_level(level);
                let events = vec![GameEvent::state_update(&self.state)];
                match result {
                    Ok(()) => {
                        self.live_enemies.clear();
                        CommandOutcome::success(events)
                    },
                    Err(e) => {
                        debug!("Rejected {kind}: {e}");
                        CommandOutcome::failure(events)
                    },
                }
            },
            Command::EquipGear { gear_id, slot } => {
                let result = self.state.equip_gear(&gear_id, slot).map_err(SimError::from);
                settle(&self.state, kind, result)
            },
            Command::UnequipGear { slot } => {
                let result = self.state.unequip_gear(slot).map_err(SimError::from);
                settle(&self.state, kind, result)
            },
            Command::EnhanceGear { gear_id, slot } => {
                let result = self.state.enhance_gear(&gear_id, slot).map_err(SimError::from);
                settle(&self.state, kind, result)
            },
            Command::CraftGear { recipe_id } => {
                let result = self.state.craft_gear(&recipe_id).map_err(SimError::from);
                settle(&self.state, kind, result)
            },
            Command::SocketRune {
                gear_id,
                rune_id,
                socket_index,
            } => {
                let result = self
                    .state
                    .socket_rune(&gear_id, &rune_id, socket_index)
                    .map_err(SimError::from);
                settle(&self.state, kind, result)
            },
            Command::UnsocketRune {
                gear_id,
                socket_index,
            } => {
                let result = self
                    .state
                    .unsocket_rune(&gear_id, socket_index)
                    .map_err(SimError::from);
                settle(&self.state, kind, result)
            },
            Command::StartTravel => {
                let result = self.state.start_travel().map_err(SimError::from);
                settle(&self.state, kind, result)
            },
            Command::StopTravel => {
                let result = self.state.stop_travel().map_err(SimError::from);
                settle(&self.state, kind, result)
            },
        }
    }

    /// Parses and handles a JSON command.
    pub fn handle_json(&mut self, command: &str) -> serde_json::Result<CommandOutcome> {
        let command: Command = serde_json::from_str(command)?;
        Ok(self.handle(command))
    }
}
