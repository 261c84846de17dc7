//! Outbound events.

use serde::{Deserialize, Serialize};

use crate::loot::Reward;
use crate::progression::{EncounterClear, Enemy, LevelUp};
use crate::state::GameState;

/// Events emitted to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GameEvent {
    /// Full state snapshot
    #[serde(rename = "state:update")]
    StateUpdate {
        /// The state
        state: Box<GameState>,
    },
    /// A level was completed
    #[serde(rename = "level:complete", rename_all = "camelCase")]
    LevelComplete {
        /// Level now current
        new_level: u32,
        /// Rewards applied
        rewards: Vec<Reward>,
    },
    /// A boss level's quota was cleared
    #[serde(rename = "boss:defeated", rename_all = "camelCase")]
    BossDefeated {
        /// Level now current
        new_level: u32,
        /// The boss level
        boss_level: u32,
        /// Rewards applied
        rewards: Vec<Reward>,
    },
    /// An enemy spawned
    #[serde(rename = "enemy:spawn")]
    EnemySpawn {
        /// The enemy
        enemy: Enemy,
    },
    /// An enemy was defeated
    #[serde(rename = "enemy:defeated", rename_all = "camelCase")]
    EnemyDefeated {
        /// Id the caller reported
        enemy_id: u32,
        /// Loot applied
        rewards: Vec<Reward>,
    },
    /// Reply to ping
    #[serde(rename = "pong")]
    Pong,
}

impl GameEvent {
    /// Snapshot event for the current state.
    #[must_use]
    pub fn state_update(state: &GameState) -> Self {
        Self::StateUpdate {
            state: Box::new(state.clone()),
        }
    }

    /// Wire name of the event.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::StateUpdate { .. } => "state:update",
            Self::LevelComplete { .. } => "level:complete",
            Self::BossDefeated { .. } => "boss:defeated",
            Self::EnemySpawn { .. } => "enemy:spawn",
            Self::EnemyDefeated { .. } => "enemy:defeated",
            Self::Pong => "pong",
        }
    }
}

impl From<LevelUp> for GameEvent {
    fn from(up: LevelUp) -> Self {
        Self::LevelComplete {
            new_level: up.new_level,
            rewards: up.rewards,
        }
    }
}

impl From<EncounterClear> for GameEvent {
    fn from(clear: EncounterClear) -> Self {
        if clear.was_boss_level {
            Self::BossDefeated {
                new_level: clear.new_level,
                boss_level: clear.cleared_level,
                rewards: clear.rewards,
            }
        } else {
            Self::LevelComplete {
                new_level: clear.new_level,
                rewards: clear.rewards,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::economy::CurrencyKey;

    #[test]
    fn test_event_wire_shape() {
        let event = GameEvent::LevelComplete {
            new_level: 3,
            rewards: vec![Reward::currency(CurrencyKey::Steak, 100)],
        };
        let json = serde_json::to_value(&event).expect("serialize");
        assert_eq!(json["type"], "level:complete");
        assert_eq!(json["newLevel"], 3);
        assert_eq!(json["rewards"][0]["currencyType"], "steak");

        let pong = serde_json::to_string(&GameEvent::Pong).expect("serialize");
        assert_eq!(pong, r#"{"type":"pong"}"#);
    }

    #[test]
    fn test_boss_clear_maps_to_boss_event() {
        let event: GameEvent = EncounterClear {
            cleared_level: 10,
            new_level: 11,
            was_boss_level: true,
            rewards: Vec::new(),
        }
        .into();
        assert_eq!(event.kind(), "boss:defeated");
        assert!(matches!(event, GameEvent::BossDefeated { boss_level: 10, .. }));
    }

    #[test]
    fn test_state_update_round_trip() {
        let state = GameState::new(5);
        let json = serde_json::to_string(&GameEvent::state_update(&state)).expect("serialize");
        let back: GameEvent = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, GameEvent::state_update(&state));
    }
}
