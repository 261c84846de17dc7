//! Travel state machine. Distance only accrues while advancing.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::state::GameState;

/// Travel error types.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TravelError {
    /// Transition not in the allow table
    #[error("Invalid travel transition: {from:?} -> {to:?}")]
    InvalidTransition {
        /// Current state
        from: TravelState,
        /// Requested state
        to: TravelState,
    },
}

/// Result type for travel operations.
pub type TravelResult<T> = Result<T, TravelError>;

/// Travel modes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TravelState {
    /// Idle
    #[default]
    Hovering,
    /// Moving forward, distance accrues
    Advancing,
    /// Falling back
    Retreating,
    /// At a level gate
    Gate,
    /// Scripted travel to a selected target
    TravelToTarget,
}

impl TravelState {
    /// States reachable from this one.
    #[must_use]
    pub const fn allowed_targets(self) -> &'static [TravelState] {
        match self {
            Self::Hovering => &[Self::Advancing, Self::TravelToTarget],
            Self::Advancing => &[Self::Hovering, Self::Retreating, Self::Gate],
            Self::Retreating => &[Self::Hovering, Self::Advancing],
            Self::Gate => &[Self::Hovering, Self::Advancing],
            Self::TravelToTarget => &[Self::Hovering, Self::Advancing],
        }
    }

    /// Checks whether `to` is reachable from this state.
    #[must_use]
    pub fn can_transition_to(self, to: TravelState) -> bool {
        self.allowed_targets().contains(&to)
    }

    /// Checks whether distance accrues in this state.
    #[must_use]
    pub const fn accrues_distance(self) -> bool {
        matches!(self, Self::Advancing)
    }
}

impl GameState {
    /// Moves the travel state machine to `to` if the transition is allowed.
    pub fn set_travel_state(&mut self, to: TravelState) -> TravelResult<()> {
        let from = self.travel_state;
        if !from.can_transition_to(to) {
            return Err(TravelError::InvalidTransition { from, to });
        }
        self.travel_state = to;
        debug!("Travel state {from:?} -> {to:?}");
        Ok(())
    }

    /// Starts advancing.
    pub fn start_travel(&mut self) -> TravelResult<()> {
        self.set_travel_state(TravelState::Advancing)
    }

    /// Stops and hovers.
    pub fn stop_travel(&mut self) -> TravelResult<()> {
        self.set_travel_state(TravelState::Hovering)
    }
}
