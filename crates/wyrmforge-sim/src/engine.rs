//! The simulation engine instance.
//!
//! [`Engine`] owns the [`GameState`] together with the random source and the
//! clock. [`Engine::advance`] is the simulation primitive; [`Engine::tick`] and
//! the offline catch-up in [`Engine::init`] both feed it a real elapsed time.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::events::GameEvent;
use crate::materials::passive_generation;
use crate::migration::load_snapshot;
use crate::progression::Enemy;
use crate::state::GameState;

/// Longest offline period that is simulated at startup, in seconds.
pub const DEFAULT_MAX_OFFLINE_SECS: u64 = 24 * 60 * 60;

/// An isolated simulation instance.
#[derive(Debug)]
pub struct Engine {
    pub(crate) state: GameState,
    pub(crate) rng: ChaCha8Rng,
    clock: Box<dyn Clock>,
    /// Spawned enemies not yet defeated, by id. Never persisted.
    pub(crate) live_enemies: BTreeMap<u32, Enemy>,
    max_offline_secs: u64,
    /// Snapshot handed to the last `init` that could not be loaded.
    rejected_snapshot: Option<Value>,
}

/// Builder for [`Engine`].
#[derive(Debug, Default)]
pub struct EngineBuilder {
    seed: Option<u64>,
    clock: Option<Box<dyn Clock>>,
    max_offline_secs: Option<u64>,
}

impl EngineBuilder {
    /// Seeds the random source for a reproducible run.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Uses `clock` instead of the system clock.
    #[must_use]
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Box::new(clock));
        self
    }

    /// Caps the offline catch-up.
    #[must_use]
    pub fn max_offline_secs(mut self, secs: u64) -> Self {
        self.max_offline_secs = Some(secs);
        self
    }

    /// Builds an engine holding a fresh game.
    #[must_use]
    pub fn build(self) -> Engine {
        let clock = self.clock.unwrap_or_else(|| Box::new(SystemClock));
        let rng = match self.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Engine {
            state: GameState::new(clock.now_ms()),
            rng,
            clock,
            live_enemies: BTreeMap::new(),
            max_offline_secs: self.max_offline_secs.unwrap_or(DEFAULT_MAX_OFFLINE_SECS),
            rejected_snapshot: None,
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Engine {
    /// Starts building an engine.
    #[must_use]
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// The current game state.
    #[must_use]
    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Enemies spawned and not yet defeated.
    pub fn live_enemies(&self) -> impl Iterator<Item = &Enemy> {
        self.live_enemies.values()
    }

    /// Takes the snapshot the last `init` rejected, if any.
    ///
    /// The host must keep it somewhere before persisting the fresh game that
    /// replaced it.
    pub fn take_rejected_snapshot(&mut self) -> Option<Value> {
        self.rejected_snapshot.take()
    }

    /// Serializes the state for persistence.
    pub fn snapshot(&self) -> serde_json::Result<Value> {
        self.state.to_snapshot()
    }

    /// Advances the simulation by `dt_secs`.
    ///
    /// Adds play time, runs the forge mine and accrues distance. Returns one
    /// `level:complete` event per level finished during the step.
    pub fn advance(&mut self, dt_secs: f64) -> Vec<GameEvent> {
        if !dt_secs.is_finite() || dt_secs <= 0.0 {
            return Vec::new();
        }

        self.state.playtime_sec += dt_secs;
        for (material, amount) in passive_generation(self.state.current_level, dt_secs, &mut self.rng)
        {
            self.state.materials.add(material, amount);
        }

        let completed = self.state.accrue_distance(dt_secs);
        if !completed.is_empty() {
            self.live_enemies.clear();
        }
        completed.into_iter().map(GameEvent::from).collect()
    }

    /// Advances by the real time since the previous step and emits the state.
    pub fn tick(&mut self) -> Vec<GameEvent> {
        let now = self.clock.now_ms();
        let elapsed_ms = now.saturating_sub(self.state.last_tick_ms);
        self.state.last_tick_ms = now;

        let mut events = self.advance(elapsed_ms as f64 / 1000.0);
        events.push(GameEvent::state_update(&self.state));
        events
    }

    /// Replaces the state with a restored snapshot, or a fresh game.
    ///
    /// Old snapshots are migrated first. A snapshot that cannot be loaded is
    /// logged and replaced by a fresh game, and is kept for
    /// [`Engine::take_rejected_snapshot`]. Elapsed offline time, capped at the
    /// configured maximum, is then simulated as one step.
    pub fn init(&mut self, snapshot: Option<Value>) -> Vec<GameEvent> {
        let now = self.clock.now_ms();
        self.rejected_snapshot = None;
        self.state = match snapshot {
            Some(snapshot) => match load_snapshot(snapshot.clone()) {
                Ok((state, migrations)) => {
                    if !migrations.is_empty() {
                        info!("Snapshot migrated through {} step(s)", migrations.len());
                    }
                    state
                },
                Err(e) => {
                    warn!("Starting a fresh game, snapshot could not be loaded: {e}");
                    self.rejected_snapshot = Some(snapshot);
                    GameState::new(now)
                },
            },
            None => GameState::new(now),
        };
        self.live_enemies.clear();

        self.state.refresh_stats();
        let unlocked = self.state.unlock_recipes();
        if unlocked > 0 {
            debug!("Unlocked {unlocked} recipe(s) on load");
        }
        if self.state.current_level_state.total_enemies == 0 {
            self.state.reset_encounter();
        }

        let offline_ms = now.saturating_sub(self.state.last_tick_ms);
        let offline_secs = (offline_ms as f64 / 1000.0).min(self.max_offline_secs as f64);
        self.state.last_tick_ms = now;

        let mut events = Vec::new();
        if offline_secs > 0.0 {
            info!("Offline catch-up: {offline_secs:.0}s");
            events = self.advance(offline_secs);
        }
        events.push(GameEvent::state_update(&self.state));
        events
    }
}
