//! The simulation actor.
//!
//! One thread owns the [`Engine`] and selects over the command channel and a
//! periodic tick, so commands and simulation steps never interleave. Events go
//! out on a second channel in the order they were produced.
//!
//! A snapshot the engine rejects on `init` is backed up before anything else
//! is saved. If the backup fails, saving stays off for the rest of the run so
//! the stored snapshot is never overwritten by the fresh game.

use crossbeam_channel::{never, select, tick, unbounded, Receiver, Sender};
use std::io;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use wyrmforge_sim::{Command, Engine, GameEvent};

use crate::save_manager::SnapshotStore;

/// Timing of the actor loop.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeSettings {
    /// Interval between simulation steps
    pub tick_interval: Duration,
    /// Interval between automatic saves
    pub autosave_interval: Option<Duration>,
}

/// Handle to a running simulation actor.
#[derive(Debug)]
pub struct Runtime {
    commands: Option<Sender<Command>>,
    events: Receiver<GameEvent>,
    thread: JoinHandle<()>,
}

impl Runtime {
    /// Spawns the actor thread.
    pub fn spawn(
        engine: Engine,
        store: Box<dyn SnapshotStore>,
        settings: RuntimeSettings,
    ) -> io::Result<Self> {
        let (command_tx, command_rx) = unbounded();
        let (event_tx, event_rx) = unbounded();

        let actor = Actor {
            engine,
            store,
            events: event_tx,
            saves_held: false,
        };
        let thread = thread::Builder::new()
            .name("wyrmforge-sim".to_string())
            .spawn(move || actor.run(&command_rx, settings))?;

        Ok(Self {
            commands: Some(command_tx),
            events: event_rx,
            thread,
        })
    }

    /// Queues a command. Returns `false` once the actor has stopped.
    pub fn send(&self, command: Command) -> bool {
        self.commands
            .as_ref()
            .is_some_and(|tx| tx.send(command).is_ok())
    }

    /// Another sender for the command channel.
    #[must_use]
    pub fn sender(&self) -> Option<Sender<Command>> {
        self.commands.clone()
    }

    /// Outbound events.
    #[must_use]
    pub fn events(&self) -> &Receiver<GameEvent> {
        &self.events
    }

    /// Drops this handle's sender. The actor stops once every sender is gone.
    pub fn close(&mut self) {
        self.commands = None;
    }

    /// Closes the handle and waits for the actor to finish.
    pub fn join(mut self) {
        self.close();
        if self.thread.join().is_err() {
            error!("Simulation thread panicked");
        }
    }
}

struct Actor {
    engine: Engine,
    store: Box<dyn SnapshotStore>,
    events: Sender<GameEvent>,
    saves_held: bool,
}

impl Actor {
    fn run(mut self, commands: &Receiver<Command>, settings: RuntimeSettings) {
        let ticker = tick(settings.tick_interval);
        let autosave = settings.autosave_interval.map_or_else(never, tick);
        info!("Simulation actor started");

        loop {
            select! {
                recv(commands) -> command => match command {
                    Ok(command) => self.on_command(command),
                    Err(_) => break,
                },
                recv(ticker) -> _ => {
                    let events = self.engine.tick();
                    self.emit(events);
                },
                recv(autosave) -> _ => self.save("autosave"),
            }
        }

        self.save("shutdown");
        info!("Simulation actor stopped");
    }

    fn on_command(&mut self, command: Command) {
        let kind = command.kind();
        let is_save = matches!(command, Command::RequestSave);

        let outcome = self.engine.handle(command);
        if !outcome.success {
            debug!("Command {kind} had no effect");
        }
        if let Some(rejected) = self.engine.take_rejected_snapshot() {
            self.preserve(&rejected);
        }
        if is_save {
            self.save("request");
        }
        self.emit(outcome.events);
    }

    fn emit(&self, events: Vec<GameEvent>) {
        for event in events {
            if self.events.send(event).is_err() {
                debug!("Event receiver gone, dropping events");
                return;
            }
        }
    }

    fn preserve(&mut self, rejected: &serde_json::Value) {
        match self.store.backup(rejected) {
            Ok(()) => {
                warn!("Stored snapshot could not be loaded, kept as a backup");
                self.saves_held = false;
            },
            Err(e) => {
                error!("Failed to back up unloadable snapshot, saving disabled: {e}");
                self.saves_held = true;
            },
        }
    }

    fn save(&mut self, reason: &str) {
        if self.saves_held {
            warn!("Skipping {reason} save, the stored snapshot is not backed up");
            return;
        }
        let snapshot = match self.engine.snapshot() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Failed to serialize state for {reason} save: {e}");
                return;
            },
        };
        match self.store.save(&snapshot) {
            Ok(()) => debug!("Saved snapshot ({reason})"),
            Err(e) => warn!("Failed {reason} save: {e}"),
        }
    }
}
