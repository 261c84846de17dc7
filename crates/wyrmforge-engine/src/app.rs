//! Stdio bridge.
//!
//! Reads one JSON command per line from stdin and writes one JSON event per
//! line to stdout. The saved snapshot, if any, is passed to `init` before the
//! first command from stdin.

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, Sender};
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::thread;
use tracing::{info, warn};
use wyrmforge_common::CURRENT_SCHEMA_VERSION;
use wyrmforge_sim::{Command, Engine, GameEvent};

use crate::config::EngineConfig;
use crate::runtime::{Runtime, RuntimeSettings};
use crate::save_manager::{JsonFileStore, SnapshotStore};

/// Runs the engine until stdin closes.
pub fn run(config_path: Option<&Path>) -> Result<()> {
    let mut config = config_path.map_or_else(EngineConfig::load, EngineConfig::load_from);
    config.validate();

    info!("Configuration loaded:");
    info!("  Tick interval: {}ms", config.tick_interval_ms);
    info!("  Save: {}/{}", config.save_dir.display(), config.save_name);
    info!("  Snapshot schema: v{CURRENT_SCHEMA_VERSION}");

    let store = JsonFileStore::new(&config.save_dir, config.save_name.clone())
        .context("invalid save location")?;
    let snapshot = match store.load() {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!("Ignoring unreadable snapshot: {e}");
            store
                .set_aside()
                .context("unreadable snapshot could not be moved aside")?;
            None
        },
    };

    let mut builder = Engine::builder().max_offline_secs(config.max_offline_secs);
    if let Some(seed) = config.rng_seed {
        builder = builder.seed(seed);
    }

    let mut runtime = Runtime::spawn(
        builder.build(),
        Box::new(store),
        RuntimeSettings {
            tick_interval: config.tick_interval(),
            autosave_interval: config.autosave_interval(),
        },
    )
    .context("failed to start simulation thread")?;

    runtime.send(Command::Init { state: snapshot });
    if let Some(commands) = runtime.sender() {
        thread::Builder::new()
            .name("wyrmforge-stdin".to_string())
            .spawn(move || {
                let read = pump_commands(io::stdin().lock(), &commands);
                info!("Input closed after {read} command(s)");
            })
            .context("failed to start input thread")?;
    }
    runtime.close();

    let written = write_events(runtime.events(), io::stdout().lock())?;
    info!("Wrote {written} event(s)");
    runtime.join();
    Ok(())
}

/// Forwards every parsable line as a command. Returns the number forwarded.
pub fn pump_commands<R: BufRead>(reader: R, commands: &Sender<Command>) -> usize {
    let mut forwarded = 0;
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("Failed to read input: {e}");
                break;
            },
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match serde_json::from_str::<Command>(line) {
            Ok(command) => {
                if commands.send(command).is_err() {
                    break;
                }
                forwarded += 1;
            },
            Err(e) => warn!("Ignoring malformed command: {e}"),
        }
    }
    forwarded
}

/// Writes events as JSON lines until the channel closes.
pub fn write_events<W: Write>(events: &Receiver<GameEvent>, mut out: W) -> Result<usize> {
    let mut written = 0;
    for event in events {
        serde_json::to_writer(&mut out, &event)?;
        out.write_all(b"\n")?;
        out.flush()?;
        written += 1;
    }
    Ok(written)
}
