//! # Wyrmforge Engine
//!
//! Host process for the Wyrmforge simulation.
//!
//! This crate ties the simulation core to the outside world:
//! - Config: TOML settings
//! - Runtime: the single simulation actor with its tick
//! - Save manager: snapshot persistence
//! - App: the JSON-lines stdio bridge

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

mod app;
mod config;
mod runtime;
mod save_manager;

use anyhow::{bail, Result};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Parses `--config <path>`, the only argument.
fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Option<PathBuf>> {
    let mut config = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => match args.next() {
                Some(path) => config = Some(PathBuf::from(path)),
                None => bail!("--config needs a path"),
            },
            other => bail!("unexpected argument: {other}"),
        }
    }
    Ok(config)
}

/// Main entry point.
fn main() -> Result<()> {
    // Stdout carries events, so logs go to stderr
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive("wyrmforge=info".parse()?))
        .init();

    let config_path = parse_args(std::env::args().skip(1))?;

    info!("Wyrmforge starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    app::run(config_path.as_deref())?;

    info!("Wyrmforge shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> impl Iterator<Item = String> {
        list.iter().map(ToString::to_string).collect::<Vec<_>>().into_iter()
    }

    #[test]
    fn test_parse_args() {
        assert_eq!(parse_args(args(&[])).expect("empty"), None);
        assert_eq!(
            parse_args(args(&["--config", "a.toml"])).expect("config"),
            Some(PathBuf::from("a.toml"))
        );
        assert!(parse_args(args(&["--config"])).is_err());
        assert!(parse_args(args(&["--verbose"])).is_err());
    }
}
