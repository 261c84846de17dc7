//! Engine configuration.
//!
//! Provides the runtime, persistence and simulation settings of the host.
//! Configuration is loaded from a TOML file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};
use wyrmforge_sim::DEFAULT_MAX_OFFLINE_SECS;

/// Configuration file name.
pub const CONFIG_FILE: &str = "wyrmforge.toml";

/// Engine configuration parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // === Simulation ===
    /// Interval between simulation steps, in milliseconds
    pub tick_interval_ms: u64,
    /// Random seed (None = from entropy)
    pub rng_seed: Option<u64>,
    /// Longest offline period simulated at startup, in seconds
    pub max_offline_secs: u64,

    // === Persistence ===
    /// Directory holding the snapshot
    pub save_dir: PathBuf,
    /// Snapshot file name, without extension
    pub save_name: String,
    /// Auto-save interval in seconds (0 = disabled)
    pub autosave_interval_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
            rng_seed: None,
            max_offline_secs: DEFAULT_MAX_OFFLINE_SECS,

            save_dir: PathBuf::from("saves"),
            save_name: "wyrmforge".to_string(),
            autosave_interval_secs: 30,
        }
    }
}

impl EngineConfig {
    /// Load configuration from the default file location.
    /// Returns default config if file doesn't exist.
    pub fn load() -> Self {
        Self::load_from(CONFIG_FILE)
    }

    /// Load configuration from a specific path.
    /// Returns default config if file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file not found, using defaults");
            return Self::default();
        }

        match fs::File::open(path) {
            Ok(mut file) => {
                let mut contents = String::new();
                if let Err(e) = file.read_to_string(&mut contents) {
                    warn!("Failed to read config file: {e}");
                    return Self::default();
                }

                match toml::from_str(&contents) {
                    Ok(config) => {
                        info!("Loaded config from {}", path.display());
                        config
                    },
                    Err(e) => {
                        warn!("Failed to parse config file: {e}");
                        Self::default()
                    },
                }
            },
            Err(e) => {
                warn!("Failed to open config file: {e}");
                Self::default()
            },
        }
    }

    /// Save configuration to a specific path.
    #[cfg(test)]
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        use std::io::{self, Write};

        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let mut file = fs::File::create(path)?;
        file.write_all(contents.as_bytes())?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Validate and clamp configuration values to sensible ranges.
    pub fn validate(&mut self) {
        self.tick_interval_ms = self.tick_interval_ms.clamp(50, 60_000);
        self.max_offline_secs = self.max_offline_secs.min(7 * DEFAULT_MAX_OFFLINE_SECS);
        self.autosave_interval_secs = self.autosave_interval_secs.min(3600);

        if self.save_name.trim().is_empty() {
            self.save_name = Self::default().save_name;
        }
    }

    /// Interval between simulation steps.
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Auto-save interval, if enabled.
    #[must_use]
    pub fn autosave_interval(&self) -> Option<Duration> {
        (self.autosave_interval_secs > 0).then(|| Duration::from_secs(self.autosave_interval_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.tick_interval_ms, 1000);
        assert_eq!(config.autosave_interval_secs, 30);
        assert_eq!(config.max_offline_secs, 86_400);
        assert!(config.rng_seed.is_none());
    }

    #[test]
    fn test_config_validation() {
        let mut config = EngineConfig::default();

        config.tick_interval_ms = 1;
        config.max_offline_secs = u64::MAX;
        config.save_name = "  ".to_string();

        config.validate();

        assert_eq!(config.tick_interval_ms, 50);
        assert_eq!(config.max_offline_secs, 7 * 86_400);
        assert_eq!(config.save_name, "wyrmforge");
    }

    #[test]
    fn test_config_save_load() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("test_config.toml");

        let mut config = EngineConfig::default();
        config.tick_interval_ms = 250;
        config.rng_seed = Some(12345);
        config.save_name = "slot_a".to_string();

        config.save_to(&config_path).expect("Failed to save config");

        let loaded = EngineConfig::load_from(&config_path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_config_partial_file_uses_defaults() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("partial.toml");
        fs::write(&config_path, "autosave_interval_secs = 0\n").expect("write");

        let config = EngineConfig::load_from(&config_path);
        assert_eq!(config.autosave_interval(), None);
        assert_eq!(config.tick_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_config_load_invalid_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("broken.toml");
        fs::write(&config_path, "tick_interval_ms = \"fast\"").expect("write");

        assert_eq!(EngineConfig::load_from(&config_path), EngineConfig::default());
    }

    #[test]
    fn test_config_load_missing_file() {
        let config = EngineConfig::load_from("/nonexistent/path/config.toml");
        assert_eq!(config.tick_interval_ms, 1000);
    }
}
