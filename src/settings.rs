//! Simulation settings with persistence
//!
//! Settings are saved to `~/.config/ember/settings.toml`

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Settings for a headless simulation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    /// Number of frames to simulate
    pub frames: u32,
    /// Fixed update rate in frames per second
    pub tick_rate: f64,
    /// Entities spawned into a fresh world
    pub entity_count: u32,
    /// Seed for spawn placement
    pub seed: u64,
    /// Write a snapshot of the world after the run, and restore from it on start
    pub snapshot: bool,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            frames: 600,
            tick_rate: 60.0,
            entity_count: 24,
            seed: 42,
            snapshot: false,
        }
    }
}

impl SimulationSettings {
    /// Get the config directory path
    fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("ember"))
    }

    /// Get the settings file path
    fn settings_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("settings.toml"))
    }

    /// Load settings from disk, or return defaults if not found
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else {
            warn!("Could not determine config directory");
            return Self::default();
        };

        if !path.exists() {
            info!("No settings file found, using defaults");
            return Self::default();
        }

        match fs::read_to_string(&path) {
            Ok(content) => match Self::parse(&content) {
                Ok(settings) => {
                    info!("Loaded settings from {:?}", path);
                    settings
                }
                Err(e) => {
                    warn!("Failed to parse settings: {}, using defaults", e);
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Failed to read settings file: {}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Parse settings from TOML. Missing fields take their default values.
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Whether a settings file exists on disk
    pub fn file_exists() -> bool {
        Self::settings_path().map(|p| p.exists()).unwrap_or(false)
    }

    /// Save settings to disk
    pub fn save(&self) -> anyhow::Result<()> {
        let Some(dir) = Self::config_dir() else {
            anyhow::bail!("Could not determine config directory");
        };

        let path = dir.join("settings.toml");

        if !dir.exists() {
            fs::create_dir_all(&dir)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        info!("Saved settings to {:?}", path);
        Ok(())
    }

    /// Seconds per frame. Falls back to 60 fps for a non-positive tick rate.
    pub fn tpf(&self) -> f64 {
        if self.tick_rate > 0.0 {
            1.0 / self.tick_rate
        } else {
            1.0 / 60.0
        }
    }
}
