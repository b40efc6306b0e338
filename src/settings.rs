//! Run settings
//!
//! Read from a JSON file by the headless runner. Missing fields fall back
//! to their defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::Result;
use crate::consts::BULLET_POOL_CAPACITY;

/// Game mode preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum GameMode {
    /// 25 waves ending in a timed final stand
    #[default]
    Campaign,
    /// Endless waves; periods cycle and difficulty never eases
    Survival,
}

impl GameMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameMode::Campaign => "Campaign",
            GameMode::Survival => "Survival",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "campaign" | "story" => Some(GameMode::Campaign),
            "survival" | "endless" => Some(GameMode::Survival),
            _ => None,
        }
    }

    pub fn is_survival(&self) -> bool {
        *self == GameMode::Survival
    }
}

/// Settings for one simulated run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Survival rather than campaign
    pub survival_mode: bool,
    /// Waves already completed; the run begins at the next one
    pub start_wave: u32,
    /// RNG seed
    pub seed: u64,
    /// Maximum bullets alive at once
    pub bullet_pool_capacity: usize,
    /// Frame budget for the headless runner
    pub frames: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            survival_mode: false,
            start_wave: 0,
            seed: 0x0a11_3a2e,
            bullet_pool_capacity: BULLET_POOL_CAPACITY,
            // Five minutes at 60 Hz
            frames: 60 * 60 * 5,
        }
    }
}

impl Settings {
    /// Settings for `mode` with everything else at defaults
    pub fn from_mode(mode: GameMode) -> Self {
        Self {
            survival_mode: mode.is_survival(),
            ..Self::default()
        }
    }

    pub fn mode(&self) -> GameMode {
        if self.survival_mode {
            GameMode::Survival
        } else {
            GameMode::Campaign
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load settings from a JSON file
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let settings = Self::from_json(&json)?;
        log::info!("Loaded settings from {}", path.as_ref().display());
        Ok(settings)
    }

    /// Write settings as pretty JSON
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path.as_ref(), serde_json::to_string_pretty(self)?)?;
        log::info!("Settings saved to {}", path.as_ref().display());
        Ok(())
    }
}
