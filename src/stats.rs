//! Cumulative run statistics
//!
//! A plain aggregate for an external save collaborator. The simulation
//! only writes to it; storage format is up to the caller.

use serde::{Deserialize, Serialize};

use crate::Result;

/// Highest wave recorded as reached
pub const MAX_RECORDED_WAVE: u32 = 24;

/// Statistics for one run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunStats {
    pub current_wave: u32,
    /// Highest wave fully completed
    pub max_wave: u32,
    /// Seconds of simulated play
    pub time_played: f64,
    pub deaths: u32,
    pub tanks_killed: u32,
    pub helis_killed: u32,
    pub damage_dealt: f32,
    pub damage_taken: f32,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wave a continued run restarts from (whole groups of three)
    pub fn checkpoint_wave(&self) -> u32 {
        (self.max_wave / 3) * 3
    }

    /// Record arrival at `wave`
    pub fn enter_wave(&mut self, wave: u32) {
        self.current_wave = wave;
        self.max_wave = self
            .max_wave
            .max(wave.saturating_sub(1).min(MAX_RECORDED_WAVE));
    }

    pub fn total_kills(&self) -> u32 {
        self.tanks_killed + self.helis_killed
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkpoint_wave() {
        let mut stats = RunStats::new();
        assert_eq!(stats.checkpoint_wave(), 0);
        stats.max_wave = 5;
        assert_eq!(stats.checkpoint_wave(), 3);
        stats.max_wave = 6;
        assert_eq!(stats.checkpoint_wave(), 6);
    }

    #[test]
    fn test_enter_wave_tracks_completed_waves() {
        let mut stats = RunStats::new();
        stats.enter_wave(1);
        assert_eq!(stats.max_wave, 0);
        stats.enter_wave(8);
        assert_eq!((stats.current_wave, stats.max_wave), (8, 7));
        stats.enter_wave(30);
        assert_eq!(stats.max_wave, MAX_RECORDED_WAVE);
        // Never decreases
        stats.enter_wave(2);
        assert_eq!(stats.max_wave, MAX_RECORDED_WAVE);
    }

    #[test]
    fn test_json_round_trip() {
        let stats = RunStats {
            current_wave: 4,
            max_wave: 3,
            time_played: 95.5,
            deaths: 1,
            tanks_killed: 6,
            helis_killed: 2,
            damage_dealt: 12.5,
            damage_taken: 1.75,
        };
        let back = RunStats::from_json(&stats.to_json().expect("serialize")).expect("parse");
        assert_eq!(back, stats);
        assert_eq!(back.total_kills(), 8);
    }
}
