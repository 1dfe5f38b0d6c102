use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::Result;

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub session: SessionConfig,
    pub audio: AudioConfig,
    pub input: InputConfig,
}

impl AppConfig {
    /// Reads a JSON configuration file. Missing fields fall back to defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config = serde_json::from_str(&raw)?;
        Ok(config)
    }

    /// Loads `path` when given, otherwise returns the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}

/// Tuning for the game session and the cadence formula.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Beeps per minute the biofeedback screen starts at.
    pub initial_cadence: f64,
    pub min_cadence: f64,
    pub max_cadence: f64,
    /// Cadence change per full divergence band.
    pub cadence_step: f64,
    /// Width in BPM of one divergence band.
    pub divergence_band: f64,
    pub regulator_interval_seconds: f64,
    pub initial_accuracy_score: f64,
    pub initial_live_bpm: f64,
    pub initial_heartbeat: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            initial_cadence: 80.0,
            min_cadence: 60.0,
            max_cadence: 100.0,
            cadence_step: 5.0,
            divergence_band: 10.0,
            regulator_interval_seconds: 10.0,
            initial_accuracy_score: 10.0,
            initial_live_bpm: 80.0,
            initial_heartbeat: 50.0,
        }
    }
}

/// Configuration specific to the audio cue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub cue_path: Option<String>,
    pub volume: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            cue_path: Some("beep-03.wav".to_string()),
            volume: 1.0,
        }
    }
}

/// Range of a UI slider. `step` of zero means continuous.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SliderRange {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl SliderRange {
    pub const fn new(min: f64, max: f64, step: f64) -> Self {
        Self { min, max, step }
    }

    /// Clamps `value` into the range and snaps it to the nearest step.
    /// Non-finite values land on `min`.
    pub fn snap(&self, value: f64) -> f64 {
        if !value.is_finite() {
            return self.min;
        }
        let clamped = value.clamp(self.min, self.max);
        if self.step > 0.0 {
            let steps = ((clamped - self.min) / self.step).round();
            (self.min + steps * self.step).min(self.max)
        } else {
            clamped
        }
    }
}

/// Slider ranges offered by the two screens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub target_bpm: SliderRange,
    pub default_target_bpm: f64,
    pub live_bpm: SliderRange,
    pub heartbeat: SliderRange,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            target_bpm: SliderRange::new(40.0, 180.0, 5.0),
            default_target_bpm: 40.0,
            live_bpm: SliderRange::new(50.0, 200.0, 5.0),
            heartbeat: SliderRange::new(50.0, 200.0, 0.0),
        }
    }
}
