use serde::{Deserialize, Serialize};

use crate::SessionConfig;

/// Limits and step sizes of the cadence formula.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CadenceBounds {
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub band: f64,
}

impl Default for CadenceBounds {
    fn default() -> Self {
        Self {
            min: 60.0,
            max: 100.0,
            step: 5.0,
            band: 10.0,
        }
    }
}

impl CadenceBounds {
    /// Builds bounds from configuration, replacing unusable values with the
    /// defaults.
    pub fn from_config(config: &SessionConfig) -> Self {
        let defaults = Self::default();
        let (mut min, mut max) = (config.min_cadence, config.max_cadence);
        if !(min.is_finite() && max.is_finite() && min > 0.0) {
            tracing::warn!(min, max, "invalid cadence limits, using defaults");
            min = defaults.min;
            max = defaults.max;
        } else if min > max {
            std::mem::swap(&mut min, &mut max);
        }

        let step = if config.cadence_step.is_finite() && config.cadence_step >= 0.0 {
            config.cadence_step
        } else {
            defaults.step
        };
        let band = if config.divergence_band.is_finite() && config.divergence_band > 0.0 {
            config.divergence_band
        } else {
            defaults.band
        };

        Self {
            min,
            max,
            step,
            band,
        }
    }

    pub fn clamp(&self, cadence: f64) -> f64 {
        if cadence.is_finite() {
            cadence.clamp(self.min, self.max)
        } else {
            self.min
        }
    }
}

/// Next cadence given the current one and the live/target divergence.
///
/// Every full band the live rate sits above the target slows the cadence by
/// one step; every full band below speeds it up. The result stays in bounds.
pub fn next_cadence(current: f64, live_bpm: f64, target_bpm: f64, bounds: &CadenceBounds) -> f64 {
    let current = bounds.clamp(current);
    let difference = live_bpm - target_bpm;

    let next = if difference > 0.0 {
        (current - (difference / bounds.band).floor() * bounds.step).max(bounds.min)
    } else if difference < 0.0 {
        (current + (-difference / bounds.band).floor() * bounds.step).min(bounds.max)
    } else {
        current
    };

    bounds.clamp(next)
}

/// Outcome of one regulator tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CadenceChange {
    pub previous: f64,
    pub current: f64,
    pub difference: f64,
}

impl CadenceChange {
    pub fn changed(&self) -> bool {
        self.previous != self.current
    }
}

/// Tracks live and target heart rate and derives the beep cadence from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CadenceRegulator {
    target_bpm: f64,
    live_bpm: f64,
    beats_per_minute: f64,
    bounds: CadenceBounds,
}

impl CadenceRegulator {
    pub fn new(target_bpm: f64, config: &SessionConfig) -> Self {
        let bounds = CadenceBounds::from_config(config);
        let live_bpm = if config.initial_live_bpm.is_finite() {
            config.initial_live_bpm
        } else {
            target_bpm
        };
        Self {
            target_bpm,
            live_bpm,
            beats_per_minute: bounds.clamp(config.initial_cadence),
            bounds,
        }
    }

    /// Updates the live rate. Non-finite readings are dropped.
    pub fn set_live_bpm(&mut self, value: f64) -> bool {
        if !value.is_finite() {
            tracing::warn!(value, "ignoring non-finite live bpm");
            return false;
        }
        self.live_bpm = value;
        true
    }

    /// Recomputes the cadence from the current divergence.
    pub fn recompute(&mut self) -> CadenceChange {
        let previous = self.beats_per_minute;
        self.beats_per_minute =
            next_cadence(previous, self.live_bpm, self.target_bpm, &self.bounds);

        let change = CadenceChange {
            previous,
            current: self.beats_per_minute,
            difference: self.live_bpm - self.target_bpm,
        };
        if change.changed() {
            tracing::info!(
                live = self.live_bpm,
                target = self.target_bpm,
                from = previous,
                to = self.beats_per_minute,
                "cadence adjusted"
            );
        }
        change
    }

    pub fn target_bpm(&self) -> f64 {
        self.target_bpm
    }

    pub fn live_bpm(&self) -> f64 {
        self.live_bpm
    }

    pub fn beats_per_minute(&self) -> f64 {
        self.beats_per_minute
    }
}
