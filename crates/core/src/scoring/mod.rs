use serde::{Deserialize, Serialize};

const POINTS_PER_TAP: f64 = 10.0;
const HEARTBEAT_SCALE: f64 = 0.01;
const HEARTBEAT_MIN: f64 = 50.0;
const HEARTBEAT_MAX: f64 = 200.0;

/// Converts a heartbeat slider value into a score multiplier in [0.5, 2.0].
pub fn heartbeat_multiplier(slider_value: f64) -> f64 {
    if !slider_value.is_finite() {
        return HEARTBEAT_MIN * HEARTBEAT_SCALE;
    }
    slider_value.clamp(HEARTBEAT_MIN, HEARTBEAT_MAX) * HEARTBEAT_SCALE
}

/// Timing accuracy in [0, 1] for a tap `elapsed` seconds away from a beat at
/// `bpm`: 1 on the beat, 0 a full period or more away, linear in between.
pub fn tap_accuracy(elapsed: f64, bpm: f64) -> f64 {
    if !elapsed.is_finite() || !bpm.is_finite() || bpm <= 0.0 {
        return 0.0;
    }
    let beat_period = 60.0 / bpm;
    (1.0 - (elapsed.abs() / beat_period).min(1.0)).clamp(0.0, 1.0)
}

/// A user tap on the rhythm button.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TapEvent {
    pub time_seconds: f64,
    pub heartbeat_multiplier: f64,
}

impl TapEvent {
    pub fn new(time_seconds: f64, heartbeat_slider: f64) -> Self {
        Self {
            time_seconds,
            heartbeat_multiplier: heartbeat_multiplier(heartbeat_slider),
        }
    }
}

/// Result of a scored tap.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TapOutcome {
    pub accuracy: f64,
    pub score_gained: u32,
    pub total_score: u64,
}

/// Scores taps against the most recent beat and keeps the running totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RhythmScorer {
    accuracy_score: f64,
    total_score: u64,
    score_gained: Option<u32>,
}

impl Default for RhythmScorer {
    fn default() -> Self {
        Self::new(10.0)
    }
}

impl RhythmScorer {
    pub fn new(initial_accuracy_score: f64) -> Self {
        let accuracy_score = if initial_accuracy_score.is_finite() {
            initial_accuracy_score.max(0.0)
        } else {
            0.0
        };
        Self {
            accuracy_score,
            total_score: 0,
            score_gained: None,
        }
    }

    /// Scores `tap` against the beat at `last_beat_time`. Taps before the
    /// first beat are ignored and return `None`.
    pub fn record_tap(
        &mut self,
        tap: &TapEvent,
        beat_count: u64,
        last_beat_time: f64,
        bpm: f64,
    ) -> Option<TapOutcome> {
        if beat_count == 0 {
            tracing::debug!(time = tap.time_seconds, "tap before first beat ignored");
            return None;
        }

        let elapsed = (tap.time_seconds - last_beat_time).abs();
        let accuracy = tap_accuracy(elapsed, bpm);

        // Drains by the tap's accuracy, not by a miss penalty.
        self.accuracy_score = (self.accuracy_score - accuracy).max(0.0);

        let multiplier = if tap.heartbeat_multiplier.is_finite() {
            tap.heartbeat_multiplier.max(0.0)
        } else {
            0.0
        };
        let score_gained = (accuracy * POINTS_PER_TAP * multiplier).floor() as u32;
        self.total_score = self.total_score.saturating_add(u64::from(score_gained));
        self.score_gained = Some(score_gained);

        tracing::debug!(elapsed, accuracy, score_gained, total = self.total_score, "tap scored");

        Some(TapOutcome {
            accuracy,
            score_gained,
            total_score: self.total_score,
        })
    }

    pub fn accuracy_score(&self) -> f64 {
        self.accuracy_score
    }

    pub fn total_score(&self) -> u64 {
        self.total_score
    }

    /// Points from the most recent scored tap, if any.
    pub fn score_gained(&self) -> Option<u32> {
        self.score_gained
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn on_beat_tap_scores_full_points() {
        let mut scorer = RhythmScorer::default();
        let tap = TapEvent::new(1.5, 100.0);

        let outcome = scorer.record_tap(&tap, 2, 1.5, 80.0).unwrap();
        assert_eq!(outcome.accuracy, 1.0);
        assert_eq!(outcome.score_gained, 10);
        assert_eq!(outcome.total_score, 10);
        assert_eq!(scorer.accuracy_score(), 9.0);
    }

    #[test]
    fn taps_before_first_beat_are_ignored() {
        let mut scorer = RhythmScorer::default();
        let tap = TapEvent::new(0.2, 200.0);

        assert!(scorer.record_tap(&tap, 0, 0.0, 80.0).is_none());
        assert_eq!(scorer.total_score(), 0);
        assert_eq!(scorer.accuracy_score(), 10.0);
        assert_eq!(scorer.score_gained(), None);
    }

    #[test]
    fn a_full_period_away_scores_nothing() {
        let mut scorer = RhythmScorer::default();
        for elapsed in [0.75, 1.0, 30.0] {
            let tap = TapEvent::new(elapsed, 200.0);
            let outcome = scorer.record_tap(&tap, 1, 0.0, 80.0).unwrap();
            assert_eq!(outcome.accuracy, 0.0);
            assert_eq!(outcome.score_gained, 0);
        }
        assert_eq!(scorer.accuracy_score(), 10.0);
    }

    #[test]
    fn accuracy_interpolates_linearly() {
        assert_eq!(tap_accuracy(0.375, 80.0), 0.5);
        assert_eq!(tap_accuracy(-0.25, 60.0), 0.75);

        let mut scorer = RhythmScorer::default();
        let tap = TapEvent::new(1.125, 50.0);
        let outcome = scorer.record_tap(&tap, 1, 0.75, 80.0).unwrap();
        assert_eq!(outcome.accuracy, 0.5);
        // floor(0.5 * 10 * 0.5)
        assert_eq!(outcome.score_gained, 2);
    }

    #[test]
    fn degenerate_inputs_resolve_to_zero() {
        assert_eq!(tap_accuracy(0.0, 0.0), 0.0);
        assert_eq!(tap_accuracy(0.0, -80.0), 0.0);
        assert_eq!(tap_accuracy(f64::NAN, 80.0), 0.0);

        let mut scorer = RhythmScorer::default();
        let tap = TapEvent {
            time_seconds: 1.0,
            heartbeat_multiplier: -4.0,
        };
        let outcome = scorer.record_tap(&tap, 1, 1.0, 80.0).unwrap();
        assert_eq!(outcome.score_gained, 0);
    }

    #[test]
    fn accuracy_score_never_goes_negative() {
        let mut scorer = RhythmScorer::new(2.5);
        for _ in 0..5 {
            scorer.record_tap(&TapEvent::new(3.0, 100.0), 1, 3.0, 60.0);
        }
        assert_eq!(scorer.accuracy_score(), 0.0);
        assert_eq!(RhythmScorer::new(-1.0).accuracy_score(), 0.0);
    }

    #[test]
    fn total_score_is_monotonic() {
        let mut scorer = RhythmScorer::default();
        let mut previous = 0;
        for step in 0..40 {
            let time = step as f64 * 0.13;
            let slider = 50.0 + (step * 7 % 150) as f64;
            let outcome = scorer
                .record_tap(&TapEvent::new(time, slider), 1, 0.0, 95.0)
                .unwrap();
            assert!(outcome.total_score >= previous);
            previous = outcome.total_score;
        }
    }

    #[test]
    fn multiplier_is_clamped_to_slider_range() {
        assert_eq!(heartbeat_multiplier(100.0), 1.0);
        assert_eq!(heartbeat_multiplier(10.0), 0.5);
        assert_eq!(heartbeat_multiplier(1_000.0), 2.0);
        assert_eq!(heartbeat_multiplier(f64::INFINITY), 0.5);
    }
}
