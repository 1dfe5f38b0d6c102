use serde::{Deserialize, Serialize};

use crate::{AudioCue, Result, ScheduledEvent, Scheduler, TimerHandle, TimerKind, TrainerError};

/// Seconds between beats at `bpm`. Rejects rates that cannot drive a timer.
pub fn beat_interval(bpm: f64) -> Result<f64> {
    let bpm = TrainerError::check_bpm("beat scheduler", bpm)?;
    Ok(60.0 / bpm)
}

/// A single beat pulse.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeatEvent {
    pub sequence_number: u64,
    pub time_seconds: f64,
}

/// Produces a steady beat on a [`Scheduler`] and remembers the latest one.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct BeatScheduler {
    bpm: Option<f64>,
    timer: Option<TimerHandle>,
    beat_count: u64,
    last_beat_time: f64,
}

impl BeatScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts beating at `bpm`. The first beat lands one interval from now.
    /// A running beat is replaced.
    pub fn start(&mut self, scheduler: &mut Scheduler, bpm: f64, generation: u64) -> Result<()> {
        self.reschedule(scheduler, bpm, generation)
    }

    /// Replaces the running beat with one at `bpm`, resetting the phase so the
    /// next beat fires one new interval after this call. On error the current
    /// beat is left untouched.
    pub fn reschedule(
        &mut self,
        scheduler: &mut Scheduler,
        bpm: f64,
        generation: u64,
    ) -> Result<()> {
        let interval = beat_interval(bpm)?;

        if let Some(timer) = self.timer.take() {
            scheduler.cancel(timer);
        }
        self.timer = Some(scheduler.schedule_interval(TimerKind::Beat, interval, generation)?);
        self.bpm = Some(bpm);
        tracing::debug!(bpm, interval, "beat scheduled");
        Ok(())
    }

    pub fn stop(&mut self, scheduler: &mut Scheduler) {
        if let Some(timer) = self.timer.take() {
            scheduler.cancel(timer);
            tracing::debug!(beats = self.beat_count, "beat stopped");
        }
    }

    /// Handles a timer event, sounding `cue` on a beat. Events from any timer
    /// other than the current beat timer are ignored.
    pub fn on_beat(
        &mut self,
        event: &ScheduledEvent,
        cue: &mut dyn AudioCue,
    ) -> Option<BeatEvent> {
        if self.timer != Some(event.handle) {
            return None;
        }

        self.beat_count += 1;
        self.last_beat_time = event.time_seconds;
        tracing::debug!(time = event.time_seconds, "Beat {}", self.beat_count);
        cue.play_cue();

        Some(BeatEvent {
            sequence_number: self.beat_count,
            time_seconds: event.time_seconds,
        })
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_some()
    }

    /// Rate of the running (or last running) beat.
    pub fn bpm(&self) -> Option<f64> {
        self.bpm
    }

    pub fn timer(&self) -> Option<TimerHandle> {
        self.timer
    }

    pub fn beat_count(&self) -> u64 {
        self.beat_count
    }

    pub fn last_beat_time(&self) -> f64 {
        self.last_beat_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SilentCue;

    #[derive(Debug, Default)]
    struct CountingCue(u32);

    impl AudioCue for CountingCue {
        fn play_cue(&mut self) {
            self.0 += 1;
        }
    }

    fn run(beat: &mut BeatScheduler, scheduler: &mut Scheduler, until: f64) -> Vec<BeatEvent> {
        run_with(beat, scheduler, until, &mut SilentCue)
    }

    fn run_with(
        beat: &mut BeatScheduler,
        scheduler: &mut Scheduler,
        until: f64,
        cue: &mut dyn AudioCue,
    ) -> Vec<BeatEvent> {
        let mut beats = Vec::new();
        while let Some(event) = scheduler.pop_due(until) {
            beats.extend(beat.on_beat(&event, cue));
        }
        scheduler.settle(until);
        beats
    }

    #[test]
    fn first_beat_after_one_interval() {
        let mut scheduler = Scheduler::new();
        let mut beat = BeatScheduler::new();
        beat.start(&mut scheduler, 80.0, 0).unwrap();

        assert!(run(&mut beat, &mut scheduler, 0.74).is_empty());
        let beats = run(&mut beat, &mut scheduler, 3.0);
        let times: Vec<f64> = beats.iter().map(|b| b.time_seconds).collect();
        assert_eq!(times, vec![0.75, 1.5, 2.25, 3.0]);
        assert_eq!(beat.beat_count(), 4);
        assert_eq!(beat.last_beat_time(), 3.0);
        assert_eq!(beats.last().unwrap().sequence_number, 4);
    }

    #[test]
    fn rejects_non_positive_bpm_without_scheduling() {
        let mut scheduler = Scheduler::new();
        let mut beat = BeatScheduler::new();

        for bpm in [0.0, -60.0, f64::NAN] {
            let err = beat.start(&mut scheduler, bpm, 0).unwrap_err();
            assert!(matches!(err, TrainerError::InvalidBpm { .. }));
        }
        assert!(!beat.is_running());
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn failed_reschedule_keeps_current_beat() {
        let mut scheduler = Scheduler::new();
        let mut beat = BeatScheduler::new();
        beat.start(&mut scheduler, 60.0, 0).unwrap();

        assert!(beat.reschedule(&mut scheduler, 0.0, 0).is_err());
        assert_eq!(beat.bpm(), Some(60.0));
        assert_eq!(run(&mut beat, &mut scheduler, 2.0).len(), 2);
    }

    #[test]
    fn reschedule_resets_phase_and_cancels_old_timer() {
        let mut scheduler = Scheduler::new();
        let mut beat = BeatScheduler::new();
        beat.start(&mut scheduler, 80.0, 0).unwrap();
        run(&mut beat, &mut scheduler, 1.0);
        let old = beat.timer().unwrap();

        beat.reschedule(&mut scheduler, 120.0, 0).unwrap();
        assert!(!scheduler.is_scheduled(old));

        let times: Vec<f64> = run(&mut beat, &mut scheduler, 2.5)
            .iter()
            .map(|b| b.time_seconds)
            .collect();
        // 80 BPM would have fired at 1.5, 2.25.
        assert_eq!(times, vec![1.5, 2.0, 2.5]);
        assert_eq!(beat.bpm(), Some(120.0));
    }

    #[test]
    fn stop_halts_beats() {
        let mut scheduler = Scheduler::new();
        let mut beat = BeatScheduler::new();
        beat.start(&mut scheduler, 60.0, 0).unwrap();
        run(&mut beat, &mut scheduler, 2.0);
        beat.stop(&mut scheduler);

        assert!(run(&mut beat, &mut scheduler, 10.0).is_empty());
        assert_eq!(beat.beat_count(), 2);
        assert!(!beat.is_running());
    }

    #[test]
    fn ignores_foreign_timer_events() {
        let mut scheduler = Scheduler::new();
        let mut beat = BeatScheduler::new();
        beat.start(&mut scheduler, 60.0, 0).unwrap();
        scheduler
            .schedule_interval(TimerKind::Cadence, 0.5, 0)
            .unwrap();

        run(&mut beat, &mut scheduler, 1.0);
        assert_eq!(beat.beat_count(), 1);
    }

    #[test]
    fn plays_cue_on_every_beat() {
        let mut counter = CountingCue::default();
        let mut scheduler = Scheduler::new();
        let mut beat = BeatScheduler::new();
        beat.start(&mut scheduler, 120.0, 0).unwrap();

        run_with(&mut beat, &mut scheduler, 2.0, &mut counter);
        assert_eq!(counter.0, 4);
    }
}
