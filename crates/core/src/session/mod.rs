use serde::{Deserialize, Serialize};

use crate::{
    AudioCue, BeatScheduler, CadenceRegulator, Presenter, Result, RhythmScorer, ScheduledEvent,
    Scheduler, SessionConfig, SessionSnapshot, SliderRange, TapEvent, TapOutcome, TimerHandle,
    TimerKind, TrainerError,
};

/// Which game screen a session runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameMode {
    /// Beat at the target rate; taps are scored against it.
    #[default]
    Rhythm,
    /// Beat at a cadence regulated from the live/target divergence.
    Biofeedback,
}

/// Typed input from the game screen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SessionEvent {
    TapPressed,
    HeartbeatChanged { value: f64 },
    LiveBpmChanged { value: f64 },
}

/// State of the active game screen.
///
/// A session never owns the tick source; every operation that touches timers
/// borrows the [`Scheduler`]. Events registered under another generation are
/// dropped, so timers outliving a session can never reach a newer one.
#[derive(Debug)]
pub struct Session {
    mode: GameMode,
    generation: u64,
    target_bpm: f64,
    heartbeat: f64,
    heartbeat_range: SliderRange,
    live_range: SliderRange,
    beat: BeatScheduler,
    scorer: RhythmScorer,
    regulator: Option<CadenceRegulator>,
    regulator_timer: Option<TimerHandle>,
    now: f64,
}

impl Session {
    /// Starts a session at `target_bpm`, scheduling the beat and, for the
    /// biofeedback screen, the cadence regulator.
    pub fn start(
        scheduler: &mut Scheduler,
        mode: GameMode,
        target_bpm: f64,
        generation: u64,
        config: &SessionConfig,
        heartbeat_range: SliderRange,
        live_range: SliderRange,
    ) -> Result<Self> {
        let target_bpm = TrainerError::check_bpm("session target", target_bpm)?;

        let regulator = match mode {
            GameMode::Rhythm => None,
            GameMode::Biofeedback => Some(CadenceRegulator::new(target_bpm, config)),
        };
        let beat_bpm = regulator
            .as_ref()
            .map(CadenceRegulator::beats_per_minute)
            .unwrap_or(target_bpm);

        let mut beat = BeatScheduler::new();
        beat.start(scheduler, beat_bpm, generation)?;

        let regulator_timer = match regulator {
            Some(_) => match scheduler.schedule_interval(
                TimerKind::Cadence,
                config.regulator_interval_seconds,
                generation,
            ) {
                Ok(handle) => Some(handle),
                Err(err) => {
                    beat.stop(scheduler);
                    return Err(err);
                }
            },
            None => None,
        };

        tracing::info!(?mode, target_bpm, beat_bpm, generation, "session started");

        Ok(Self {
            mode,
            generation,
            target_bpm,
            heartbeat: heartbeat_range.snap(config.initial_heartbeat),
            heartbeat_range,
            live_range,
            beat,
            scorer: RhythmScorer::new(config.initial_accuracy_score),
            regulator,
            regulator_timer,
            now: scheduler.now(),
        })
    }

    /// Routes a timer event to the beat or the regulator.
    pub fn dispatch(
        &mut self,
        scheduler: &mut Scheduler,
        event: &ScheduledEvent,
        cue: &mut dyn AudioCue,
        presenter: &mut dyn Presenter,
    ) {
        if event.generation != self.generation {
            tracing::trace!(
                stale = event.generation,
                current = self.generation,
                "dropping stale timer event"
            );
            return;
        }
        self.now = event.time_seconds;

        match event.handle.kind() {
            TimerKind::Beat => {
                if let Some(beat) = self.beat.on_beat(event, cue) {
                    presenter.beat(&beat, &self.snapshot());
                }
            }
            TimerKind::Cadence => {
                if self.regulator_timer != Some(event.handle) {
                    return;
                }
                let Some(regulator) = self.regulator.as_mut() else {
                    return;
                };
                let change = regulator.recompute();
                if let Err(err) = self
                    .beat
                    .reschedule(scheduler, change.current, self.generation)
                {
                    tracing::error!(%err, "failed to reschedule beat after cadence change");
                }
                presenter.cadence(&change, &self.snapshot());
            }
        }
    }

    /// Applies UI input at the scheduler's current time.
    pub fn handle(
        &mut self,
        scheduler: &Scheduler,
        event: SessionEvent,
        presenter: &mut dyn Presenter,
    ) -> Option<TapOutcome> {
        self.now = scheduler.now();

        match event {
            SessionEvent::TapPressed => {
                let outcome = self.tap(self.now)?;
                presenter.tap(&outcome, &self.snapshot());
                Some(outcome)
            }
            SessionEvent::HeartbeatChanged { value } => {
                self.heartbeat = self.heartbeat_range.snap(value);
                presenter.inputs_changed(&self.snapshot());
                None
            }
            SessionEvent::LiveBpmChanged { value } => {
                let value = self.live_range.snap(value);
                if let Some(regulator) = self.regulator.as_mut() {
                    regulator.set_live_bpm(value);
                }
                presenter.inputs_changed(&self.snapshot());
                None
            }
        }
    }

    /// Scores a tap at `time_seconds` against the latest beat.
    pub fn tap(&mut self, time_seconds: f64) -> Option<TapOutcome> {
        let bpm = self.beats_per_minute();
        let tap = TapEvent::new(time_seconds, self.heartbeat);
        self.scorer.record_tap(
            &tap,
            self.beat.beat_count(),
            self.beat.last_beat_time(),
            bpm,
        )
    }

    /// Cancels both timers and returns the final state.
    pub fn stop(mut self, scheduler: &mut Scheduler) -> SessionSnapshot {
        self.beat.stop(scheduler);
        if let Some(timer) = self.regulator_timer.take() {
            scheduler.cancel(timer);
        }
        self.now = scheduler.now();

        let snapshot = self.snapshot();
        tracing::info!(
            generation = self.generation,
            beats = snapshot.beat_count,
            total_score = snapshot.total_score,
            "session stopped"
        );
        snapshot
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            mode: self.mode,
            time_seconds: self.now,
            target_bpm: self.target_bpm,
            live_bpm: self.regulator.as_ref().map(CadenceRegulator::live_bpm),
            beats_per_minute: self.beats_per_minute(),
            heartbeat: self.heartbeat,
            beat_count: self.beat.beat_count(),
            last_beat_time: self.beat.last_beat_time(),
            total_score: self.scorer.total_score(),
            score_gained: self.scorer.score_gained(),
            accuracy_score: self.scorer.accuracy_score(),
        }
    }

    /// Rate the beat currently runs at.
    pub fn beats_per_minute(&self) -> f64 {
        self.beat.bpm().unwrap_or(self.target_bpm)
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn beat(&self) -> &BeatScheduler {
        &self.beat
    }

    pub fn regulator(&self) -> Option<&CadenceRegulator> {
        self.regulator.as_ref()
    }
}
