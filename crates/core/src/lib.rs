//! Core library for the Heartbeat Trainer application.
//!
//! The crate holds the timing and scoring engine behind the two game screens.
//! A single-threaded [`Scheduler`] acts as the tick source; the
//! [`BeatScheduler`] produces beats on it, the [`RhythmScorer`] grades taps
//! against the latest beat and the [`CadenceRegulator`] retunes the beat from
//! the live/target heart rate gap. Everything the UI needs to render is
//! exposed through [`SessionSnapshot`] and the [`Presenter`] callbacks.

pub mod audio;
pub mod beat;
pub mod cadence;
pub mod config;
pub mod error;
pub mod navigation;
pub mod presentation;
pub mod scoring;
pub mod session;
pub mod timeline;

pub use audio::{AudioCue, SilentCue};
pub use beat::{beat_interval, BeatEvent, BeatScheduler};
pub use cadence::{next_cadence, CadenceBounds, CadenceChange, CadenceRegulator};
pub use config::{AppConfig, AudioConfig, InputConfig, SessionConfig, SliderRange};
pub use error::{Result, TrainerError};
pub use navigation::{ConfigScreen, Controller, Screen, UiEvent};
pub use presentation::{
    LabelTarget, LabelUpdate, NullPresenter, Presenter, ScreenView, SessionSnapshot,
};
pub use scoring::{heartbeat_multiplier, tap_accuracy, RhythmScorer, TapEvent, TapOutcome};
pub use session::{GameMode, Session, SessionEvent};
pub use timeline::{PlaybackClock, ScheduledEvent, Scheduler, TimerHandle, TimerKind};
