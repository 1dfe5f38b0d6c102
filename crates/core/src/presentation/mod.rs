use serde::{Deserialize, Serialize};

use crate::{BeatEvent, CadenceChange, GameMode, TapOutcome};

/// Read-only view of a running session for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub mode: GameMode,
    pub time_seconds: f64,
    pub target_bpm: f64,
    /// Simulated heart rate; only tracked by the biofeedback screen.
    pub live_bpm: Option<f64>,
    /// Rate the beat is currently played at.
    pub beats_per_minute: f64,
    pub heartbeat: f64,
    pub beat_count: u64,
    pub last_beat_time: f64,
    pub total_score: u64,
    pub score_gained: Option<u32>,
    pub accuracy_score: f64,
}

/// What the UI layer should currently show.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScreenView {
    Config { selected_bpm: f64 },
    Game(SessionSnapshot),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LabelTarget {
    SelectedValue,
    Rates,
    TotalScore,
    ScoreGained,
    Heartbeat,
}

/// Text routed to one label of the current screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelUpdate {
    pub target: LabelTarget,
    pub text: String,
}

impl LabelUpdate {
    fn new(target: LabelTarget, text: impl Into<String>) -> Self {
        Self {
            target,
            text: text.into(),
        }
    }
}

impl ScreenView {
    /// Label texts for the screen, in layout order.
    pub fn labels(&self) -> Vec<LabelUpdate> {
        match self {
            ScreenView::Config { selected_bpm } => vec![LabelUpdate::new(
                LabelTarget::SelectedValue,
                format!("Selected Value: {selected_bpm}"),
            )],
            ScreenView::Game(snapshot) => snapshot.labels(),
        }
    }
}

impl SessionSnapshot {
    pub fn labels(&self) -> Vec<LabelUpdate> {
        match self.mode {
            GameMode::Biofeedback => vec![LabelUpdate::new(
                LabelTarget::Rates,
                format!(
                    "Current BPM: {}\nBeeps per Minute: {}",
                    self.live_bpm.unwrap_or(self.target_bpm),
                    self.beats_per_minute
                ),
            )],
            GameMode::Rhythm => vec![
                LabelUpdate::new(
                    LabelTarget::TotalScore,
                    format!("Total Score: {}", self.total_score),
                ),
                LabelUpdate::new(
                    LabelTarget::ScoreGained,
                    self.score_gained
                        .map(|gained| format!("Score Gained: {gained}"))
                        .unwrap_or_default(),
                ),
                LabelUpdate::new(
                    LabelTarget::Heartbeat,
                    format!("Heartbeat: {}", self.heartbeat.trunc()),
                ),
            ],
        }
    }
}

/// Receives everything the engine reports while a session runs.
///
/// All methods default to doing nothing so a front end only implements what
/// it displays.
pub trait Presenter {
    fn screen_changed(&mut self, _view: &ScreenView) {}

    fn beat(&mut self, _beat: &BeatEvent, _snapshot: &SessionSnapshot) {}

    fn tap(&mut self, _outcome: &TapOutcome, _snapshot: &SessionSnapshot) {}

    fn cadence(&mut self, _change: &CadenceChange, _snapshot: &SessionSnapshot) {}

    fn inputs_changed(&mut self, _snapshot: &SessionSnapshot) {}
}

/// Presenter that discards every report.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPresenter;

impl Presenter for NullPresenter {}
