use serde::{Deserialize, Serialize};

use crate::{
    AppConfig, AudioCue, GameMode, Presenter, Result, Scheduler, ScreenView, Session,
    SessionEvent, SessionSnapshot, SliderRange, TapOutcome, TrainerError,
};

/// Typed input from either screen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum UiEvent {
    TargetSliderChanged { value: f64 },
    ModeSelected { mode: GameMode },
    Go,
    TapPressed,
    HeartbeatChanged { value: f64 },
    LiveBpmChanged { value: f64 },
    Back,
}

/// Model of the target selection screen.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigScreen {
    selected_bpm: f64,
    range: SliderRange,
    mode: GameMode,
}

impl ConfigScreen {
    pub fn new(config: &AppConfig, mode: GameMode) -> Self {
        let range = config.input.target_bpm;
        Self {
            selected_bpm: range.snap(config.input.default_target_bpm),
            range,
            mode,
        }
    }

    /// Moves the slider, returning the snapped value.
    pub fn set_selected(&mut self, value: f64) -> f64 {
        self.selected_bpm = self.range.snap(value);
        self.selected_bpm
    }

    pub fn selected_bpm(&self) -> f64 {
        self.selected_bpm
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }
}

/// The screen currently shown.
#[derive(Debug)]
pub enum Screen {
    Config(ConfigScreen),
    Game(Session),
}

/// Owns the tick source and swaps between the two screens.
///
/// Idle is the config screen; Active is a running [`Session`]. Leaving a
/// session cancels its timers before the session is dropped and bumps the
/// generation so any event still carrying the old one is void.
pub struct Controller<P: Presenter> {
    config: AppConfig,
    scheduler: Scheduler,
    screen: Screen,
    generation: u64,
    cue: Box<dyn AudioCue>,
    presenter: P,
}

impl<P: Presenter> Controller<P> {
    pub fn new(
        config: AppConfig,
        mode: GameMode,
        cue: Box<dyn AudioCue>,
        mut presenter: P,
    ) -> Self {
        let screen = ConfigScreen::new(&config, mode);
        presenter.screen_changed(&ScreenView::Config {
            selected_bpm: screen.selected_bpm(),
        });

        Self {
            config,
            scheduler: Scheduler::new(),
            screen: Screen::Config(screen),
            generation: 0,
            cue,
            presenter,
        }
    }

    /// Applies a UI event. Events that do not belong to the current screen
    /// are ignored; only starting a session can fail.
    pub fn handle(&mut self, event: UiEvent) -> Result<Option<TapOutcome>> {
        let go_target = match (&self.screen, event) {
            (Screen::Config(screen), UiEvent::Go) => Some(screen.selected_bpm()),
            _ => None,
        };
        if let Some(target) = go_target {
            self.confirm(target)?;
            return Ok(None);
        }
        if event == UiEvent::Back && self.is_active() {
            self.back()?;
            return Ok(None);
        }

        let session_event = match (&mut self.screen, event) {
            (Screen::Config(screen), UiEvent::TargetSliderChanged { value }) => {
                let selected_bpm = screen.set_selected(value);
                self.presenter
                    .screen_changed(&ScreenView::Config { selected_bpm });
                return Ok(None);
            }
            (Screen::Config(screen), UiEvent::ModeSelected { mode }) => {
                screen.mode = mode;
                return Ok(None);
            }
            (Screen::Game(_), UiEvent::TapPressed) => SessionEvent::TapPressed,
            (Screen::Game(_), UiEvent::HeartbeatChanged { value }) => {
                SessionEvent::HeartbeatChanged { value }
            }
            (Screen::Game(_), UiEvent::LiveBpmChanged { value }) => {
                SessionEvent::LiveBpmChanged { value }
            }
            (_, event) => {
                tracing::debug!(?event, "event does not apply to the current screen");
                return Ok(None);
            }
        };

        let Screen::Game(session) = &mut self.screen else {
            return Ok(None);
        };
        Ok(session.handle(&self.scheduler, session_event, &mut self.presenter))
    }

    /// Idle → Active: starts a session at `target_bpm` in the selected mode.
    pub fn confirm(&mut self, target_bpm: f64) -> Result<()> {
        let mode = match &self.screen {
            Screen::Config(screen) => screen.mode(),
            Screen::Game(_) => return Err(TrainerError::SessionAlreadyActive),
        };

        let generation = self.generation + 1;
        let session = Session::start(
            &mut self.scheduler,
            mode,
            target_bpm,
            generation,
            &self.config.session,
            self.config.input.heartbeat,
            self.config.input.live_bpm,
        )?;
        self.generation = generation;
        self.presenter
            .screen_changed(&ScreenView::Game(session.snapshot()));
        self.screen = Screen::Game(session);
        Ok(())
    }

    /// Active → Idle: cancels the session's timers and returns to a fresh
    /// config screen.
    pub fn back(&mut self) -> Result<SessionSnapshot> {
        let mode = match &self.screen {
            Screen::Game(session) => session.mode(),
            Screen::Config(_) => return Err(TrainerError::NoActiveSession),
        };

        let config_screen = ConfigScreen::new(&self.config, mode);
        let view = ScreenView::Config {
            selected_bpm: config_screen.selected_bpm(),
        };
        let previous = std::mem::replace(&mut self.screen, Screen::Config(config_screen));
        let Screen::Game(session) = previous else {
            return Err(TrainerError::NoActiveSession);
        };

        let snapshot = session.stop(&mut self.scheduler);
        self.generation += 1;
        self.presenter.screen_changed(&view);
        Ok(snapshot)
    }

    /// Runs the tick source forward by `delta` seconds, dispatching every
    /// timer that comes due in order.
    pub fn advance(&mut self, delta: f64) {
        if !delta.is_finite() || delta <= 0.0 {
            return;
        }
        let until = self.scheduler.now() + delta;
        self.advance_to(until);
    }

    /// Runs the tick source up to the absolute time `until`.
    pub fn advance_to(&mut self, until: f64) {
        while let Some(event) = self.scheduler.pop_due(until) {
            match &mut self.screen {
                Screen::Game(session) => session.dispatch(
                    &mut self.scheduler,
                    &event,
                    self.cue.as_mut(),
                    &mut self.presenter,
                ),
                Screen::Config(_) => {
                    tracing::trace!(?event, "timer fired without an active session");
                }
            }
        }
        self.scheduler.settle(until);
    }

    pub fn now(&self) -> f64 {
        self.scheduler.now()
    }

    pub fn view(&self) -> ScreenView {
        match &self.screen {
            Screen::Config(screen) => ScreenView::Config {
                selected_bpm: screen.selected_bpm(),
            },
            Screen::Game(session) => ScreenView::Game(session.snapshot()),
        }
    }

    pub fn session(&self) -> Option<&Session> {
        match &self.screen {
            Screen::Game(session) => Some(session),
            Screen::Config(_) => None,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.screen, Screen::Game(_))
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }
}
