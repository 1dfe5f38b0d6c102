mod cue;

use std::{
    io::{BufRead, Write},
    path::PathBuf,
    str::FromStr,
    sync::mpsc::{self, RecvTimeoutError},
    thread,
    time::{Duration, Instant},
};

use clap::{Parser, Subcommand, ValueEnum};
use heartbeat_trainer_core::{
    AppConfig, AudioCue, CadenceChange, Controller, GameMode, Presenter, ScreenView,
    SessionSnapshot, SilentCue, TapOutcome, UiEvent,
};
use tracing_subscriber::EnvFilter;

fn main() -> heartbeat_trainer_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = AppConfig::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Commands::Simulate(args) => run_simulate(config, args),
        Commands::Play { mode, bell, tick_ms } => run_play(config, mode.into(), bell, tick_ms),
    }
}

fn run_simulate(config: AppConfig, args: SimulateArgs) -> heartbeat_trainer_core::Result<()> {
    tracing::info!(
        mode = ?args.mode,
        target = args.target,
        duration = args.duration,
        "simulating session"
    );

    // Simulated time runs far ahead of the wall clock, so beats stay silent.
    let mut controller = Controller::new(
        config,
        args.mode.into(),
        Box::new(SilentCue),
        LogPresenter,
    );
    controller.handle(UiEvent::TargetSliderChanged { value: args.target })?;
    controller.handle(UiEvent::Go)?;

    let mut script = Vec::new();
    script.extend(args.taps.iter().map(|&at| (at, UiEvent::TapPressed)));
    script.extend(
        args.heartbeat
            .iter()
            .map(|input| (input.at, UiEvent::HeartbeatChanged { value: input.value })),
    );
    script.extend(
        args.live
            .iter()
            .map(|input| (input.at, UiEvent::LiveBpmChanged { value: input.value })),
    );
    if let Some(at) = args.back_at {
        script.push((at, UiEvent::Back));
    }
    script.retain(|(at, _)| at.is_finite() && *at >= 0.0 && *at <= args.duration);
    script.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut last = controller.view();
    for (at, event) in script {
        controller.advance_to(at);
        if let ScreenView::Game(snapshot) = controller.view() {
            last = ScreenView::Game(snapshot);
        }
        if event == UiEvent::Back {
            let snapshot = controller.back()?;
            last = ScreenView::Game(snapshot);
            continue;
        }
        controller.handle(event)?;
    }
    controller.advance_to(args.duration);
    if let ScreenView::Game(snapshot) = controller.view() {
        last = ScreenView::Game(snapshot);
    }

    if let ScreenView::Game(snapshot) = &last {
        tracing::info!(
            beats = snapshot.beat_count,
            total_score = snapshot.total_score,
            accuracy_score = snapshot.accuracy_score,
            beats_per_minute = snapshot.beats_per_minute,
            "simulation finished"
        );
        if args.json {
            println!("{}", serde_json::to_string_pretty(snapshot)?);
        }
    }
    Ok(())
}

fn run_play(
    config: AppConfig,
    mode: GameMode,
    bell: bool,
    tick_ms: u64,
) -> heartbeat_trainer_core::Result<()> {
    let cue: Box<dyn AudioCue> = if bell {
        Box::new(BellCue)
    } else {
        cue::load_cue(config.audio.cue_path.as_deref(), config.audio.volume)
    };
    let mut controller = Controller::new(config, mode, cue, LogPresenter);
    eprintln!("commands: g [BPM] go | t tap | h N heartbeat | l N live bpm | m rhythm|bio | b back | q quit");

    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            match line.parse::<Command>() {
                Ok(command) => {
                    if sender.send(command).is_err() {
                        break;
                    }
                }
                Err(err) => eprintln!("{err}"),
            }
        }
        let _ = sender.send(Command::Quit);
    });

    let tick = Duration::from_millis(tick_ms.max(1));
    let started = Instant::now();
    loop {
        let command = match receiver.recv_timeout(tick) {
            Ok(command) => Some(command),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(Command::Quit),
        };
        controller.advance_to(started.elapsed().as_secs_f64());

        let Some(command) = command else { continue };
        let event = match command {
            Command::Quit => break,
            Command::Go(Some(target)) => {
                controller.handle(UiEvent::TargetSliderChanged { value: target })?;
                UiEvent::Go
            }
            Command::Go(None) => UiEvent::Go,
            Command::Event(event) => event,
        };
        if let Err(err) = controller.handle(event) {
            tracing::error!(%err, "input rejected");
        }
    }

    if controller.is_active() {
        controller.back()?;
    }
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

/// Logs every label the screens would show.
struct LogPresenter;

impl LogPresenter {
    fn show(view: &ScreenView) {
        for label in view.labels() {
            if !label.text.is_empty() {
                let text = label.text.replace('\n', " | ");
                tracing::info!(target: "screen", label = ?label.target, "{text}");
            }
        }
    }
}

impl Presenter for LogPresenter {
    fn screen_changed(&mut self, view: &ScreenView) {
        Self::show(view);
    }

    fn tap(&mut self, _outcome: &TapOutcome, snapshot: &SessionSnapshot) {
        Self::show(&ScreenView::Game(snapshot.clone()));
    }

    fn cadence(&mut self, _change: &CadenceChange, snapshot: &SessionSnapshot) {
        Self::show(&ScreenView::Game(snapshot.clone()));
    }

    fn inputs_changed(&mut self, snapshot: &SessionSnapshot) {
        Self::show(&ScreenView::Game(snapshot.clone()));
    }
}

/// Rings the terminal bell on every beat.
#[derive(Debug)]
struct BellCue;

impl AudioCue for BellCue {
    fn play_cue(&mut self) {
        let mut stdout = std::io::stdout();
        let _ = stdout.write_all(b"\x07").and_then(|_| stdout.flush());
    }
}

/// A line typed during `play`.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Command {
    Go(Option<f64>),
    Event(UiEvent),
    Quit,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut parts = line.split_whitespace();
        let verb = parts.next().unwrap_or_default();
        let value = parts
            .next()
            .map(|raw| raw.parse::<f64>().map_err(|err| format!("`{raw}`: {err}")))
            .transpose();

        let need_value =
            |value: Option<f64>| value.ok_or_else(|| format!("`{verb}` needs a number"));
        let command = match verb {
            "q" | "quit" => Command::Quit,
            "g" | "go" => Command::Go(value?),
            "t" | "tap" | "" => Command::Event(UiEvent::TapPressed),
            "b" | "back" => Command::Event(UiEvent::Back),
            "h" | "heartbeat" => Command::Event(UiEvent::HeartbeatChanged {
                value: need_value(value?)?,
            }),
            "l" | "live" => Command::Event(UiEvent::LiveBpmChanged {
                value: need_value(value?)?,
            }),
            "m" | "mode" => {
                let mode = match line.split_whitespace().nth(1) {
                    Some("rhythm") => GameMode::Rhythm,
                    Some("bio") | Some("biofeedback") => GameMode::Biofeedback,
                    _ => return Err("`mode` expects `rhythm` or `bio`".to_string()),
                };
                Command::Event(UiEvent::ModeSelected { mode })
            }
            other => return Err(format!("unknown command `{other}`")),
        };
        Ok(command)
    }
}

/// Slider value applied at a point of simulated time, written `VALUE@SECONDS`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct TimedValue {
    value: f64,
    at: f64,
}

impl FromStr for TimedValue {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let (value, at) = raw
            .split_once('@')
            .ok_or_else(|| format!("expected VALUE@SECONDS, got `{raw}`"))?;
        Ok(Self {
            value: value.trim().parse().map_err(|err| format!("`{value}`: {err}"))?,
            at: at.trim().parse().map_err(|err| format!("`{at}`: {err}"))?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    /// Tap along with the beat for points.
    Rhythm,
    /// Steer the beep cadence with the live heart rate slider.
    Biofeedback,
}

impl From<ModeArg> for GameMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Rhythm => GameMode::Rhythm,
            ModeArg::Biofeedback => GameMode::Biofeedback,
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Rhythm and heartbeat training game", long_about = None)]
struct Cli {
    /// JSON configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a scripted session on the simulated clock.
    Simulate(SimulateArgs),
    /// Play in real time, reading commands from stdin.
    Play {
        #[arg(short, long, value_enum, default_value_t = ModeArg::Rhythm)]
        mode: ModeArg,
        /// Ring the terminal bell instead of the configured cue asset.
        #[arg(long)]
        bell: bool,
        /// Tick granularity in milliseconds.
        #[arg(long, default_value_t = 5)]
        tick_ms: u64,
    },
}

#[derive(clap::Args, Debug)]
struct SimulateArgs {
    #[arg(short, long, value_enum, default_value_t = ModeArg::Rhythm)]
    mode: ModeArg,
    /// Target BPM chosen on the config screen.
    #[arg(short, long, default_value_t = 80.0)]
    target: f64,
    /// Simulated seconds to run.
    #[arg(short, long, default_value_t = 30.0)]
    duration: f64,
    /// Tap the rhythm button at SECONDS.
    #[arg(long = "tap", value_name = "SECONDS")]
    taps: Vec<f64>,
    /// Move the heartbeat slider, as VALUE@SECONDS.
    #[arg(long, value_name = "VALUE@SECONDS")]
    heartbeat: Vec<TimedValue>,
    /// Move the live BPM slider, as VALUE@SECONDS.
    #[arg(long, value_name = "VALUE@SECONDS")]
    live: Vec<TimedValue>,
    /// Leave the game screen at SECONDS.
    #[arg(long, value_name = "SECONDS")]
    back_at: Option<f64>,
    /// Print the final snapshot as JSON.
    #[arg(long)]
    json: bool,
}
