//! tickline CLI: render or play a simple note sequence.
//!
//! Usage:
//!   tl-cli render --notes 60,64,67 --durations 0.5 --json
//!   tl-cli play --notes 48,55 --beats 8 --tempo 90

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use clap::{Args, Parser, Subcommand};
use tl_ir::Sequence;
use tl_master::tl_engine::{EventSpec, ScheduleOptions};
use tl_master::{params, Controller, EventKind, LogOutput, ParamValue, TimelineConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Tick-driven note scheduler", long_about = None)]
struct Cli {
    /// JSON timeline config
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run offline as fast as possible and print every event.
    Render {
        #[command(flatten)]
        sequence: SequenceArgs,
        /// Print events as JSON lines
        #[arg(long)]
        json: bool,
        /// Stop after this many beats even if tracks are still playing
        #[arg(long, default_value_t = 64.0)]
        max_beats: f64,
    },
    /// Play in real time, logging events as they happen.
    Play {
        #[command(flatten)]
        sequence: SequenceArgs,
        /// Beats to play before stopping
        #[arg(long, default_value_t = 8.0)]
        beats: f64,
    },
}

#[derive(Args, Debug)]
struct SequenceArgs {
    /// Note numbers, comma separated
    #[arg(long, value_delimiter = ',', default_values_t = [60, 64, 67, 72])]
    notes: Vec<i64>,
    /// Durations in beats, cycled over the notes
    #[arg(long, value_delimiter = ',', default_values_t = [1.0])]
    durations: Vec<f64>,
    /// Times to repeat the note list
    #[arg(long, default_value_t = 1)]
    repeats: usize,
    /// Overrides the config tempo
    #[arg(long)]
    tempo: Option<f64>,
    #[arg(long)]
    gate: Option<f64>,
}

impl SequenceArgs {
    fn spec(&self) -> EventSpec {
        let durations = Sequence::new(self.durations.iter().copied(), None);
        let mut spec = EventSpec::new()
            .with(params::NOTE, Sequence::new(self.notes.iter().copied(), Some(self.repeats)))
            .with(params::DURATION, durations);
        if let Some(gate) = self.gate {
            spec.set(params::GATE, ParamValue::from(gate));
        }
        spec
    }
}

fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Render { sequence, json, max_beats } => {
            run_render(cli.config, &sequence, json, max_beats)
        }
        Commands::Play { sequence, beats } => run_play(cli.config, &sequence, beats),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "tl-cli failed");
            ExitCode::FAILURE
        }
    }
}

fn controller(config: Option<PathBuf>, sequence: &SequenceArgs) -> tl_master::Result<Controller> {
    let mut config = match config {
        Some(path) => TimelineConfig::load(path)?,
        None => TimelineConfig::default(),
    };
    if let Some(tempo) = sequence.tempo {
        config.tempo = tempo;
    }
    Controller::new(config)
}

fn run_render(
    config: Option<PathBuf>,
    sequence: &SequenceArgs,
    json: bool,
    max_beats: f64,
) -> tl_master::Result<()> {
    let mut ctl = controller(config, sequence)?;
    let lines = Arc::new(Mutex::new(Vec::new()));
    let sink = lines.clone();
    ctl.with_timeline(move |timeline| {
        timeline.set_event_hook(move |_, event| {
            let line = if json {
                serde_json::to_string(event).unwrap_or_default()
            } else {
                match &event.kind {
                    EventKind::Note { note, amplitude, .. } => format!(
                        "{:>8.3}  note {note:>3}  amp {amplitude:>3}  dur {:.3}",
                        event.time, event.duration
                    ),
                    EventKind::Rest => format!("{:>8.3}  rest", event.time),
                    other => format!("{:>8.3}  {other:?}", event.time),
                }
            };
            if let Ok(mut lines) = sink.lock() {
                lines.push(line);
            }
        })
    })?;
    ctl.schedule(sequence.spec(), ScheduleOptions::new().name("cli"))?;

    let rendered = ctl.render(max_beats)?;
    if let Ok(lines) = lines.lock() {
        for line in lines.iter() {
            println!("{line}");
        }
    }
    tracing::info!(
        ticks = rendered.ticks,
        beats = rendered.end_beat,
        finished = rendered.finished,
        "rendered"
    );
    Ok(())
}

fn run_play(config: Option<PathBuf>, sequence: &SequenceArgs, beats: f64) -> tl_master::Result<()> {
    let mut ctl = controller(config, sequence)?;
    ctl.add_output(LogOutput::new("log", 24))?;
    ctl.schedule(sequence.spec(), ScheduleOptions::new().name("cli"))?;

    let seconds = ctl.with_timeline(|timeline| timeline.beats_to_seconds(beats))?;
    let deadline = Instant::now() + Duration::from_secs_f64(seconds.unwrap_or(0.0).max(0.0));
    ctl.play()?;
    tracing::info!(beats, "playing");

    while ctl.is_playing() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
    }
    ctl.stop()?;
    println!("{}", ctl.summary()?);
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
