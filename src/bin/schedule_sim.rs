//! Host-side schedule simulator.
//!
//! Builds an engine on the in-memory storage backend, answers its sync
//! request with a schedule file and replays a stretch of the day one
//! minute per tick, printing every observable change.
//!
//! ```text
//! schedule-sim --schedule heating.json --config heating-config.json \
//!              --start 06:00 --minutes 1440 --mode "Boost On"
//! ```

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use schedule_engine::adapters::nvs::NvsAdapter;
use schedule_engine::adapters::source::RecordingSource;
use schedule_engine::adapters::time::SimClock;
use schedule_engine::app::commands::EngineCommand;
use schedule_engine::app::events::EngineEvent;
use schedule_engine::app::ports::{EventSink, TimeSource};
use schedule_engine::app::service::ScheduleService;
use schedule_engine::arbiter::Mode;
use schedule_engine::config::EngineConfig;
use schedule_engine::sync::CandidateSchedule;
use schedule_engine::time::TimeOfDay;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Schedule payload in hub JSON format
    #[arg(short, long)]
    schedule: PathBuf,

    /// Engine configuration (JSON); defaults apply when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Time of day to start at (HH:MM)
    #[arg(long, default_value = "00:00")]
    start: String,

    /// Minutes to simulate
    #[arg(short, long, default_value_t = 1440)]
    minutes: u32,

    /// Mode to select after the schedule is applied (display name)
    #[arg(long)]
    mode: Option<String>,
}

/// Prints events prefixed with the simulated time.
struct PrintSink {
    now: Option<TimeOfDay>,
}

impl EventSink for PrintSink {
    fn emit(&mut self, event: &EngineEvent) {
        let stamp = self.now.map_or_else(|| "--:--".to_owned(), |t| t.to_string());
        match event {
            EngineEvent::OutputChanged { on } => {
                println!("{stamp}  output {}", if *on { "ON" } else { "OFF" });
            }
            EngineEvent::ChannelChanged { label, value } => {
                println!("{stamp}  {label} = {value}");
            }
            EngineEvent::Fired { index, at } => println!("{stamp}  fired #{index} ({at})"),
            EngineEvent::ModeChanged { from, to } => println!("{stamp}  mode {from} -> {to}"),
            other => println!("{stamp}  {other:?}"),
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("RUST_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .compact()
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str::<EngineConfig>(&text)
                .with_context(|| format!("parsing {}", path.display()))?
        }
        None => EngineConfig::default(),
    };
    let payload = fs::read_to_string(&cli.schedule)
        .with_context(|| format!("reading {}", cli.schedule.display()))?;
    let candidate = CandidateSchedule::from_json(config.kind, &payload)
        .map_err(|e| anyhow!("{}: {e}", cli.schedule.display()))?;
    let start = TimeOfDay::parse(&cli.start)
        .ok_or_else(|| anyhow!("--start: '{}' is not a time of day", cli.start))?;
    let mode = cli
        .mode
        .as_deref()
        .map(|name| Mode::from_name(config.kind, name).ok_or_else(|| anyhow!("unknown mode '{name}'")))
        .transpose()?;

    let storage = NvsAdapter::new().map_err(|e| anyhow!("storage: {e}"))?;
    let mut engine = ScheduleService::new(config, storage, SimClock::at(start), RecordingSource::new(true))
        .map_err(|e| anyhow!("engine: {e}"))?;
    let mut sink = PrintSink { now: Some(start) };

    engine.start(&mut sink);
    engine
        .handle_command(EngineCommand::SourceConnected, &mut sink)
        .map_err(|e| anyhow!("{e}"))?;
    if engine.source_mut().drain().is_empty() {
        bail!("engine did not request a schedule");
    }
    engine
        .handle_command(EngineCommand::ApplySchedule(candidate), &mut sink)
        .map_err(|e| anyhow!("schedule rejected: {e}"))?;
    if let Some(mode) = mode {
        engine
            .handle_command(EngineCommand::SetMode(mode), &mut sink)
            .map_err(|e| anyhow!("{e}"))?;
    }

    for _ in 0..cli.minutes {
        sink.now = engine.clock_mut().now();
        engine.tick(&mut sink);
        engine.clock_mut().advance(1);
    }

    println!(
        "-- {} ticks, mode {}, output {}, status {:?}",
        engine.tick_count(),
        engine.mode(),
        if engine.output() { "ON" } else { "OFF" },
        engine.status()
    );
    Ok(())
}
