//! PDR replay tool
//!
//! Feeds a recorded sensor CSV through the engine and writes the session log.
//!
//! Input format (header required):
//! ```text
//! sensor,timestamp_ns,x,y,z
//! accel,0,0.12,0.20,9.79
//! gyro,2500000,0.001,-0.002,0.000
//! ```

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use pdr_sensing::config::PdrConfig;
use pdr_sensing::export::{EventLogWriter, RouteEventKind, SessionLogWriter, TrialId};
use pdr_sensing::orientation::TimeStep;
use pdr_sensing::step_detection::StalePolicy;
use pdr_sensing::{PdrEngine, Point2, SensorSample};
use serde::Deserialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "pdr-replay")]
#[command(about = "Replay recorded IMU samples through the PDR engine")]
#[command(version)]
struct Args {
    /// Recorded samples (sensor,timestamp_ns,x,y,z)
    input: PathBuf,

    /// TOML configuration; defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Session log output; stdout when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Route event log, appended to if it exists
    #[arg(long)]
    events: Option<PathBuf>,

    /// Trial number written to the logs
    #[arg(long)]
    trial: Option<u32>,

    /// Starting X in the reported frame (meters)
    #[arg(long, requires = "initial_y", allow_negative_numbers = true)]
    initial_x: Option<f64>,

    /// Starting Y in the reported frame (meters)
    #[arg(long, requires = "initial_x", allow_negative_numbers = true)]
    initial_y: Option<f64>,

    /// Override the orientation integration step
    #[arg(long, value_enum)]
    time_step: Option<TimeStepArg>,

    /// Override what a peak after a long pause does to step timing
    #[arg(long, value_enum)]
    stale_policy: Option<StalePolicyArg>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StalePolicyArg {
    Literal,
    Reanchor,
}

impl From<StalePolicyArg> for StalePolicy {
    fn from(arg: StalePolicyArg) -> Self {
        match arg {
            StalePolicyArg::Literal => StalePolicy::Literal,
            StalePolicyArg::Reanchor => StalePolicy::Reanchor,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TimeStepArg {
    Fixed,
    Measured,
}

impl From<TimeStepArg> for TimeStep {
    fn from(arg: TimeStepArg) -> Self {
        match arg {
            TimeStepArg::Fixed => TimeStep::Fixed,
            TimeStepArg::Measured => TimeStep::Measured,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum SensorKind {
    Accel,
    Gyro,
}

#[derive(Debug, Deserialize)]
struct RawRecord {
    sensor: SensorKind,
    timestamp_ns: u64,
    x: f64,
    y: f64,
    z: f64,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    run(&args)
}

fn run(args: &Args) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => PdrConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PdrConfig::default(),
    };
    if let Some(time_step) = args.time_step {
        config.orientation.time_step = time_step.into();
    }
    if let Some(stale_policy) = args.stale_policy {
        config.step.stale_policy = stale_policy.into();
    }
    let mut engine = PdrEngine::new(config)?;

    let output: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        )),
        None => Box::new(io::stdout().lock()),
    };
    let trial = args.trial.map(TrialId);
    let mut session = SessionLogWriter::new(output, trial)?;
    let mut events = match &args.events {
        Some(path) => Some(EventLogWriter::append(path, trial.unwrap_or(TrialId(1)))?),
        None => None,
    };

    engine.start();
    let start = match (args.initial_x, args.initial_y) {
        (Some(x), Some(y)) => {
            engine.set_initial_position(x, y);
            Point2::new(x, y)
        }
        _ => Point2::default(),
    };
    if let Some(events) = events.as_mut() {
        events.record(RouteEventKind::Start, 0, start, &engine.snapshot())?;
    }

    let mut reader = csv::Reader::from_path(&args.input)
        .with_context(|| format!("opening {}", args.input.display()))?;
    let mut samples = 0u64;
    for (row, record) in reader.deserialize::<RawRecord>().enumerate() {
        // +2: header line, 1-based
        let record = record.with_context(|| format!("malformed sample on line {}", row + 2))?;
        let sample = SensorSample::new(record.timestamp_ns, [record.x, record.y, record.z]);
        match record.sensor {
            SensorKind::Accel => {
                engine.ingest_acceleration(sample);
            }
            SensorKind::Gyro => {
                engine.ingest_angular_rate(sample);
            }
        }
        session.record(&engine.snapshot())?;
        samples += 1;
    }

    engine.stop();
    if let Some(events) = events.as_mut() {
        events.record(RouteEventKind::Stop, 1, engine.position(), &engine.snapshot())?;
        events.flush()?;
    }
    session.flush()?;

    let position = engine.position();
    log::info!(
        "Replayed {} samples ({:.1}s): {} steps, {:.3}m, heading {:.1}°, position ({:.3}, {:.3})",
        samples,
        engine.elapsed_ns() as f64 * 1e-9,
        engine.step_count(),
        engine.total_distance(),
        engine.heading_degrees(),
        position.x,
        position.y
    );
    log::info!(
        "Rejected peaks: {} too fast, {} stale; {} session rows",
        engine.detector().rejected_fast(),
        engine.detector().rejected_stale(),
        session.rows_written()
    );

    Ok(())
}
