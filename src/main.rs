use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tabled::{settings::Style, Table, Tabled};

use trainlive::circuit::{CircuitPhase, CircuitRunner, CircuitSnapshot};
use trainlive::config::AppConfig;
use trainlive::cue::TracingCueSink;
use trainlive::live::LiveCircuit;
use trainlive::logging::{init_logging, LogLevel};
use trainlive::records::BestEffort;
use trainlive::replay::{replay_track, ReplayOptions, ReplayReport};
use trainlive::track::load_track;
use trainlive::{format_duration, format_pace, CircuitStep, IntervalBlock, RunType, TrainLiveError};
use tracing::Level;

/// trainlive - live activity tracking core
///
/// Replays recorded tracks through the run tracker and drives circuit
/// workouts from the command line.
#[derive(Parser)]
#[command(name = "trainlive")]
#[command(author = "trainlive contributors")]
#[command(version = "0.1.0")]
#[command(about = "Live activity tracking CLI", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a recorded track (GPX or JSON) as a run
    Replay {
        /// Track file path
        #[arg(short, long)]
        track: PathBuf,

        /// Interval program as a JSON array of blocks
        #[arg(short, long)]
        plan: Option<PathBuf>,

        /// Run name
        #[arg(short, long, default_value = "Replay")]
        name: String,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run a circuit workout to completion
    Circuit {
        /// Circuit steps as a JSON array
        #[arg(short, long)]
        plan: PathBuf,

        /// Number of rounds
        #[arg(short, long, default_value = "1")]
        rounds: u32,

        /// Tick on the wall clock instead of simulating
        #[arg(long)]
        realtime: bool,
    },

    /// Manage the configuration file
    Config {
        /// Write a default configuration file
        #[arg(long)]
        init: bool,

        /// Overwrite an existing file with --init
        #[arg(long)]
        force: bool,

        /// Print the effective configuration
        #[arg(long)]
        show: bool,
    },
}

#[derive(Tabled)]
struct EffortRow {
    #[tabled(rename = "Distance")]
    distance: String,
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Pace")]
    pace: String,
}

impl From<&BestEffort> for EffortRow {
    fn from(effort: &BestEffort) -> Self {
        Self {
            distance: effort.distance.to_string(),
            time: format_duration(effort.seconds.round() as u32),
            pace: format_pace(Some(effort.seconds / (effort.distance.meters() / 1000.0))),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(AppConfig::default_config_path);
    let config = AppConfig::load_or_default(&config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path.display()))?;

    let mut log_config = config.logging.clone();
    if cli.verbose > 0 {
        log_config.level = LogLevel::from_verbosity(cli.verbose);
        eprintln!("{}", format!("Log level: {:?}", log_config.level).dimmed());
    }
    init_logging(&log_config)?;

    match cli.command {
        Commands::Replay { track, plan, name, json } => replay(&config, &track, plan.as_deref(), name, json),
        Commands::Circuit { plan, rounds, realtime } => {
            let steps: Vec<CircuitStep> = read_json(&plan)?;
            if realtime {
                circuit_realtime(&config, steps, rounds)
            } else {
                circuit_simulated(&config, steps, rounds)
            }
        }
        Commands::Config { init, force, show } => manage_config(config, &config_path, init, force, show),
    }
}

/// Log a library error at its severity and turn it into a user-facing error
fn report(err: TrainLiveError) -> anyhow::Error {
    if err.severity().to_tracing_level() == Level::WARN {
        tracing::warn!(error = %err, "operation rejected");
    } else {
        tracing::error!(error = %err, "operation failed");
    }
    anyhow::anyhow!(err.user_message())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file)).with_context(|| format!("Failed to parse {}", path.display()))
}

fn replay(config: &AppConfig, track: &Path, plan: Option<&Path>, name: String, json: bool) -> Result<()> {
    let points = load_track(track).map_err(report)?;
    if points.is_empty() {
        bail!("Track {} contains no points", track.display());
    }

    let (run_type, blocks) = match plan {
        Some(path) => (RunType::Interval, read_json::<Vec<IntervalBlock>>(path)?),
        None => (RunType::Free, Vec::new()),
    };

    let options = ReplayOptions {
        log_id: uuid::Uuid::new_v4().to_string(),
        name,
        run_type,
        blocks,
    };
    let outcome = replay_track(&points, config, options).map_err(report)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_report(&outcome);
    }
    Ok(())
}

fn print_report(report: &ReplayReport) {
    let summary = &report.summary;

    println!("{}", format!("Run: {}", summary.name).green().bold());
    println!("  Log ID:         {}", summary.log_id.dimmed());
    println!("  Elapsed:        {}", format_duration(summary.elapsed_seconds));
    println!("  Distance:       {:.2} km", summary.distance_m / 1000.0);
    println!("  Average pace:   {}", format_pace(summary.average_pace));
    println!("  Best pace:      {}", format_pace(summary.best_pace));
    println!("  Elevation gain: {:.0} m", summary.elevation_gain_m);
    println!(
        "  Fixes:          {} accepted, {} rejected",
        report.accepted,
        if report.rejected > 0 {
            report.rejected.to_string().yellow()
        } else {
            report.rejected.to_string().normal()
        }
    );

    if report.cues.len() > 1 {
        println!();
        println!("{}", "Cues".cyan().bold());
        for (second, kind) in &report.cues {
            println!("  {:>8}  {:?}", format_duration(*second), kind);
        }
    }

    if !report.best_efforts.is_empty() {
        println!();
        println!("{}", "Best efforts".cyan().bold());
        let rows: Vec<EffortRow> = report.best_efforts.iter().map(EffortRow::from).collect();
        println!("{}", Table::new(rows).with(Style::rounded()));
    }
}

fn describe(snapshot: &CircuitSnapshot) -> String {
    match snapshot.phase {
        CircuitPhase::Exercise => format!(
            "Round {}/{}  {}  {}s",
            snapshot.round,
            snapshot.total_rounds,
            snapshot.exercise_id.as_deref().unwrap_or("-").bold(),
            snapshot.remaining_seconds
        ),
        CircuitPhase::Rest => format!(
            "Round {}/{}  {}  {}s",
            snapshot.round,
            snapshot.total_rounds,
            "rest".yellow(),
            snapshot.remaining_seconds
        ),
        CircuitPhase::Complete => "Circuit complete".green().bold().to_string(),
    }
}

fn circuit_simulated(config: &AppConfig, steps: Vec<CircuitStep>, rounds: u32) -> Result<()> {
    let mut runner = CircuitRunner::new(config.circuit);
    runner
        .start_workout(steps, rounds)
        .map_err(report)?;

    println!(
        "{}",
        format!("Circuit: {} remaining", format_duration(runner.total_remaining_seconds())).blue().bold()
    );
    println!("  {:>8}  {}", format_duration(0), describe(&runner.snapshot()));

    let mut elapsed = 0;
    while runner.is_active() {
        elapsed += 1;
        if runner.tick().is_some() {
            println!("  {:>8}  {}", format_duration(elapsed), describe(&runner.snapshot()));
        }
    }
    Ok(())
}

fn circuit_realtime(config: &AppConfig, steps: Vec<CircuitStep>, rounds: u32) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start runtime")?;

    runtime.block_on(async {
        let mut circuit = LiveCircuit::new(config.circuit, Arc::new(TracingCueSink));
        circuit
            .start_workout(steps, rounds)
            .map_err(report)?;

        let mut last = circuit.snapshot();
        println!("  {}", describe(&last));

        let mut poll = tokio::time::interval(Duration::from_millis(250));
        loop {
            tokio::select! {
                _ = poll.tick() => {
                    let snapshot = circuit.snapshot();
                    if snapshot.phase != last.phase || snapshot.step_index != last.step_index || snapshot.round != last.round {
                        println!("  {}", describe(&snapshot));
                    }
                    let done = !snapshot.active;
                    last = snapshot;
                    if done {
                        break;
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    circuit.reset();
                    println!("{}", "Circuit stopped".yellow());
                    break;
                }
            }
        }
        Ok(())
    })
}

fn manage_config(mut config: AppConfig, path: &Path, init: bool, force: bool, show: bool) -> Result<()> {
    if init {
        if path.exists() && !force {
            bail!("{} already exists (use --force to overwrite)", path.display());
        }
        config = AppConfig::default();
        config.save_to_file(path)?;
        println!("{}", format!("✓ Wrote {}", path.display()).green());
    }

    if show || !init {
        println!("{}", format!("# {}", path.display()).dimmed());
        println!("{}", toml::to_string_pretty(&config)?);
    }
    Ok(())
}
