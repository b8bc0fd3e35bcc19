use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use equipment_pulse::config::{Config, DEFAULT_CONFIG_FILE};
use equipment_pulse::report::{AnalyticsView, HistoryList, SummaryCard};
use equipment_pulse::{AppState, SummaryId};

/// Equipment Pulse – ingest equipment datasets and inspect their analytics
///
/// Examples:
///   equipment-pulse ingest plant_a.csv plant_b.csv
///   equipment-pulse history --limit 3
///   equipment-pulse analyze --id 4 --json
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    ///
    /// If not specified, looks for equipment-pulse.toml in the current directory
    #[arg(
        short,
        long,
        value_name = "FILE",
        global = true,
        env = "EQUIPMENT_PULSE_CONFIG"
    )]
    config: Option<PathBuf>,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse and summarize one or more files, adding each to the history
    Ingest {
        #[arg(required = true, value_name = "FILE")]
        files: Vec<PathBuf>,
    },
    /// List retained datasets, most recent first
    History {
        #[arg(short, long, value_name = "COUNT")]
        limit: Option<usize>,
    },
    /// Show health index, parameter similarity and trend for a dataset
    Analyze {
        /// Dataset id (defaults to the most recent upload)
        #[arg(long)]
        id: Option<u64>,
    },
    /// Write a default configuration file
    InitConfig,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            log::error!("{e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let open_state = || -> Result<AppState> {
        let config = load_config(cli.config.as_deref())?;
        AppState::open(&config)
    };

    match cli.command {
        Command::InitConfig => init_config(),
        Command::Ingest { ref files } => {
            let failures = ingest(&open_state()?, files, cli.json)?;
            Ok(if failures == 0 {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::History { limit } => {
            let state = open_state()?;
            let history = state.history(limit.unwrap_or(state.capacity()));
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&history)?);
            } else {
                print!("{}", HistoryList(&history));
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Analyze { id } => {
            let state = open_state()?;
            let summary = match id {
                Some(id) => state
                    .find(SummaryId(id))
                    .with_context(|| format!("dataset {id} is not in the history"))?,
                None => state.latest().context("no datasets have been ingested yet")?,
            };
            let report = state.analyze(&summary);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", SummaryCard(&summary));
                println!();
                print!("{}", AnalyticsView(&report));
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Ingest every file in turn, returning how many failed. A file that cannot
/// be read or ingested is logged and skipped.
fn ingest(state: &AppState, files: &[PathBuf], json: bool) -> Result<usize> {
    let mut failures = 0;
    let mut summaries = Vec::new();

    for path in files {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                log::error!("Failed to read {}: {e}", path.display());
                failures += 1;
                continue;
            }
        };
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        match state.ingest(&filename, &bytes) {
            Ok(outcome) => {
                if let Some(evicted) = &outcome.evicted {
                    log::info!(
                        "History full, evicted dataset {} ('{}')",
                        evicted.id(),
                        evicted.filename()
                    );
                }
                if !json {
                    print!("{}", SummaryCard(&outcome.summary));
                }
                summaries.push(outcome.summary);
            }
            Err(e) => {
                log::error!("Failed to ingest {}: {e}", path.display());
                failures += 1;
            }
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
    }

    Ok(failures)
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?.unwrap_or_default(),
    };
    log::debug!("configuration: {config:?}");
    Ok(config)
}

fn init_config() -> Result<ExitCode> {
    let path = Path::new(DEFAULT_CONFIG_FILE);
    if path.exists() {
        bail!("{DEFAULT_CONFIG_FILE} already exists. Remove it first or edit it manually.");
    }
    std::fs::write(path, Config::default_toml()?)
        .with_context(|| format!("Failed to write {DEFAULT_CONFIG_FILE}"))?;
    println!("Created {DEFAULT_CONFIG_FILE} with default settings.");
    Ok(ExitCode::SUCCESS)
}
