//! stormmon: tropical storm threat monitor.

use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use chrono::Utc;
use clap::{Parser, Subcommand};
use log::LevelFilter;

use stormmon_service::aggregator::SignalSource;
use stormmon_service::config::{Config, MAX_INTERVAL_MINUTES};
use stormmon_service::cycle::{self, CycleOptions, CycleReport};
use stormmon_service::levels::ALERT_INFO;
use stormmon_service::logging::{self, targets};
use stormmon_service::model::ThreatSignal;
use stormmon_service::notify::ConsoleNotifier;
use stormmon_service::resolver::resolve;
use stormmon_service::state::StateStore;

#[derive(Parser)]
#[command(name = "stormmon")]
#[command(about = "Tropical storm threat monitor")]
struct Cli {
    /// Config file (default: $STORMMON_CONFIG, then ./stormmon.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run monitoring cycles
    Run {
        /// Run a single cycle and exit
        #[arg(long)]
        once: bool,

        /// Minutes between cycles, 1 to 1440 (overrides config)
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..=MAX_INTERVAL_MINUTES))]
        interval_minutes: Option<u64>,
    },
    /// Inspect or reset the persisted state
    State {
        #[command(subcommand)]
        action: StateAction,
    },
    /// Resolve a threat signal given as JSON and print the level
    Resolve {
        /// e.g. '{"has_hurricane_watch": true, "in_hurricane_cone": true, "days_until_impact": 2}'
        signal: String,
    },
    /// Print the alert level table
    Levels,
}

#[derive(Subcommand)]
enum StateAction {
    /// Print the state file as JSON
    Show,
    /// Reset the state file
    Clear,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Resolve { signal } => resolve_command(&signal),
        Commands::Levels => {
            print_levels();
            ExitCode::SUCCESS
        }
        Commands::Run { once, interval_minutes } => {
            let Some(config) = load_config(cli.config.as_deref()) else {
                return ExitCode::FAILURE;
            };
            if once {
                run_once(&config)
            } else {
                let interval = match interval_minutes {
                    Some(minutes) => Duration::from_secs(minutes * 60),
                    None => config.monitor.interval(),
                };
                run_forever(&config, interval)
            }
        }
        Commands::State { action } => {
            let Some(config) = load_config(cli.config.as_deref()) else {
                return ExitCode::FAILURE;
            };
            state_command(&config, action)
        }
    }
}

/// Loads config and installs the logger. Errors are printed since the
/// logger is not up yet.
fn load_config(path: Option<&std::path::Path>) -> Option<Config> {
    let config = match Config::resolve(path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("✗ {}", e);
            return None;
        }
    };

    let level = logging::parse_level(&config.logging.level).unwrap_or(LevelFilter::Info);
    logging::init_logger(level, config.logging.file.as_deref(), config.logging.timestamps);
    Some(config)
}

fn build_sources(config: &Config) -> Option<Vec<Box<dyn SignalSource>>> {
    match cycle::sources_from_config(config) {
        Ok(sources) => Some(sources),
        Err(e) => {
            log::error!(target: targets::SYSTEM, "Failed to set up signal sources: {}", e);
            None
        }
    }
}

fn run_cycle_now(config: &Config, sources: &[Box<dyn SignalSource>]) -> Option<CycleReport> {
    let store = StateStore::new(&config.monitor.state_path);
    let refs: Vec<&dyn SignalSource> = sources.iter().map(|s| s.as_ref()).collect();
    let options = CycleOptions::from_config(config);

    match cycle::run_cycle(&refs, &store, &ConsoleNotifier, &options, Utc::now()) {
        Ok(report) => Some(report),
        Err(e) => {
            log::error!(target: targets::SYSTEM, "{}", e);
            None
        }
    }
}

fn run_once(config: &Config) -> ExitCode {
    let Some(sources) = build_sources(config) else {
        return ExitCode::FAILURE;
    };
    match run_cycle_now(config, &sources) {
        Some(report) if report.is_success() => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    }
}

fn run_forever(config: &Config, interval: Duration) -> ExitCode {
    let Some(sources) = build_sources(config) else {
        return ExitCode::FAILURE;
    };

    log::info!(
        target: targets::SYSTEM,
        "Monitoring {} every {} minutes",
        config.location.name,
        interval.as_secs() / 60
    );

    loop {
        // A failed cycle is logged; the next one may succeed.
        let _ = run_cycle_now(config, &sources);
        thread::sleep(interval);
    }
}

fn state_command(config: &Config, action: StateAction) -> ExitCode {
    let store = StateStore::new(&config.monitor.state_path);
    match action {
        StateAction::Show => match store.try_load() {
            Ok(state) => match serde_json::to_string_pretty(&state) {
                Ok(json) => {
                    println!("{}", json);
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("✗ {}", e);
                    ExitCode::FAILURE
                }
            },
            Err(e) => {
                eprintln!("✗ {}", e);
                ExitCode::FAILURE
            }
        },
        StateAction::Clear => {
            let result = store.lock().and_then(|_lock| store.clear());
            match result {
                Ok(()) => {
                    println!("State cleared: {}", store.path().display());
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("✗ {}", e);
                    ExitCode::FAILURE
                }
            }
        }
    }
}

fn resolve_command(input: &str) -> ExitCode {
    match ThreatSignal::from_json(input) {
        Ok(signal) => {
            let level = resolve(&signal);
            println!("{} {}", level.value(), level.name());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ invalid signal: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn print_levels() {
    for info in &ALERT_INFO {
        println!(
            "{} {} {:<20} {:<8} {:<16} {}",
            info.level.value(),
            info.icon,
            info.title_prefix,
            info.color,
            info.sound_pattern,
            info.guidance
        );
    }
}
