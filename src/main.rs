mod commands;
mod luminaire;
mod recalc;
mod recalc_stats;
mod report;
mod scenario;

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use commands::{Output, Overrides};
use luminaire::Library;

#[derive(Parser, Debug)]
#[command(name = "luxlab", version, about = "IES photometry and workplane illuminance")]
struct Cli {
    /// Also write logs to luxlab.log in this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Luminaire catalog TOML to use instead of the built-in demo set
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse an IES file and print its header
    Inspect { file: PathBuf },
    /// List the available luminaires
    Library,
    /// Compute the illuminance grid for a scenario
    Calc {
        /// Scenario TOML (default room and layout when omitted)
        #[arg(long)]
        scenario: Option<PathBuf>,
        /// Library id or IES file path
        #[arg(long)]
        luminaire: Option<String>,
        /// Grid cells per side
        #[arg(long)]
        resolution: Option<usize>,
        /// Sub-samples per cell axis
        #[arg(long)]
        samples: Option<usize>,
        /// Write a JSON report to this path, or `-` for stdout
        #[arg(long)]
        json: Option<PathBuf>,
        /// Print the grid values
        #[arg(long)]
        grid: bool,
    },
    /// Run the default room under every library luminaire
    Demo {
        #[arg(long)]
        json: bool,
    },
    /// Recompute each time a scenario file changes
    Watch {
        #[arg(long)]
        scenario: PathBuf,
        /// Stop after N seconds
        #[arg(long)]
        exit_after: Option<u64>,
        #[arg(long)]
        grid: bool,
    },
}

fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "luxlab=info".into());
    let stderr = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let (file, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::never(dir, "luxlab.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr)
        .with(file)
        .init();
    guard
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _log_guard = init_tracing(cli.log_dir.as_deref());

    let mut lib = match &cli.catalog {
        Some(path) => Library::from_catalog(path)?,
        None => Library::demo(),
    };

    match cli.command {
        Command::Inspect { file } => commands::inspect(&file),
        Command::Library => {
            commands::library(&lib);
            Ok(())
        }
        Command::Calc {
            scenario,
            luminaire,
            resolution,
            samples,
            json,
            grid,
        } => commands::calc(
            &mut lib,
            scenario.as_deref(),
            Overrides {
                luminaire,
                resolution,
                samples,
            },
            &Output { json, grid },
        ),
        Command::Demo { json } => commands::demo(&lib, json),
        Command::Watch {
            scenario,
            exit_after,
            grid,
        } => commands::watch(
            &mut lib,
            &scenario,
            exit_after.map(Duration::from_secs),
            grid,
        ),
    }
}
