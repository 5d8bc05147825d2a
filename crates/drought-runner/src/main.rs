//! `drought-batch` — checkpointed tile batch runner CLI.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing::info;

use drought_grid::TileGrid;
use drought_runner::{
    init_console_logging, init_logging, BatchRunner, CheckpointSet, JobKind, OwsRefresh,
    ProcessWorker, Result, RunConfig, DEFAULT_OWS_CONTAINER,
};

#[derive(Debug, Parser)]
#[command(
    name = "drought-batch",
    version,
    about = "Checkpointed per-tile batch runner for the drought monitoring ODC pipeline"
)]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Debug, Subcommand)]
enum CliCommand {
    /// Run the baseline mean/std computation over the grid.
    Baseline(RunArgs),
    /// Run the z-normalization of monthly composites over the grid.
    Znorm(RunArgs),
    /// Ingest Copernicus DEM elevation/aspect over the grid.
    DemIngest(RunArgs),
    /// Ingest tree-canopy-density rasters over the grid.
    TcdIngest(RunArgs),
    /// Trigger the OWS catalogue refresh without running a batch.
    OwsUpdate {
        /// OWS container to refresh.
        #[arg(long, default_value = DEFAULT_OWS_CONTAINER)]
        container: String,
    },
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Run-configuration YAML file.
    #[arg(long)]
    config: PathBuf,

    /// Override the grid file from the configuration.
    #[arg(long)]
    grid: Option<PathBuf>,

    /// Override the checkpoint file from the configuration.
    #[arg(long)]
    checkpoint: Option<PathBuf>,

    /// Launch at most this many tiles (smoke runs).
    #[arg(long)]
    limit: Option<usize>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let result = match cli.command {
        CliCommand::Baseline(args) => run_batch(JobKind::Baseline, args),
        CliCommand::Znorm(args) => run_batch(JobKind::ZNorm, args),
        CliCommand::DemIngest(args) => run_batch(JobKind::DemIngest, args),
        CliCommand::TcdIngest(args) => run_batch(JobKind::TcdIngest, args),
        CliCommand::OwsUpdate { container } => {
            init_console_logging();
            OwsRefresh::new(container).trigger();
            Ok(())
        }
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("fatal: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run_batch(kind: JobKind, args: RunArgs) -> Result<()> {
    let mut config = RunConfig::load(&args.config)?;
    if let Some(grid) = args.grid {
        config.grid = grid;
    }
    if let Some(checkpoint) = args.checkpoint {
        config.checkpoint = Some(checkpoint);
    }

    let guard = init_logging(config.log_dir(kind), &format!("admin_{kind}"))?;
    info!("Logging to {}", guard.log_path().display());
    info!("Starting {kind} batch run");

    // Grid and checkpoint problems are fatal before any tile is touched.
    let grid = TileGrid::from_geojson_file(&config.grid)?;
    info!("Loaded {} tiles from {}", grid.len(), config.grid.display());

    let checkpoint_path = config.checkpoint_path(kind);
    let checkpoint = CheckpointSet::load(&checkpoint_path)?;
    info!(
        "{} tiles already completed per {}",
        checkpoint.len(),
        checkpoint_path.display()
    );

    let spec = config.worker_spec(kind);
    let worker = match config.timeout() {
        Some(timeout) => ProcessWorker::with_timeout(spec, timeout),
        None => ProcessWorker::new(spec),
    };

    let mut batch_config = config.batch_config(kind);
    batch_config.max_attempts = args.limit;

    let mut runner = BatchRunner::new(checkpoint, batch_config);
    runner.run(&grid, &worker)?;
    Ok(())
}
