//! # drought-runner
//!
//! Checkpointed per-tile batch orchestration for the drought monitoring
//! ODC pipeline.
//!
//! The heavy lifting — composite statistics, z-normalization, DEM and
//! tree-canopy ingestion — lives in external worker processes built on a
//! large numerical runtime. This crate only orchestrates them: it walks
//! the processing grid in order, skips tiles already recorded in an
//! append-only checkpoint file, launches one isolated worker process per
//! remaining tile, records each success durably, backs off briefly after
//! failures, and finally pokes the OWS map service to reload its
//! catalogue.
//!
//! Isolation is the point of the design: a worker that leaks, hangs, or
//! dies mid-shutdown cannot poison the next tile, because nothing but an
//! exit status crosses the process boundary. Re-running the binary after
//! any interruption resumes exactly where the checkpoint file left off.
//!
//! ## Example
//!
//! ```no_run
//! use std::time::Duration;
//! use drought_grid::TileGrid;
//! use drought_runner::{
//!     BatchConfig, BatchRunner, CheckpointSet, ProcessWorker, WorkerSpec,
//! };
//!
//! let grid = TileGrid::from_geojson_file("anciliary/grid_20_v2.geojson")?;
//! let checkpoint = CheckpointSet::load("logs/baseline/completed_tiles.txt")?;
//!
//! let worker = ProcessWorker::with_timeout(
//!     WorkerSpec::tile_id("python3", vec!["baseline.py".into()]),
//!     Duration::from_secs(3600),
//! );
//!
//! let mut runner = BatchRunner::new(checkpoint, BatchConfig::default());
//! let report = runner.run(&grid, &worker)?;
//! println!("{} succeeded, {} failed", report.succeeded, report.failed);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod batch;
mod checkpoint;
mod config;
mod error;
mod executor;
mod job;
mod logging;
mod ows;

pub use batch::{BatchConfig, BatchReport, BatchRunner, PrepareStep};
pub use checkpoint::CheckpointSet;
pub use config::{CommandConfig, OwsConfig, RunConfig, WorkerConfig};
pub use error::{Result, RunnerError};
pub use executor::{ProcessWorker, TileWorker, WorkOutcome};
pub use job::{ArgStyle, JobKind, TimeWindow, WorkerSpec};
pub use logging::{init_console_logging, init_logging, LoggingGuard};
pub use ows::{OwsRefresh, OwsStep, DEFAULT_OWS_CONTAINER};
