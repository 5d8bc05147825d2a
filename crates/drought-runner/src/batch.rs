//! Sequential checkpointed batch loop.
//!
//! Tiles are attempted strictly in grid order, one child process at a
//! time — each worker saturates the machine through its own numerical
//! runtime, so outer concurrency would only cause contention. A tile
//! already present in the checkpoint set is skipped; a successful tile is
//! appended to the checkpoint before the next one starts; a failed tile
//! is logged, left un-checkpointed, and followed by a short backoff so a
//! degraded backing store is not hammered with immediate retries.
//!
//! Per-tile lifecycle: PENDING, then either SKIPPED, or RUNNING ending in
//! DONE or FAILED. FAILED is terminal for this run only; the tile stays
//! eligible because it never reaches the checkpoint file.

use std::process::Command;
use std::time::{Duration, Instant};

use tracing::{error, info};

use drought_grid::TileGrid;

use crate::checkpoint::CheckpointSet;
use crate::executor::{TileWorker, WorkOutcome};
use crate::job::display_command;
use crate::ows::OwsRefresh;
use crate::{Result, RunnerError};

/// A command run once before the tile loop; a non-zero exit aborts the
/// run before any tile is attempted. Used by the DEM family to ingest the
/// elevation mosaic covering the whole grid.
#[derive(Debug, Clone)]
pub struct PrepareStep {
    /// Program to execute.
    pub program: String,
    /// Arguments to the program.
    pub args: Vec<String>,
}

impl PrepareStep {
    fn run(&self) -> Result<()> {
        let command = display_command(&self.program, &self.args);
        info!("Running prepare step: {command}");
        let status = Command::new(&self.program)
            .args(&self.args)
            .status()
            .map_err(|err| RunnerError::PrepareFailed {
                command: command.clone(),
                status: err.to_string(),
            })?;
        if !status.success() {
            return Err(RunnerError::PrepareFailed {
                command,
                status: status.to_string(),
            });
        }
        Ok(())
    }
}

/// Knobs for one batch run.
#[derive(Debug)]
pub struct BatchConfig {
    /// Delay after a failed tile before the next one is attempted.
    pub backoff: Duration,
    /// Optional command run once before the loop (fatal on failure).
    pub prepare: Option<PrepareStep>,
    /// Optional OWS refresh issued after the loop (never fatal).
    pub ows: Option<OwsRefresh>,
    /// Stop after this many launched (not skipped) tiles. For smoke runs.
    pub max_attempts: Option<usize>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        BatchConfig {
            backoff: Duration::from_secs(2),
            prepare: None,
            ows: None,
            max_attempts: None,
        }
    }
}

/// Outcome summary of one batch run.
///
/// The authoritative record remains the log stream and the checkpoint
/// file; this is a convenience for the final summary line and for tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchReport {
    /// Tiles in the grid.
    pub total: usize,
    /// Tiles skipped because they were already checkpointed.
    pub skipped: usize,
    /// Tiles whose worker exited zero this run.
    pub succeeded: usize,
    /// Tiles whose worker failed this run.
    pub failed: usize,
}

impl BatchReport {
    /// Tiles actually launched this run.
    pub fn attempted(&self) -> usize {
        self.succeeded + self.failed
    }
}

/// The tile batch runner: owns the checkpoint set for the duration of a
/// run and drives one [`TileWorker`] across the grid.
#[derive(Debug)]
pub struct BatchRunner {
    checkpoint: CheckpointSet,
    config: BatchConfig,
}

impl BatchRunner {
    /// Runner over a loaded checkpoint set.
    pub fn new(checkpoint: CheckpointSet, config: BatchConfig) -> Self {
        BatchRunner { checkpoint, config }
    }

    /// Read access to the checkpoint set (used by the CLI for reporting).
    pub fn checkpoint(&self) -> &CheckpointSet {
        &self.checkpoint
    }

    /// Process every tile of `grid` not yet checkpointed, in grid order.
    ///
    /// Returns an error only for run-level failures: a failing prepare
    /// step or an unwritable checkpoint file. Worker failures are logged,
    /// counted, and never abort the loop.
    pub fn run(&mut self, grid: &TileGrid, worker: &dyn TileWorker) -> Result<BatchReport> {
        if let Some(prepare) = &self.config.prepare {
            prepare.run()?;
        }

        let total = grid.len();
        let mut report = BatchReport {
            total,
            ..BatchReport::default()
        };
        let run_started = Instant::now();

        for (index, tile) in grid.iter().enumerate() {
            let position = index + 1;
            let percent = 100.0 * position as f64 / total.max(1) as f64;

            if self.checkpoint.contains(tile.id()) {
                info!("Skip already completed: {} [{position}/{total}]", tile.id());
                report.skipped += 1;
                continue;
            }

            if let Some(limit) = self.config.max_attempts {
                if report.attempted() >= limit {
                    info!("Attempt limit of {limit} reached, stopping early");
                    break;
                }
            }

            info!("Launching single-shot: {} [{position}/{total}]", tile.id());
            let started = Instant::now();
            let outcome = worker.run(tile);
            let elapsed = started.elapsed().as_secs_f64();

            match outcome {
                WorkOutcome::Success => {
                    self.checkpoint.record(tile.id())?;
                    report.succeeded += 1;
                    info!(
                        "Processed {} in {elapsed:.1}s | [{position}/{total}] ({percent:.2}%)",
                        tile.id()
                    );
                }
                WorkOutcome::Failed { code, reason } => {
                    report.failed += 1;
                    error!(
                        "Failed {} ({reason}, exit code {code:?}) | [{position}/{total}] ({percent:.2}%)",
                        tile.id()
                    );
                    // Dampen rapid-fire retries against a degraded NAS.
                    if !self.config.backoff.is_zero() {
                        std::thread::sleep(self.config.backoff);
                    }
                }
            }
        }

        info!(
            "Batch complete in {:.1}s: {} succeeded, {} failed, {} skipped of {} tiles",
            run_started.elapsed().as_secs_f64(),
            report.succeeded,
            report.failed,
            report.skipped,
            report.total,
        );

        if let Some(ows) = &self.config.ows {
            ows.trigger();
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashSet;

    use drought_grid::Tile;
    use tempfile::tempdir;

    /// In-memory worker that fails a configured set of tiles and records
    /// every invocation in order.
    struct ScriptedWorker {
        fail: HashSet<String>,
        calls: RefCell<Vec<String>>,
    }

    impl ScriptedWorker {
        fn new(fail: &[&str]) -> Self {
            ScriptedWorker {
                fail: fail.iter().map(|s| s.to_string()).collect(),
                calls: RefCell::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }
    }

    impl TileWorker for ScriptedWorker {
        fn run(&self, tile: &Tile) -> WorkOutcome {
            self.calls.borrow_mut().push(tile.id().to_string());
            if self.fail.contains(tile.id()) {
                WorkOutcome::Failed {
                    code: Some(1),
                    reason: "scripted failure".to_string(),
                }
            } else {
                WorkOutcome::Success
            }
        }
    }

    fn grid(ids: &[&str]) -> TileGrid {
        let features: Vec<String> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| {
                let x0 = i as f64;
                format!(
                    r#"{{"type":"Feature","properties":{{"tile_ids":"{id}"}},
                        "geometry":{{"type":"Polygon","coordinates":[[[{x0},0.0],[{x1},0.0],[{x1},1.0],[{x0},0.0]]]}}}}"#,
                    id = id,
                    x0 = x0,
                    x1 = x0 + 1.0,
                )
            })
            .collect();
        let text = format!(
            r#"{{"type":"FeatureCollection","features":[{}]}}"#,
            features.join(",")
        );
        TileGrid::from_geojson_str(&text).expect("valid grid")
    }

    fn no_backoff() -> BatchConfig {
        BatchConfig {
            backoff: Duration::ZERO,
            ..BatchConfig::default()
        }
    }

    #[test]
    fn processes_exactly_the_unfinished_tiles_in_order() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("done.txt");
        std::fs::write(&path, "B\n").expect("seed checkpoint");

        let checkpoint = CheckpointSet::load(&path).expect("load");
        let mut runner = BatchRunner::new(checkpoint, no_backoff());
        let worker = ScriptedWorker::new(&[]);

        let report = runner.run(&grid(&["A", "B", "C", "D"]), &worker).expect("run");
        assert_eq!(worker.calls(), vec!["A", "C", "D"]);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.succeeded, 3);
        assert_eq!(report.failed, 0);
    }

    #[test]
    fn second_run_skips_everything() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("done.txt");
        let tiles = grid(&["A", "B"]);

        let mut first = BatchRunner::new(CheckpointSet::load(&path).expect("load"), no_backoff());
        first.run(&tiles, &ScriptedWorker::new(&[])).expect("first run");

        let worker = ScriptedWorker::new(&[]);
        let mut second = BatchRunner::new(CheckpointSet::load(&path).expect("load"), no_backoff());
        let report = second.run(&tiles, &worker).expect("second run");

        assert!(worker.calls().is_empty());
        assert_eq!(report.skipped, 2);
        assert_eq!(report.attempted(), 0);
    }

    #[test]
    fn failed_tile_does_not_stop_the_batch() {
        // Spec scenario: A already done, B exits 1, C exits 0.
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("done.txt");
        std::fs::write(&path, "A\n").expect("seed checkpoint");

        let worker = ScriptedWorker::new(&["B"]);
        let mut runner =
            BatchRunner::new(CheckpointSet::load(&path).expect("load"), no_backoff());
        let report = runner.run(&grid(&["A", "B", "C"]), &worker).expect("run");

        assert_eq!(worker.calls(), vec!["B", "C"]);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.succeeded, 1);

        let text = std::fs::read_to_string(&path).expect("read checkpoint");
        assert_eq!(text, "A\nC\n");
    }

    #[test]
    fn single_success_appends_one_line() {
        // Spec scenario: empty checkpoint, one tile exiting 0.
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("done.txt");

        let mut runner =
            BatchRunner::new(CheckpointSet::load(&path).expect("load"), no_backoff());
        runner.run(&grid(&["X"]), &ScriptedWorker::new(&[])).expect("run");

        assert_eq!(std::fs::read_to_string(&path).expect("read"), "X\n");
    }

    #[test]
    fn attempt_limit_stops_early_but_keeps_skips() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("done.txt");
        std::fs::write(&path, "A\n").expect("seed checkpoint");

        let worker = ScriptedWorker::new(&[]);
        let mut runner = BatchRunner::new(
            CheckpointSet::load(&path).expect("load"),
            BatchConfig {
                backoff: Duration::ZERO,
                max_attempts: Some(2),
                ..BatchConfig::default()
            },
        );
        let report = runner.run(&grid(&["A", "B", "C", "D"]), &worker).expect("run");

        assert_eq!(worker.calls(), vec!["B", "C"]);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.attempted(), 2);
    }

    #[test]
    fn failing_prepare_step_is_fatal_before_any_tile() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("done.txt");

        let worker = ScriptedWorker::new(&[]);
        let mut runner = BatchRunner::new(
            CheckpointSet::load(&path).expect("load"),
            BatchConfig {
                backoff: Duration::ZERO,
                prepare: Some(PrepareStep {
                    program: "sh".to_string(),
                    args: vec!["-c".to_string(), "exit 1".to_string()],
                }),
                ..BatchConfig::default()
            },
        );

        let err = runner.run(&grid(&["A"]), &worker).unwrap_err();
        assert!(matches!(err, RunnerError::PrepareFailed { .. }));
        assert!(worker.calls().is_empty());
        assert!(!path.exists());
    }

    #[test]
    fn successful_prepare_step_precedes_the_loop() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("done.txt");
        let marker = dir.path().join("prepared");

        let worker = ScriptedWorker::new(&[]);
        let mut runner = BatchRunner::new(
            CheckpointSet::load(&path).expect("load"),
            BatchConfig {
                backoff: Duration::ZERO,
                prepare: Some(PrepareStep {
                    program: "sh".to_string(),
                    args: vec![
                        "-c".to_string(),
                        format!("touch {}", marker.display()),
                    ],
                }),
                ..BatchConfig::default()
            },
        );

        runner.run(&grid(&["A"]), &worker).expect("run");
        assert!(marker.exists());
        assert_eq!(worker.calls(), vec!["A"]);
    }
}
