//! Isolated per-tile task execution.
//!
//! Each unit of work runs in its own child process so that whatever the
//! worker's numerical runtime does — leak memory, corrupt its task graph,
//! die mid-shutdown — is confined to that tile. The runner only sees an
//! exit status. Anything that goes wrong while attempting a tile becomes
//! a [`WorkOutcome::Failed`]; per-tile problems never abort the batch.

use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use drought_grid::Tile;

use crate::job::{display_command, WorkerSpec};

/// Poll interval while waiting on a child with a deadline.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Outcome of one unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkOutcome {
    /// The worker exited with status zero.
    Success,
    /// The worker failed, was killed, or could not be launched.
    Failed {
        /// Exit code when the process exited on its own.
        code: Option<i32>,
        /// Human-readable cause for the log stream.
        reason: String,
    },
}

impl WorkOutcome {
    /// True for [`WorkOutcome::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, WorkOutcome::Success)
    }

    fn failed(code: Option<i32>, reason: impl Into<String>) -> Self {
        WorkOutcome::Failed {
            code,
            reason: reason.into(),
        }
    }
}

/// One isolated unit of work per tile.
///
/// The seam between orchestration and process isolation; tests drive the
/// batch loop through in-memory implementations.
pub trait TileWorker {
    /// Execute the unit of work for `tile` and report its outcome.
    fn run(&self, tile: &Tile) -> WorkOutcome;
}

/// [`TileWorker`] that launches the configured worker command as a child
/// process and awaits its exit.
///
/// With a deadline configured, the child is polled and killed once the
/// wall-clock budget is exhausted; the tile is reported failed and stays
/// eligible for the next run.
#[derive(Debug)]
pub struct ProcessWorker {
    spec: WorkerSpec,
    timeout: Option<Duration>,
}

impl ProcessWorker {
    /// Worker that waits indefinitely for the child.
    pub fn new(spec: WorkerSpec) -> Self {
        ProcessWorker {
            spec,
            timeout: None,
        }
    }

    /// Worker that kills the child after `timeout` and fails the tile.
    pub fn with_timeout(spec: WorkerSpec, timeout: Duration) -> Self {
        ProcessWorker {
            spec,
            timeout: Some(timeout),
        }
    }

    fn await_child(&self, mut child: Child, command_line: &str) -> WorkOutcome {
        let deadline = self.timeout.map(|t| Instant::now() + t);
        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    return if status.success() {
                        WorkOutcome::Success
                    } else {
                        WorkOutcome::failed(status.code(), format!("{status}"))
                    };
                }
                Ok(None) => {}
                Err(err) => {
                    return WorkOutcome::failed(None, format!("wait failed: {err}"));
                }
            }

            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    warn!(command = command_line, "worker exceeded deadline, killing");
                    if let Err(err) = child.kill() {
                        warn!("failed to kill timed-out worker: {err}");
                    }
                    // Reap the child so it does not linger as a zombie.
                    let _ = child.wait();
                    let secs = self.timeout.map(|t| t.as_secs()).unwrap_or(0);
                    return WorkOutcome::failed(None, format!("timed out after {secs}s"));
                }
            }

            std::thread::sleep(POLL_INTERVAL);
        }
    }
}

impl TileWorker for ProcessWorker {
    fn run(&self, tile: &Tile) -> WorkOutcome {
        let args = match self.spec.build_args(tile) {
            Ok(args) => args,
            Err(err) => {
                return WorkOutcome::failed(None, format!("failed to stage job: {err}"));
            }
        };
        let command_line = display_command(&self.spec.program, &args);
        debug!(tile = tile.id(), command = %command_line, "spawning worker");

        // The worker inherits stdout/stderr so its own log output lands in
        // the run's console stream, matching the one-shot script behavior.
        let child = Command::new(&self.spec.program)
            .args(&args)
            .stdin(Stdio::null())
            .spawn();
        match child {
            Ok(child) => self.await_child(child, &command_line),
            Err(err) => WorkOutcome::failed(None, format!("failed to spawn worker: {err}")),
        }
    }
}
