//! Error types for the batch runner.
//!
//! Only run-level failures surface here: anything that prevents the run
//! from starting (grid, checkpoint, configuration, logging) or a prepare
//! step that must succeed before tiles are attempted. Per-tile failures
//! are not errors at this level — they are recorded as [`WorkOutcome`]
//! values and the batch continues.
//!
//! [`WorkOutcome`]: crate::executor::WorkOutcome

use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort a batch run.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// I/O error on a runner-owned file (checkpoint, job document, log).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Grid file unreadable or malformed.
    #[error("Grid error: {0}")]
    Grid(#[from] drought_grid::GridError),

    /// Checkpoint file exists but cannot be interpreted.
    #[error("Checkpoint file {path} is not valid UTF-8 text")]
    CorruptCheckpoint {
        /// Path of the offending file.
        path: PathBuf,
    },

    /// Run-configuration file unreadable or malformed.
    #[error("Configuration error in {path}: {message}")]
    Config {
        /// Path of the configuration file.
        path: PathBuf,
        /// Parser or validation detail.
        message: String,
    },

    /// Job document could not be serialized.
    #[error("Job document error: {0}")]
    JobDocument(#[from] serde_json::Error),

    /// The prepare step (run once before the tile loop) failed.
    #[error("Prepare step \"{command}\" failed with status {status}")]
    PrepareFailed {
        /// The command line that was attempted.
        command: String,
        /// Exit status description.
        status: String,
    },
}

/// Result type for runner operations.
pub type Result<T> = std::result::Result<T, RunnerError>;
