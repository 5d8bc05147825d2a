//! Per-run logging lifecycle.
//!
//! Installed once at run start: a console layer plus a per-run log file
//! named `<prefix>_<timestamp>.log` under the family's log directory.
//! The returned [`LoggingGuard`] marks the lifecycle explicitly — keep it
//! alive for the duration of the run; the file handle is owned by the
//! subscriber and every line is flushed as it is written.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::Result;

/// Handle for an installed per-run logging setup.
#[derive(Debug)]
pub struct LoggingGuard {
    path: PathBuf,
}

impl LoggingGuard {
    /// Path of the per-run log file.
    pub fn log_path(&self) -> &Path {
        &self.path
    }
}

/// Install the run's logging: stdout plus a timestamped file under
/// `logs_dir`, filtered by `RUST_LOG` (default `info`).
///
/// Failure to create the directory or the file is fatal to the run. A
/// subscriber installed earlier in the process (tests) is left in place.
pub fn init_logging<P: AsRef<Path>>(logs_dir: P, prefix: &str) -> Result<LoggingGuard> {
    let logs_dir = logs_dir.as_ref();
    std::fs::create_dir_all(logs_dir)?;

    let stamp = chrono::Local::now().format("%Y%m%dT%H%M%S");
    let path = logs_dir.join(format!("{prefix}_{stamp}.log"));
    let file = Arc::new(File::create(&path)?);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stdout))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(file),
        )
        .try_init();

    Ok(LoggingGuard { path })
}

/// Console-only logging for standalone subcommands (`ows-update`).
pub fn init_console_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stdout))
        .try_init();
}
