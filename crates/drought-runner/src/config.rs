//! Run configuration.
//!
//! One YAML file per deployment describes where the grid and checkpoint
//! live, how the worker for each job family is launched, and how the
//! post-run OWS refresh is addressed. CLI flags override individual
//! fields. Everything has a serde default except the grid path and the
//! worker program.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::batch::{BatchConfig, PrepareStep};
use crate::job::{ArgStyle, JobKind, TimeWindow, WorkerSpec};
use crate::ows::{OwsRefresh, DEFAULT_OWS_CONTAINER};
use crate::{Result, RunnerError};

/// Worker command section of the run configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Program to execute per tile, e.g. `python3`.
    pub program: String,
    /// Leading arguments, e.g. `[baseline.py]`.
    #[serde(default)]
    pub args: Vec<String>,
    /// Tile handoff style; defaults per job family when omitted.
    #[serde(default)]
    pub arg_style: Option<ArgStyle>,
    /// Directory for generated job documents.
    #[serde(default)]
    pub job_dir: Option<PathBuf>,
    /// Monitoring month for z-normalization job documents.
    #[serde(default)]
    pub year_month: Option<String>,
}

/// A bare command, used for the optional prepare step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandConfig {
    /// Program to execute.
    pub program: String,
    /// Arguments to the program.
    #[serde(default)]
    pub args: Vec<String>,
}

/// OWS refresh section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwsConfig {
    /// Force the refresh on or off; defaults per job family when omitted.
    #[serde(default)]
    pub enabled: Option<bool>,
    /// Container name of the OWS instance.
    #[serde(default = "default_ows_container")]
    pub container: String,
}

impl Default for OwsConfig {
    fn default() -> Self {
        OwsConfig {
            enabled: None,
            container: default_ows_container(),
        }
    }
}

fn default_ows_container() -> String {
    DEFAULT_OWS_CONTAINER.to_string()
}

fn default_logs_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_backoff_secs() -> u64 {
    2
}

/// Full run configuration for one job family invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// GeoJSON processing-grid file.
    pub grid: PathBuf,
    /// Checkpoint file; derived from `logs_dir` and job family if unset.
    #[serde(default)]
    pub checkpoint: Option<PathBuf>,
    /// Root directory for per-run log files and derived checkpoints.
    #[serde(default = "default_logs_dir")]
    pub logs_dir: PathBuf,
    /// Worker command for the job family.
    pub worker: WorkerConfig,
    /// Seconds slept after a failed tile.
    #[serde(default = "default_backoff_secs")]
    pub backoff_secs: u64,
    /// Wall-clock budget per tile; unset means wait indefinitely.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Command run once before the loop, fatal on failure.
    #[serde(default)]
    pub prepare: Option<CommandConfig>,
    /// OWS refresh addressing and override.
    #[serde(default)]
    pub ows: OwsConfig,
}

impl RunConfig {
    /// Load and parse a YAML run configuration.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|err| RunnerError::Config {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        serde_yaml::from_str(&text).map_err(|err| RunnerError::Config {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
    }

    /// Checkpoint file for `kind`: the configured path, or
    /// `<logs_dir>/<family>/completed_tiles.txt`.
    pub fn checkpoint_path(&self, kind: JobKind) -> PathBuf {
        self.checkpoint.clone().unwrap_or_else(|| {
            self.logs_dir
                .join(kind.short_name())
                .join("completed_tiles.txt")
        })
    }

    /// Directory the per-run log file for `kind` is written into.
    pub fn log_dir(&self, kind: JobKind) -> PathBuf {
        self.logs_dir.join(kind.short_name())
    }

    /// Per-tile wall-clock budget, if configured.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Worker description for `kind`, applying family defaults.
    pub fn worker_spec(&self, kind: JobKind) -> WorkerSpec {
        WorkerSpec {
            program: self.worker.program.clone(),
            args: self.worker.args.clone(),
            arg_style: self.worker.arg_style.unwrap_or(kind.default_arg_style()),
            job_dir: self.worker.job_dir.clone(),
            window: self
                .worker
                .year_month
                .clone()
                .map(|year_month| TimeWindow { year_month }),
        }
    }

    /// Batch loop knobs for `kind`.
    pub fn batch_config(&self, kind: JobKind) -> BatchConfig {
        let ows_enabled = self.ows.enabled.unwrap_or(kind.triggers_ows());
        BatchConfig {
            backoff: Duration::from_secs(self.backoff_secs),
            prepare: self.prepare.clone().map(|cmd| PrepareStep {
                program: cmd.program,
                args: cmd.args,
            }),
            ows: ows_enabled.then(|| OwsRefresh::new(self.ows.container.clone())),
            max_attempts: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = "\
grid: anciliary/grid_20_v2.geojson
worker:
  program: python3
  args: [baseline.py]
";

    #[test]
    fn minimal_config_fills_defaults() {
        let config: RunConfig = serde_yaml::from_str(MINIMAL).expect("parse");
        assert_eq!(config.backoff_secs, 2);
        assert_eq!(config.timeout_secs, None);
        assert!(config.prepare.is_none());
        assert_eq!(config.ows.container, DEFAULT_OWS_CONTAINER);
        assert_eq!(
            config.checkpoint_path(JobKind::Baseline),
            PathBuf::from("logs/baseline/completed_tiles.txt")
        );
        assert_eq!(config.log_dir(JobKind::DemIngest), PathBuf::from("logs/dem"));
    }

    #[test]
    fn explicit_checkpoint_wins_over_derived_path() {
        let text = format!("{MINIMAL}checkpoint: state/done.txt\n");
        let config: RunConfig = serde_yaml::from_str(&text).expect("parse");
        assert_eq!(
            config.checkpoint_path(JobKind::Baseline),
            PathBuf::from("state/done.txt")
        );
    }

    #[test]
    fn worker_spec_applies_family_default_arg_style() {
        let config: RunConfig = serde_yaml::from_str(MINIMAL).expect("parse");
        assert_eq!(
            config.worker_spec(JobKind::Baseline).arg_style,
            ArgStyle::TileId
        );
        assert_eq!(
            config.worker_spec(JobKind::ZNorm).arg_style,
            ArgStyle::JobDocument
        );
    }

    #[test]
    fn ows_defaults_follow_job_family_and_can_be_forced() {
        let config: RunConfig = serde_yaml::from_str(MINIMAL).expect("parse");
        assert!(config.batch_config(JobKind::Baseline).ows.is_none());
        assert!(config.batch_config(JobKind::TcdIngest).ows.is_some());

        let forced = format!("{MINIMAL}ows:\n  enabled: true\n  container: ows-1\n");
        let config: RunConfig = serde_yaml::from_str(&forced).expect("parse");
        assert!(config.batch_config(JobKind::Baseline).ows.is_some());
    }

    #[test]
    fn full_config_parses() {
        let text = "\
grid: grid.geojson
checkpoint: done.txt
logs_dir: /var/log/drought
worker:
  program: python3
  args: [z_normalization.py]
  arg_style: job-document
  job_dir: jobs
  year_month: \"2024-07\"
backoff_secs: 5
timeout_secs: 7200
prepare:
  program: python3
  args: [dem_ingestion.py]
ows:
  enabled: false
";
        let config: RunConfig = serde_yaml::from_str(text).expect("parse");
        assert_eq!(config.timeout(), Some(Duration::from_secs(7200)));
        let spec = config.worker_spec(JobKind::ZNorm);
        assert_eq!(spec.window.expect("window").year_month, "2024-07");
        assert!(config.batch_config(JobKind::DemIngest).ows.is_none());
        assert!(config.batch_config(JobKind::DemIngest).prepare.is_some());
    }

    #[test]
    fn unreadable_config_is_a_config_error() {
        let err = RunConfig::load("/nonexistent/run.yaml").unwrap_err();
        assert!(matches!(err, RunnerError::Config { .. }));
    }
}
