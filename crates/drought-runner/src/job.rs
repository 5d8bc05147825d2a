//! Job families and worker invocation descriptions.
//!
//! Every job family (baseline statistics, z-normalization, DEM ingest,
//! TCD ingest) is dispatched the same way: one external worker process
//! per tile. The families differ only in which worker command runs, how
//! the tile is handed to it, and whether the OWS catalogue is refreshed
//! afterwards.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use drought_grid::Tile;

use crate::Result;

/// The batch job families of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobKind {
    /// Baseline mean/std computation over the reference period.
    Baseline,
    /// Z-normalization of monthly composites against the baseline.
    ZNorm,
    /// Copernicus DEM elevation/aspect ingestion.
    DemIngest,
    /// Tree-canopy-density raster ingestion.
    TcdIngest,
}

impl JobKind {
    /// Short name used for log and checkpoint subdirectories.
    pub fn short_name(&self) -> &'static str {
        match self {
            JobKind::Baseline => "baseline",
            JobKind::ZNorm => "znorm",
            JobKind::DemIngest => "dem",
            JobKind::TcdIngest => "tcd",
        }
    }

    /// Whether a run of this family refreshes the OWS catalogue at the
    /// end. Ingestion runs publish new products; baseline and z-norm
    /// outputs are picked up by the ingestion-side refresh.
    pub fn triggers_ows(&self) -> bool {
        matches!(self, JobKind::DemIngest | JobKind::TcdIngest)
    }

    /// How the worker for this family expects to receive its tile.
    pub fn default_arg_style(&self) -> ArgStyle {
        match self {
            JobKind::ZNorm => ArgStyle::JobDocument,
            _ => ArgStyle::TileId,
        }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.short_name())
    }
}

/// How a tile is passed to the worker process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArgStyle {
    /// Append `--tile <id>` to the worker command.
    TileId,
    /// Write a single-feature GeoJSON job document and append
    /// `--geojson <path>`.
    JobDocument,
}

/// Monitoring window carried into z-normalization job documents, as a
/// `YYYY-MM` month string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Month under normalization, e.g. "2024-07".
    pub year_month: String,
}

/// Description of the external worker command for one job family.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerSpec {
    /// Program to execute, e.g. `python3`.
    pub program: String,
    /// Leading arguments, e.g. `["baseline.py"]`.
    #[serde(default)]
    pub args: Vec<String>,
    /// How the tile is appended to the command line.
    pub arg_style: ArgStyle,
    /// Directory for generated job documents (JobDocument style only).
    #[serde(default)]
    pub job_dir: Option<PathBuf>,
    /// Monitoring window written into job documents.
    #[serde(default)]
    pub window: Option<TimeWindow>,
}

impl WorkerSpec {
    /// A worker invoked as `program args... --tile <id>`.
    pub fn tile_id(program: impl Into<String>, args: Vec<String>) -> Self {
        WorkerSpec {
            program: program.into(),
            args,
            arg_style: ArgStyle::TileId,
            job_dir: None,
            window: None,
        }
    }

    /// Full argument vector for one tile, including the tile handoff.
    ///
    /// For the JobDocument style the document is written (one file per
    /// tile, overwritten on retry) before the path is appended.
    pub fn build_args(&self, tile: &Tile) -> Result<Vec<String>> {
        let mut argv = self.args.clone();
        match self.arg_style {
            ArgStyle::TileId => {
                argv.push("--tile".to_string());
                argv.push(tile.id().to_string());
            }
            ArgStyle::JobDocument => {
                let path = self.write_job_document(tile)?;
                argv.push("--geojson".to_string());
                argv.push(path.to_string_lossy().into_owned());
            }
        }
        Ok(argv)
    }

    /// Write the single-feature GeoJSON job document for `tile`.
    fn write_job_document(&self, tile: &Tile) -> Result<PathBuf> {
        let dir = self
            .job_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("jobs"));
        std::fs::create_dir_all(&dir)?;

        let mut properties = serde_json::Map::new();
        properties.insert(
            "tile_id".to_string(),
            serde_json::Value::String(tile.id().to_string()),
        );
        if let Some(window) = &self.window {
            properties.insert(
                "year_month".to_string(),
                serde_json::Value::String(window.year_month.clone()),
            );
        }

        let doc = serde_json::json!({
            "type": "Feature",
            "properties": properties,
            "geometry": tile.geometry(),
        });

        let path = dir.join(job_document_name(tile.id(), self.window.as_ref()));
        std::fs::write(&path, serde_json::to_vec_pretty(&doc)?)?;
        Ok(path)
    }
}

fn job_document_name(tile_id: &str, window: Option<&TimeWindow>) -> String {
    match window {
        Some(w) => format!("{}_{}.geojson", tile_id, w.year_month),
        None => format!("{}.geojson", tile_id),
    }
}

/// Render a command line for logging.
pub fn display_command(program: &str, args: &[String]) -> String {
    let mut line = program.to_string();
    for arg in args {
        line.push(' ');
        line.push_str(arg);
    }
    line
}
