//! Completed-tiles checkpoint file.
//!
//! A plain UTF-8 text file, one tile identifier per line, newline
//! terminated, strictly append-only. Absence of the file means no tiles
//! have completed yet. The in-memory view is a set rebuilt from the file
//! on load, so duplicate lines on disk are harmless; they are tolerated
//! and never compacted.

use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::{Result, RunnerError};

/// The set of tile identifiers that have completed successfully, backed
/// by an append-only text file.
///
/// Written by a single runner process; each successful tile is appended
/// and fsynced before the next tile starts, so a killed run leaves only
/// whole lines behind.
#[derive(Debug)]
pub struct CheckpointSet {
    path: PathBuf,
    done: HashSet<String>,
    // Opened lazily on first append so a fully-skipped run never touches
    // the file.
    writer: Option<File>,
}

impl CheckpointSet {
    /// Load the checkpoint set from `path`.
    ///
    /// A missing file yields an empty set. A file that exists but is not
    /// UTF-8 text is treated as corrupt and aborts the run.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let done = match std::fs::read(&path) {
            Ok(bytes) => {
                let text = String::from_utf8(bytes).map_err(|_| {
                    RunnerError::CorruptCheckpoint { path: path.clone() }
                })?;
                text.lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(str::to_string)
                    .collect()
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => HashSet::new(),
            Err(err) => return Err(err.into()),
        };
        Ok(CheckpointSet {
            path,
            done,
            writer: None,
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True if `tile_id` has already completed.
    pub fn contains(&self, tile_id: &str) -> bool {
        self.done.contains(tile_id)
    }

    /// Number of distinct completed tiles.
    pub fn len(&self) -> usize {
        self.done.len()
    }

    /// True if no tile has completed yet.
    pub fn is_empty(&self) -> bool {
        self.done.is_empty()
    }

    /// Record `tile_id` as completed: append one line to the file, flush
    /// and sync it, then update the in-memory set.
    ///
    /// The file is only ever appended to; recording an identifier twice
    /// writes a second line, matching the tolerant on-disk contract.
    pub fn record(&mut self, tile_id: &str) -> Result<()> {
        if self.writer.is_none() {
            if let Some(parent) = self.path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)?;
            self.writer = Some(file);
        }
        // Invariant: writer is Some past this point.
        if let Some(file) = self.writer.as_mut() {
            file.write_all(tile_id.as_bytes())?;
            file.write_all(b"\n")?;
            file.flush()?;
            file.sync_data()?;
        }
        self.done.insert(tile_id.to_string());
        Ok(())
    }
}
