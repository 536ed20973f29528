//! Per-key result persistence
//!
//! When a run label is given, every successful result is written to
//! `<dir>/<key>_<label>` as a single line of JSON and its key is appended to
//! `<dir>/keys_<label>`. The comparator reads these files back later.

use crate::BenchError;
use serde_json::Value;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Path of the key index for `label` inside `dir`
pub fn index_path(dir: &Path, label: &str) -> PathBuf {
    dir.join(format!("keys_{}", label))
}

/// Path of the stored result for `key` under `label` inside `dir`
pub fn result_path(dir: &Path, key: &str, label: &str) -> PathBuf {
    dir.join(format!("{}_{}", key, label))
}

/// Writes successful results and their key index for one labelled run
///
/// A persister built without a label is disabled: `persist` does nothing
/// and no files are created.
pub struct ResultPersister {
    dir: PathBuf,
    label: Option<String>,
    index: Option<BufWriter<File>>,
    persisted: u64,
}

impl ResultPersister {
    /// Creates a persister, truncating any previous index for the same label
    ///
    /// # Errors
    ///
    /// Fails if the results directory or index file cannot be created. Only
    /// this initial setup is fatal; per-result failures are logged.
    pub fn new(dir: impl Into<PathBuf>, label: Option<&str>) -> Result<Self, BenchError> {
        let dir = dir.into();

        let index = match label {
            Some(label) => {
                fs::create_dir_all(&dir).map_err(|e| BenchError::file(&dir, e))?;
                let path = index_path(&dir, label);
                let file = File::create(&path).map_err(|e| BenchError::file(&path, e))?;
                tracing::info!("Persisting results to {}", path.display());
                Some(BufWriter::new(file))
            }
            None => None,
        };

        Ok(Self {
            dir,
            label: label.map(str::to_string),
            index,
            persisted: 0,
        })
    }

    /// Creates a persister that never writes
    pub fn disabled() -> Self {
        Self {
            dir: PathBuf::new(),
            label: None,
            index: None,
            persisted: 0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.index.is_some()
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Number of results written so far
    pub fn persisted(&self) -> u64 {
        self.persisted
    }

    /// Stores one result and records its key
    ///
    /// Failures are logged and swallowed: statistics collection must not stop
    /// because a result could not be saved.
    pub fn persist(&mut self, key: &str, link: &Value) {
        if let Err(e) = self.try_persist(key, link) {
            tracing::warn!(key = key, "Failed to persist result: {}", e);
        }
    }

    fn try_persist(&mut self, key: &str, link: &Value) -> Result<(), BenchError> {
        let (Some(index), Some(label)) = (self.index.as_mut(), self.label.as_deref()) else {
            return Ok(());
        };

        let path = result_path(&self.dir, key, label);
        let line = serde_json::to_string(link)?;
        fs::write(&path, line).map_err(|e| BenchError::file(&path, e))?;

        // Flushed per key so an interrupted run leaves a usable index
        writeln!(index, "{}", key)?;
        index.flush()?;

        self.persisted += 1;
        Ok(())
    }

    /// Flushes and closes the index file
    pub fn finish(&mut self) {
        if let Some(mut index) = self.index.take() {
            if let Err(e) = index.flush() {
                tracing::warn!("Failed to flush key index: {}", e);
            }
            tracing::debug!("Closed key index after {} results", self.persisted);
        }
    }
}

impl Drop for ResultPersister {
    fn drop(&mut self) {
        self.finish();
    }
}
