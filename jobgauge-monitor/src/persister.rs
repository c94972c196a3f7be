//! Result persistence
//!
//! Writes the run record and its companion files into the run's output
//! directory. The record is written through a [`PersistGuard`], a scoped
//! guard whose `Drop` implementation persists whatever has been collected
//! so far - so a `results.json` exists for every invocation, however far
//! execution progressed.

use jobgauge_core::domain::job::JobDefinition;
use jobgauge_core::domain::run::RunRecord;
use std::fs;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info};

/// File name of the persisted run record
pub const RESULTS_FILE: &str = "results.json";
/// File name of the job definition copy
pub const DEFINITION_FILE: &str = "processgraph.json";
/// File name of the remote diagnostics dump
pub const DIAGNOSTICS_FILE: &str = "job_logs.json";

/// Errors raised while writing run artifacts
///
/// Persisting the record itself is best-effort and never escalated; the
/// only fatal case is failing to acquire the output directory before a
/// record exists.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to encode run record: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Writes run artifacts into one output directory
#[derive(Debug, Clone)]
pub struct ResultPersister {
    output_dir: PathBuf,
}

impl ResultPersister {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Where the run record will be written
    pub fn results_path(&self) -> PathBuf {
        self.output_dir.join(RESULTS_FILE)
    }

    /// Create the output directory and place a byte-for-byte copy of the
    /// job definition in it, independent of later success or failure
    ///
    /// Returns the path of the copy.
    pub fn prepare(&self, definition: &JobDefinition) -> Result<PathBuf, PersistenceError> {
        fs::create_dir_all(&self.output_dir).map_err(|source| PersistenceError::CreateDir {
            path: self.output_dir.clone(),
            source,
        })?;

        let copy_path = self.output_dir.join(DEFINITION_FILE);
        fs::write(&copy_path, definition.raw()).map_err(|source| PersistenceError::Write {
            path: copy_path.clone(),
            source,
        })?;

        Ok(copy_path)
    }

    /// Write the run record as pretty-printed JSON
    pub fn persist(&self, record: &RunRecord) -> Result<PathBuf, PersistenceError> {
        let path = self.results_path();
        let body = serde_json::to_vec_pretty(record)?;
        fs::write(&path, body).map_err(|source| PersistenceError::Write {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }

    /// Write remote job diagnostics alongside the record
    pub fn persist_diagnostics(
        &self,
        diagnostics: &serde_json::Value,
    ) -> Result<PathBuf, PersistenceError> {
        let path = self.output_dir.join(DIAGNOSTICS_FILE);
        let body = serde_json::to_vec_pretty(diagnostics)?;
        fs::write(&path, body).map_err(|source| PersistenceError::Write {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}

/// Scoped ownership of a run record that guarantees persistence
///
/// The monitor mutates the record through this guard. `finish` persists
/// and hands the record back; if the guard is instead dropped mid-run
/// (early return, panic), `Drop` persists whatever was collected, with a
/// wall-clock total as a fallback. Persistence failures are logged, never
/// raised.
pub struct PersistGuard {
    record: Option<RunRecord>,
    persister: ResultPersister,
}

impl PersistGuard {
    pub fn new(persister: ResultPersister, record: RunRecord) -> Self {
        Self {
            record: Some(record),
            persister,
        }
    }

    pub fn persister(&self) -> &ResultPersister {
        &self.persister
    }

    /// Persist the record and return it to the caller
    pub fn finish(mut self) -> RunRecord {
        let record = self.record.take().expect("guard already finished");
        match self.persister.persist(&record) {
            Ok(path) => info!(path = %path.display(), "run record persisted"),
            Err(e) => error!(error = %e, "failed to persist run record"),
        }
        record
    }
}

impl Deref for PersistGuard {
    type Target = RunRecord;

    fn deref(&self) -> &RunRecord {
        self.record.as_ref().expect("guard already finished")
    }
}

impl DerefMut for PersistGuard {
    fn deref_mut(&mut self) -> &mut RunRecord {
        self.record.as_mut().expect("guard already finished")
    }
}

impl Drop for PersistGuard {
    fn drop(&mut self) {
        let Some(mut record) = self.record.take() else {
            return;
        };
        if record.total_time == 0.0 {
            let elapsed = (chrono::Utc::now() - record.started_at).num_milliseconds();
            record.total_time = (elapsed.max(0) as f64) / 1000.0;
        }
        if let Err(e) = self.persister.persist(&record) {
            error!(error = %e, "failed to persist run record during unwind");
        }
    }
}
