//! Job domain types

use serde::{Deserialize, Serialize};
use std::fmt;

/// A job definition: the declarative computation graph submitted to a
/// backend for batch execution.
///
/// The raw bytes are kept alongside the parsed document so the copy placed
/// in the output directory is byte-for-byte identical to the input file.
#[derive(Debug, Clone)]
pub struct JobDefinition {
    /// Name of the definition, usually derived from the source file stem
    pub name: String,
    /// Parsed computation graph
    pub graph: serde_json::Value,
    raw: Vec<u8>,
}

impl JobDefinition {
    /// Create a definition from raw JSON bytes
    ///
    /// # Arguments
    /// * `name` - Name to identify this definition in records and reports
    /// * `raw` - The JSON document as read from disk
    pub fn new(name: impl Into<String>, raw: Vec<u8>) -> Result<Self, serde_json::Error> {
        let graph = serde_json::from_slice(&raw)?;
        Ok(Self {
            name: name.into(),
            graph,
            raw,
        })
    }

    /// The original bytes of the definition file
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }
}

/// Canonical remote job status
///
/// Backends report status under a handful of spellings; everything is
/// normalized into this closed set at the client boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Submitted,
    Queued,
    Running,
    Finished,
    Error,
    Canceled,
}

impl JobStatus {
    /// Normalize a backend status string into the canonical vocabulary
    ///
    /// Returns `None` for spellings outside the known set; callers decide
    /// whether that is a warning or an error.
    pub fn normalize(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "submitted" | "created" | "pending" => Some(Self::Submitted),
            "queued" => Some(Self::Queued),
            "running" | "processing" => Some(Self::Running),
            "finished" | "succeeded" | "success" | "done" => Some(Self::Finished),
            "error" | "failed" | "failure" => Some(Self::Error),
            "canceled" | "cancelled" | "interrupted" => Some(Self::Canceled),
            _ => None,
        }
    }

    /// Whether no further transition can occur from this status
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Error | Self::Canceled)
    }

    /// Canonical lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Finished => "finished",
            Self::Error => "error",
            Self::Canceled => "canceled",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
