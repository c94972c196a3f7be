//! Run record types
//!
//! A `RunRecord` is the persisted outcome of monitoring one job from
//! submission to a terminal state or timeout. It is written exactly once,
//! as `results.json` in the run's output directory, and read by the
//! statistics and report tooling downstream.

use chrono::{DateTime, Utc};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::PathBuf;

use crate::domain::job::JobStatus;

/// Final outcome of a monitored run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FinalOutcome {
    Success,
    Failed,
}

impl fmt::Display for FinalOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("success"),
            Self::Failed => f.write_str("failed"),
        }
    }
}

/// Ordered mapping from status to the wall-clock instant it was first
/// observed. Insertion order is observation order and a status appears at
/// most once; later re-observations are ignored.
///
/// Serializes as a JSON object whose keys preserve insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusHistory {
    entries: Vec<(JobStatus, DateTime<Utc>)>,
}

impl StatusHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the first observation of `status`. Returns `false` if the
    /// status was already present (re-observation, not re-recorded).
    pub fn record(&mut self, status: JobStatus, at: DateTime<Utc>) -> bool {
        if self.contains(status) {
            return false;
        }
        self.entries.push((status, at));
        true
    }

    pub fn contains(&self, status: JobStatus) -> bool {
        self.entries.iter().any(|(s, _)| *s == status)
    }

    pub fn first_observed(&self, status: JobStatus) -> Option<DateTime<Utc>> {
        self.entries
            .iter()
            .find(|(s, _)| *s == status)
            .map(|(_, at)| *at)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(JobStatus, DateTime<Utc>)> {
        self.entries.iter()
    }
}

impl Serialize for StatusHistory {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (status, at) in &self.entries {
            map.serialize_entry(status.as_str(), at)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for StatusHistory {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct HistoryVisitor;

        impl<'de> Visitor<'de> for HistoryVisitor {
            type Value = StatusHistory;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of job status to timestamp")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut history = StatusHistory::new();
                while let Some((key, at)) = map.next_entry::<String, DateTime<Utc>>()? {
                    let status = JobStatus::normalize(&key).ok_or_else(|| {
                        serde::de::Error::custom(format!("unknown job status: {key}"))
                    })?;
                    history.record(status, at);
                }
                Ok(history)
            }
        }

        deserializer.deserialize_map(HistoryVisitor)
    }
}

/// Persisted outcome of monitoring one job
///
/// Owned exclusively by the lifecycle monitor while the run is in flight,
/// written once at the end of the lifecycle and never mutated afterwards.
/// Every duration is in seconds; optional durations are absent (not zero)
/// when the corresponding phase never completed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub backend_url: String,
    /// Host portion of the backend URL
    pub backend_name: String,
    /// Name of the submitted job definition
    pub job_name: String,
    /// Backend-assigned id; null when failure occurred before submission
    pub job_id: Option<String>,
    /// Last observed normalized status
    pub status: Option<JobStatus>,
    #[serde(default)]
    pub status_history: StatusHistory,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submit_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_start_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_time: Option<f64>,
    /// Wall-clock length of the whole run; always present
    pub total_time: f64,
    pub outcome: FinalOutcome,
    /// Human-readable cause; present iff `outcome` is `failed`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub output_directory: PathBuf,
    /// Where the byte-for-byte copy of the job definition was placed
    pub job_definition_path: PathBuf,
}

impl RunRecord {
    /// Create a fresh record at the start of a lifecycle
    ///
    /// The outcome starts as `failed`: a run only becomes a success once
    /// the whole lifecycle, download included, has completed.
    pub fn new(
        backend_url: impl Into<String>,
        backend_name: impl Into<String>,
        job_name: impl Into<String>,
        started_at: DateTime<Utc>,
        output_directory: PathBuf,
        job_definition_path: PathBuf,
    ) -> Self {
        Self {
            backend_url: backend_url.into(),
            backend_name: backend_name.into(),
            job_name: job_name.into(),
            job_id: None,
            status: None,
            status_history: StatusHistory::new(),
            started_at,
            submit_time: None,
            job_start_time: None,
            execution_time: None,
            download_time: None,
            queue_time: None,
            processing_time: None,
            total_time: 0.0,
            outcome: FinalOutcome::Failed,
            error: None,
            output_directory,
            job_definition_path,
        }
    }

    /// Mark the run failed with a human-readable cause
    pub fn mark_failed(&mut self, detail: impl Into<String>) {
        self.outcome = FinalOutcome::Failed;
        self.error = Some(detail.into());
    }

    /// Mark the run successful, clearing any stale error detail
    pub fn mark_success(&mut self) {
        self.outcome = FinalOutcome::Success;
        self.error = None;
    }
}
