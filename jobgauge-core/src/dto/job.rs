//! Job DTOs for the backend REST surface

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Request body for submitting a new batch job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateJobRequest {
    /// The computation graph document
    pub process: serde_json::Value,
}

/// Response to a successful job submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobCreated {
    pub id: String,
}

/// Job metadata as reported by a status read
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobInfo {
    #[serde(default)]
    pub id: Option<String>,
    /// Raw backend status string; normalized by the caller
    pub status: String,
    #[serde(default)]
    pub progress: Option<f64>,
}

/// Listing of downloadable result artifacts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultsDocument {
    #[serde(default)]
    pub assets: HashMap<String, ResultAsset>,
}

/// One downloadable result artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultAsset {
    pub href: String,
    #[serde(default, rename = "type")]
    pub media_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_results_document_tolerates_missing_assets() {
        let doc: ResultsDocument = serde_json::from_str("{}").unwrap();
        assert!(doc.assets.is_empty());
    }

    #[test]
    fn test_job_info_parses_minimal_body() {
        let info: JobInfo = serde_json::from_str(r#"{"status": "queued"}"#).unwrap();
        assert_eq!(info.status, "queued");
        assert!(info.id.is_none());
        assert!(info.progress.is_none());
    }
}
