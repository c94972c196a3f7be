//! Job lifecycle operations against the backend REST API

use crate::error::{BackendError, Result};
use crate::{BackendConnection, HttpBackendClient, error_body};
use async_trait::async_trait;
use jobgauge_core::domain::job::JobDefinition;
use jobgauge_core::dto::job::{CreateJobRequest, JobCreated, JobInfo, ResultsDocument};
use reqwest::{Method, StatusCode};
use std::path::Path;
use tracing::{debug, info};

impl HttpBackendClient {
    /// Extract a job id from a 201 Location header, if present
    fn job_id_from_location(response: &reqwest::Response) -> Option<String> {
        response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|loc| loc.rsplit('/').find(|s| !s.is_empty()))
            .map(|s| s.to_string())
    }

    /// Pick a safe file name for an asset, ignoring any path components
    fn asset_file_name(name: &str, index: usize) -> String {
        Path::new(name)
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.to_string())
            .unwrap_or_else(|| format!("asset_{index}"))
    }
}

#[async_trait]
impl BackendConnection for HttpBackendClient {
    fn backend_url(&self) -> &str {
        self.base_url()
    }

    async fn submit(&self, definition: &JobDefinition) -> Result<String> {
        let url = format!("{}/jobs", self.base_url());
        let body = CreateJobRequest {
            process: definition.graph.clone(),
        };
        let response = self.request(Method::POST, &url).json(&body).send().await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(BackendError::auth(status.as_u16(), error_body(response).await));
        }
        if !status.is_success() {
            return Err(BackendError::submission(
                status.as_u16(),
                error_body(response).await,
            ));
        }

        // Backends answer with either a Location header or a JSON body
        if let Some(id) = Self::job_id_from_location(&response) {
            debug!(job_id = %id, "job id taken from Location header");
            return Ok(id);
        }

        let created: JobCreated = self.parse_json(response).await?;
        Ok(created.id)
    }

    async fn start(&self, job_id: &str) -> Result<()> {
        let url = format!("{}/jobs/{}/results", self.base_url(), job_id);
        let response = self.request(Method::POST, &url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::remote_state(
                status.as_u16(),
                error_body(response).await,
            ));
        }

        Ok(())
    }

    async fn poll_status(&self, job_id: &str) -> Result<String> {
        let url = format!("{}/jobs/{}", self.base_url(), job_id);
        let response = self.request(Method::GET, &url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Protocol(format!(
                "status read failed (status {}): {}",
                status.as_u16(),
                error_body(response).await
            )));
        }

        let info: JobInfo = self.parse_json(response).await?;
        Ok(info.status)
    }

    async fn fetch_and_download(&self, job_id: &str, destination: &Path) -> Result<usize> {
        let url = format!("{}/jobs/{}/results", self.base_url(), job_id);
        let response = self.request(Method::GET, &url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Download(format!(
                "result listing failed (status {}): {}",
                status.as_u16(),
                error_body(response).await
            )));
        }

        let document: ResultsDocument = self.parse_json(response).await?;

        tokio::fs::create_dir_all(destination)
            .await
            .map_err(|e| BackendError::Download(format!("cannot create {destination:?}: {e}")))?;

        let mut written = 0usize;
        for (index, (name, asset)) in document.assets.iter().enumerate() {
            let file_name = Self::asset_file_name(name, index);
            let target = destination.join(&file_name);

            debug!(asset = %name, href = %asset.href, "downloading result asset");

            let asset_response = self
                .request(Method::GET, &asset.href)
                .send()
                .await
                .map_err(|e| BackendError::Download(format!("fetching {name}: {e}")))?;

            if !asset_response.status().is_success() {
                return Err(BackendError::Download(format!(
                    "fetching {name}: status {}",
                    asset_response.status().as_u16()
                )));
            }

            let bytes = asset_response
                .bytes()
                .await
                .map_err(|e| BackendError::Download(format!("reading {name}: {e}")))?;

            tokio::fs::write(&target, &bytes)
                .await
                .map_err(|e| BackendError::Download(format!("writing {target:?}: {e}")))?;

            written += 1;
        }

        info!(job_id, files = written, "downloaded result artifacts");
        Ok(written)
    }

    async fn fetch_diagnostics(&self, job_id: &str) -> Result<serde_json::Value> {
        let url = format!("{}/jobs/{}/logs", self.base_url(), job_id);
        let response = self.request(Method::GET, &url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Protocol(format!(
                "log read failed (status {}): {}",
                status.as_u16(),
                error_body(response).await
            )));
        }

        self.parse_json(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_file_name_strips_path_components() {
        assert_eq!(
            HttpBackendClient::asset_file_name("subdir/result.tif", 0),
            "result.tif"
        );
        assert_eq!(
            HttpBackendClient::asset_file_name("result.nc", 3),
            "result.nc"
        );
    }

    #[test]
    fn test_asset_file_name_falls_back_to_index() {
        assert_eq!(HttpBackendClient::asset_file_name("..", 2), "asset_2");
    }
}
