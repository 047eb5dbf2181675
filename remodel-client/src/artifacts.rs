//! Artifact transfer endpoints

use std::path::Path;

use crate::BackendClient;
use crate::error::{ClientError, Result};
use remodel_core::domain::job::ArtifactRef;
use remodel_core::dto::job::UploadResponse;
use reqwest::multipart::{Form, Part};
use tracing::debug;
use uuid::Uuid;

impl BackendClient {
    /// Download an artifact into a local file
    ///
    /// # Arguments
    /// * `artifact` - Reference of the stored artifact
    /// * `dest` - Local path to write; parent directories must exist
    ///
    /// # Returns
    /// Number of bytes written
    pub async fn download_artifact(&self, artifact: &ArtifactRef, dest: &Path) -> Result<u64> {
        let url = self.url(&["api", "artifacts", &artifact.0])?;
        let response = self.client.get(url).send().await?;
        let response = Self::check_status(response).await?;

        let bytes = response.bytes().await?;
        tokio::fs::write(dest, &bytes).await?;

        debug!("Downloaded {} ({} bytes) to {}", artifact, bytes.len(), dest.display());
        Ok(bytes.len() as u64)
    }

    /// Upload a job's result artifact
    ///
    /// The file is sent as the multipart field `file`, under the job's id.
    ///
    /// # Returns
    /// The reference the backend stored the artifact under
    pub async fn upload_artifact(&self, job_id: Uuid, path: &Path) -> Result<ArtifactRef> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                ClientError::InvalidRequest(format!("not a file path: {}", path.display()))
            })?
            .to_string();

        let data = tokio::fs::read(path).await?;
        let size = data.len();
        let part = Part::bytes(data)
            .file_name(file_name)
            .mime_str("application/octet-stream")?;
        let form = Form::new().part("file", part);

        let url = self.url(&["api", "jobs", &job_id.to_string(), "artifact"])?;
        let response = self.client.post(url).multipart(form).send().await?;

        let body: UploadResponse = self.handle_response(response).await?;
        debug!("Uploaded {} bytes for job {} as {}", size, job_id, body.artifact_ref);
        Ok(body.artifact_ref)
    }
}
