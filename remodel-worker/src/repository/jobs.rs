//! Jobs repository
//!
//! Handles communication with the backend for job-related operations:
//! - Discovering queued jobs and checking for cancellation
//! - Moving artifacts in and out of the job workspace
//! - Submitting analysis and waiting for refined operations
//! - Reporting state transitions

use async_trait::async_trait;
use remodel_client::{BackendClient, RefinementStatus, Result};
use remodel_core::domain::analysis::AnalysisResult;
use remodel_core::domain::job::{ArtifactRef, JobRecord, JobState, JobSummary};
use remodel_core::domain::operation::OperationDirective;
use remodel_core::domain::report::ExecutionReport;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use crate::error::JobError;

/// Timing of the bounded wait for refined operations
#[derive(Debug, Clone, Copy)]
pub struct RefinementWait {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

/// Repository trait for job-related operations with the backend
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Fetches jobs waiting for a worker
    async fn list_queued_jobs(&self) -> Result<Vec<JobSummary>>;

    /// Fetches the backend record of a job, used for cancellation checks
    async fn get_job(&self, job_id: Uuid) -> Result<JobRecord>;

    /// Downloads an artifact to `dest`
    async fn download(&self, artifact: &ArtifactRef, dest: &Path) -> Result<()>;

    /// Submits the analysis snapshot; returns whether operations are already refined
    async fn submit_analysis(&self, job_id: Uuid, analysis: &AnalysisResult) -> Result<bool>;

    /// Checks once whether refined operations are available
    async fn poll_operations(&self, job_id: Uuid) -> Result<RefinementStatus>;

    /// Uploads the result artifact of a job
    async fn upload(&self, job_id: Uuid, path: &Path) -> Result<ArtifactRef>;

    /// Reports a state transition, with the failure reason and report when known
    async fn report_status(
        &self,
        job_id: Uuid,
        state: JobState,
        reason: Option<String>,
        report: Option<ExecutionReport>,
    ) -> Result<()>;

    /// Waits for refined operations, bounded by `wait.timeout`
    ///
    /// When `refined` is already true the first check happens immediately,
    /// otherwise after one poll interval.
    async fn fetch_operations(
        &self,
        job_id: Uuid,
        refined: bool,
        wait: RefinementWait,
    ) -> std::result::Result<Vec<OperationDirective>, JobError> {
        let poll = async {
            let mut ready_hint = refined;
            loop {
                if !ready_hint {
                    tokio::time::sleep(wait.poll_interval).await;
                }
                ready_hint = false;

                match self.poll_operations(job_id).await {
                    Ok(RefinementStatus::Ready { operations }) => return Ok(operations),
                    Ok(RefinementStatus::Pending) => {
                        debug!("Operations for job {} not refined yet", job_id)
                    }
                    Err(err) => return Err(JobError::from(err)),
                }
            }
        };

        match tokio::time::timeout(wait.timeout, poll).await {
            Ok(result) => result,
            Err(_) => Err(JobError::RefinementTimeout(wait.timeout)),
        }
    }
}

/// HTTP implementation of JobRepository
pub struct HttpJobRepository {
    client: Arc<BackendClient>,
}

impl HttpJobRepository {
    pub fn new(client: Arc<BackendClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl JobRepository for HttpJobRepository {
    async fn list_queued_jobs(&self) -> Result<Vec<JobSummary>> {
        self.client.list_queued_jobs().await
    }

    async fn get_job(&self, job_id: Uuid) -> Result<JobRecord> {
        self.client.get_job(job_id).await
    }

    async fn download(&self, artifact: &ArtifactRef, dest: &Path) -> Result<()> {
        self.client.download_artifact(artifact, dest).await?;
        Ok(())
    }

    async fn submit_analysis(&self, job_id: Uuid, analysis: &AnalysisResult) -> Result<bool> {
        self.client.submit_analysis(job_id, analysis).await
    }

    async fn poll_operations(&self, job_id: Uuid) -> Result<RefinementStatus> {
        self.client.get_operations(job_id).await
    }

    async fn upload(&self, job_id: Uuid, path: &Path) -> Result<ArtifactRef> {
        self.client.upload_artifact(job_id, path).await
    }

    async fn report_status(
        &self,
        job_id: Uuid,
        state: JobState,
        reason: Option<String>,
        report: Option<ExecutionReport>,
    ) -> Result<()> {
        self.client
            .report_status(job_id, state, reason, report)
            .await
    }
}
