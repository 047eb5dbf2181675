//! Job-related API endpoints

use crate::BackendClient;
use crate::error::Result;
use remodel_core::domain::analysis::AnalysisResult;
use remodel_core::domain::job::{JobRecord, JobState, JobSummary};
use remodel_core::domain::log::LogEntry;
use remodel_core::domain::report::ExecutionReport;
use remodel_core::dto::job::{RefinementStatus, StatusReport, SubmitAnalysisResponse};
use uuid::Uuid;

impl BackendClient {
    // =============================================================================
    // Job Discovery
    // =============================================================================

    /// List jobs waiting for a worker
    ///
    /// # Returns
    /// Zero or more queued jobs with their command and input artifact
    pub async fn list_queued_jobs(&self) -> Result<Vec<JobSummary>> {
        let url = self.url(&["api", "jobs", "queued"])?;
        let response = self.client.get(url).send().await?;

        self.handle_response(response).await
    }

    /// Get the backend record of a job
    ///
    /// # Arguments
    /// * `job_id` - The job UUID
    pub async fn get_job(&self, job_id: Uuid) -> Result<JobRecord> {
        let url = self.url(&["api", "jobs", &job_id.to_string()])?;
        let response = self.client.get(url).send().await?;

        self.handle_response(response).await
    }

    /// List every job known to the backend
    pub async fn list_jobs(&self) -> Result<Vec<JobRecord>> {
        let url = self.url(&["api", "jobs"])?;
        let response = self.client.get(url).send().await?;

        self.handle_response(response).await
    }

    // =============================================================================
    // Analysis & Refinement
    // =============================================================================

    /// Submit the analysis snapshot of a job's model
    ///
    /// # Returns
    /// Whether refined operations are already available
    pub async fn submit_analysis(&self, job_id: Uuid, analysis: &AnalysisResult) -> Result<bool> {
        let url = self.url(&["api", "jobs", &job_id.to_string(), "analysis"])?;
        let response = self.client.post(url).json(analysis).send().await?;

        let body: SubmitAnalysisResponse = self.handle_response(response).await?;
        Ok(body.refined)
    }

    /// Check once whether refinement produced operations
    ///
    /// This does not wait; callers poll it with their own deadline.
    pub async fn get_operations(&self, job_id: Uuid) -> Result<RefinementStatus> {
        let url = self.url(&["api", "jobs", &job_id.to_string(), "operations"])?;
        let response = self.client.get(url).send().await?;

        self.handle_response(response).await
    }

    // =============================================================================
    // Status Reporting
    // =============================================================================

    /// Report a job's state, with an optional reason and execution report
    pub async fn report_status(
        &self,
        job_id: Uuid,
        state: JobState,
        reason: Option<String>,
        report: Option<ExecutionReport>,
    ) -> Result<()> {
        let url = self.url(&["api", "jobs", &job_id.to_string(), "status"])?;
        let response = self
            .client
            .put(url)
            .json(&StatusReport {
                job_id,
                state,
                reason,
                report,
            })
            .send()
            .await?;

        self.handle_empty_response(response).await
    }

    // =============================================================================
    // Job Logs
    // =============================================================================

    /// Get logs for a job
    pub async fn get_job_logs(&self, job_id: Uuid) -> Result<Vec<LogEntry>> {
        let url = self.url(&["api", "jobs", &job_id.to_string(), "logs"])?;
        let response = self.client.get(url).send().await?;

        self.handle_response(response).await
    }

    /// Send logs to the backend for a specific job
    ///
    /// # Arguments
    /// * `job_id` - The ID of the job these logs belong to
    /// * `entries` - The log entries to send
    pub async fn send_logs(&self, job_id: Uuid, entries: Vec<LogEntry>) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let url = self.url(&["api", "jobs", &job_id.to_string(), "logs"])?;
        let response = self.client.post(url).json(&entries).send().await?;

        self.handle_empty_response(response).await
    }
}
