//! Job DTOs for communication with the job backend

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::job::{ArtifactRef, JobState};
use crate::domain::operation::OperationDirective;
use crate::domain::report::ExecutionReport;

/// Backend answer to an analysis submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitAnalysisResponse {
    /// Whether refined operations are already available
    pub refined: bool,
}

/// Refinement progress for a job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RefinementStatus {
    Pending,
    Ready { operations: Vec<OperationDirective> },
}

/// State report sent from the worker to the backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReport {
    pub job_id: Uuid,
    pub state: JobState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<ExecutionReport>,
}

/// Backend answer to an artifact upload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub artifact_ref: ArtifactRef,
}
