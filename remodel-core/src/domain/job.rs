//! Job domain types

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::analysis::AnalysisResult;
use crate::domain::operation::OperationDirective;
use crate::domain::report::ExecutionReport;

/// Opaque reference to a file held by the backend
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactRef(pub String);

impl std::fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Job lifecycle state
///
/// States form a single chain; `Failed` is reachable from every
/// non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Queued,
    Downloading,
    Analyzing,
    AwaitingRefinement,
    Executing,
    Uploading,
    Completed,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }

    /// The state that follows this one on the success path
    pub fn next(self) -> Option<JobState> {
        match self {
            JobState::Queued => Some(JobState::Downloading),
            JobState::Downloading => Some(JobState::Analyzing),
            JobState::Analyzing => Some(JobState::AwaitingRefinement),
            JobState::AwaitingRefinement => Some(JobState::Executing),
            JobState::Executing => Some(JobState::Uploading),
            JobState::Uploading => Some(JobState::Completed),
            JobState::Completed | JobState::Failed => None,
        }
    }

    pub fn can_transition_to(self, target: JobState) -> bool {
        if self.is_terminal() {
            return false;
        }
        target == JobState::Failed || self.next() == Some(target)
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobState::Queued => write!(f, "Queued"),
            JobState::Downloading => write!(f, "Downloading"),
            JobState::Analyzing => write!(f, "Analyzing"),
            JobState::AwaitingRefinement => write!(f, "AwaitingRefinement"),
            JobState::Executing => write!(f, "Executing"),
            JobState::Uploading => write!(f, "Uploading"),
            JobState::Completed => write!(f, "Completed"),
            JobState::Failed => write!(f, "Failed"),
        }
    }
}

/// A queued job as announced by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSummary {
    pub id: Uuid,
    pub command: String,
    pub input_artifact: ArtifactRef,
    #[serde(default = "first_attempt")]
    pub attempt: u32,
}

fn first_attempt() -> u32 {
    1
}

/// Backend record of a job
///
/// Used by the worker for cancellation checks and by the CLI for inspection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: Uuid,
    pub command: String,
    pub state: JobState,
    #[serde(default = "first_attempt")]
    pub attempt: u32,
    pub input_artifact: ArtifactRef,
    #[serde(default)]
    pub output_artifact: Option<ArtifactRef>,
    #[serde(default)]
    pub cancel_requested: bool,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub analysis: Option<AnalysisResult>,
    #[serde(default)]
    pub operations: Vec<OperationDirective>,
    #[serde(default)]
    pub report: Option<ExecutionReport>,
    #[serde(default)]
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Violation of the job lifecycle rules
#[derive(Debug, Clone, PartialEq, Error)]
pub enum JobTransitionError {
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition { from: JobState, to: JobState },

    #[error("analysis already recorded for this job")]
    AnalysisAlreadySet,

    #[error("operations already fetched for attempt {0}")]
    OperationsAlreadySet(u32),

    #[error("only failed jobs can be retried (current: {0})")]
    NotRetryable(JobState),
}

/// A job while it is owned by a worker
///
/// The worker holds the only copy for the lifetime of an attempt. State only
/// moves forward; [`Job::retry`] is the single way back to `Queued`.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: Uuid,
    pub command: String,
    pub input_artifact: ArtifactRef,
    pub output_artifact: Option<ArtifactRef>,
    state: JobState,
    attempt: u32,
    analysis: Option<AnalysisResult>,
    operations: Option<Vec<OperationDirective>>,
    report: ExecutionReport,
    failure_reason: Option<String>,
}

impl Job {
    pub fn new(summary: JobSummary) -> Self {
        Self {
            id: summary.id,
            command: summary.command,
            input_artifact: summary.input_artifact,
            output_artifact: None,
            state: JobState::Queued,
            attempt: summary.attempt.max(1),
            analysis: None,
            operations: None,
            report: ExecutionReport::new(),
            failure_reason: None,
        }
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn analysis(&self) -> Option<&AnalysisResult> {
        self.analysis.as_ref()
    }

    pub fn operations(&self) -> &[OperationDirective] {
        self.operations.as_deref().unwrap_or(&[])
    }

    pub fn report(&self) -> &ExecutionReport {
        &self.report
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    /// Moves to the next stage
    pub fn advance(&mut self, target: JobState) -> Result<(), JobTransitionError> {
        if !self.state.can_transition_to(target) {
            return Err(JobTransitionError::InvalidTransition {
                from: self.state,
                to: target,
            });
        }
        self.state = target;
        Ok(())
    }

    /// Marks the job failed with a reason
    pub fn fail(&mut self, reason: impl Into<String>) -> Result<(), JobTransitionError> {
        self.advance(JobState::Failed)?;
        self.failure_reason = Some(reason.into());
        Ok(())
    }

    pub fn record_analysis(&mut self, analysis: AnalysisResult) -> Result<(), JobTransitionError> {
        if self.analysis.is_some() {
            return Err(JobTransitionError::AnalysisAlreadySet);
        }
        self.analysis = Some(analysis);
        Ok(())
    }

    pub fn set_operations(
        &mut self,
        operations: Vec<OperationDirective>,
    ) -> Result<(), JobTransitionError> {
        if self.operations.is_some() {
            return Err(JobTransitionError::OperationsAlreadySet(self.attempt));
        }
        self.operations = Some(operations);
        Ok(())
    }

    pub fn set_report(&mut self, report: ExecutionReport) {
        self.report = report;
    }

    /// Resets a failed job to `Queued` for a fresh attempt
    pub fn retry(&mut self) -> Result<(), JobTransitionError> {
        if self.state != JobState::Failed {
            return Err(JobTransitionError::NotRetryable(self.state));
        }
        self.state = JobState::Queued;
        self.attempt += 1;
        self.analysis = None;
        self.operations = None;
        self.report = ExecutionReport::new();
        self.failure_reason = None;
        self.output_artifact = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> Job {
        Job::new(JobSummary {
            id: Uuid::new_v4(),
            command: "make it lighter".to_string(),
            input_artifact: ArtifactRef("input.json".to_string()),
            attempt: 1,
        })
    }

    #[test]
    fn test_happy_path_transitions() {
        let mut job = job();
        let mut state = job.state();
        while let Some(next) = state.next() {
            job.advance(next).unwrap();
            state = next;
        }
        assert_eq!(job.state(), JobState::Completed);
    }

    #[test]
    fn test_no_backward_or_skipping_transitions() {
        let mut job = job();
        job.advance(JobState::Downloading).unwrap();
        job.advance(JobState::Analyzing).unwrap();

        assert!(job.advance(JobState::Downloading).is_err());
        assert!(job.advance(JobState::Executing).is_err());
        assert!(job.advance(JobState::Queued).is_err());
        assert_eq!(job.state(), JobState::Analyzing);
    }

    #[test]
    fn test_terminal_states_are_final() {
        let mut job = job();
        job.fail("download failed").unwrap();
        assert_eq!(job.failure_reason(), Some("download failed"));
        assert!(job.fail("again").is_err());
        assert!(job.advance(JobState::Downloading).is_err());
    }

    #[test]
    fn test_retry_resets_attempt() {
        let mut job = job();
        job.set_operations(vec![OperationDirective::new("scale")]).unwrap();
        assert!(job.retry().is_err());

        job.fail("refinement timed out").unwrap();
        job.retry().unwrap();
        assert_eq!(job.state(), JobState::Queued);
        assert_eq!(job.attempt(), 2);
        assert!(job.operations().is_empty());
        assert!(job.failure_reason().is_none());
    }

    #[test]
    fn test_operations_immutable_per_attempt() {
        let mut job = job();
        job.set_operations(vec![OperationDirective::new("scale")]).unwrap();
        let err = job
            .set_operations(vec![OperationDirective::new("rotate")])
            .unwrap_err();
        assert_eq!(err, JobTransitionError::OperationsAlreadySet(1));
        assert_eq!(job.operations()[0].kind, "scale");
    }

    #[test]
    fn test_job_state_wire_format() {
        let json = serde_json::to_string(&JobState::AwaitingRefinement).unwrap();
        assert_eq!(json, "\"awaiting_refinement\"");
    }
}
