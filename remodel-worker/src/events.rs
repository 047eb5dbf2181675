//! Job lifecycle events
//!
//! The orchestrator reports what it does through a [`JobObserver`] rather
//! than logging directly, so sinks can be swapped (tracing, metrics, tests).

use remodel_core::domain::job::{JobState, JobSummary};
use remodel_core::domain::report::{OperationResult, Outcome};
use tracing::{info, warn};
use uuid::Uuid;

pub trait JobObserver: Send + Sync {
    fn job_discovered(&self, job: &JobSummary);

    fn stage_entered(&self, job_id: Uuid, state: JobState);

    fn operation_finished(&self, job_id: Uuid, result: &OperationResult);

    fn job_finished(&self, job_id: Uuid, state: JobState, reason: Option<&str>);
}

/// Observer emitting every event through `tracing`
#[derive(Debug, Clone, Default)]
pub struct TracingObserver;

impl JobObserver for TracingObserver {
    fn job_discovered(&self, job: &JobSummary) {
        info!(
            job_id = %job.id,
            attempt = job.attempt,
            "Discovered job: {}", job.command
        );
    }

    fn stage_entered(&self, job_id: Uuid, state: JobState) {
        info!(job_id = %job_id, "Entering {}", state);
    }

    fn operation_finished(&self, job_id: Uuid, result: &OperationResult) {
        match result.outcome {
            Outcome::Failed => warn!(
                job_id = %job_id,
                index = result.index,
                "Operation {} failed: {}", result.kind, result.message
            ),
            _ => info!(
                job_id = %job_id,
                index = result.index,
                "Operation {} {:?}: {}", result.kind, result.outcome, result.message
            ),
        }
    }

    fn job_finished(&self, job_id: Uuid, state: JobState, reason: Option<&str>) {
        match reason {
            Some(reason) => warn!(job_id = %job_id, "Job {}: {}", state, reason),
            None => info!(job_id = %job_id, "Job {}", state),
        }
    }
}
