//! Job-level errors
//!
//! Any of these ends the job in `Failed`; the display text becomes the
//! failure reason reported to the backend.

use remodel_client::ClientError;
use remodel_core::domain::job::JobTransitionError;
use std::time::Duration;
use thiserror::Error;

use crate::geometry::AdapterError;
use crate::service::AnalysisError;

#[derive(Debug, Error)]
pub enum JobError {
    #[error("backend request failed: {0}")]
    Transport(#[from] ClientError),

    #[error("analysis failed: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("refinement timed out after {0:?}")]
    RefinementTimeout(Duration),

    #[error("cancelled")]
    Cancelled,

    #[error("execution failed validation")]
    ExecutionFailed,

    #[error("document error: {0}")]
    Document(#[from] AdapterError),

    #[error("workspace error: {0}")]
    Workspace(#[from] std::io::Error),

    #[error(transparent)]
    Lifecycle(#[from] JobTransitionError),
}

pub type Result<T> = std::result::Result<T, JobError>;
