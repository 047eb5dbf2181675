//! Scheduler layer for the worker
//!
//! This layer polls the backend for queued jobs and drives each job through
//! its lifecycle, from download to the terminal status report.

pub mod job_run;
pub mod poller;

pub use job_run::JobRun;
pub use poller::JobPoller;

use std::sync::Arc;

use crate::events::JobObserver;
use crate::geometry::GeometryKernel;
use crate::repository::{JobRepository, LogRepository};
use crate::service::{AnalysisService, ExecutionService};

/// Collaborators shared by every job
#[derive(Clone)]
pub struct WorkerServices {
    pub jobs: Arc<dyn JobRepository>,
    pub logs: Arc<dyn LogRepository>,
    pub kernel: Arc<dyn GeometryKernel>,
    pub analyzer: Arc<dyn AnalysisService>,
    pub executor: Arc<dyn ExecutionService>,
    pub observer: Arc<dyn JobObserver>,
}
