//! Job poller
//!
//! Polls the backend for queued jobs and runs each one in its own task.
//! Concurrency is bounded by a semaphore sized from `max_parallel_jobs`;
//! jobs that find no free slot stay queued for a later cycle.

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, watch};
use tokio::task::JoinError;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::scheduler::job_run::job_workspace;
use crate::scheduler::{JobRun, WorkerServices};
use remodel_core::domain::job::{JobState, JobSummary};
use remodel_core::domain::log::LogEntry;

/// Job poller that continuously polls for and executes jobs
pub struct JobPoller {
    config: Config,
    services: WorkerServices,
    semaphore: Arc<Semaphore>,
}

impl JobPoller {
    /// Creates a new job poller
    pub fn new(config: Config, services: WorkerServices) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.max_parallel_jobs));
        Self {
            config,
            services,
            semaphore,
        }
    }

    /// Starts the polling loop
    ///
    /// Returns once `shutdown` turns true (or its sender is dropped). Jobs
    /// already in progress finish first.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        info!(
            "Starting job poller (interval: {:?})",
            self.config.poll_interval
        );

        let mut interval = time::interval(self.config.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = shutdown.changed() => {}
            }
            if *shutdown.borrow() || shutdown.has_changed().is_err() {
                info!("Shutdown requested, stopping job poller");
                return Ok(());
            }

            debug!("Polling for queued jobs");

            match self.poll_and_execute_once().await {
                Ok(executed) => {
                    if executed > 0 {
                        info!("Processed {} job(s) this cycle", executed);
                    }
                }
                Err(e) => {
                    error!("Error during poll cycle: {:#}", e);
                }
            }
        }
    }

    /// Performs a single poll cycle
    pub async fn poll_and_execute_once(&self) -> Result<usize> {
        let jobs = self
            .services
            .jobs
            .list_queued_jobs()
            .await
            .context("Failed to fetch queued jobs")?;

        if jobs.is_empty() {
            debug!("No jobs available");
            return Ok(0);
        }

        info!("Found {} queued job(s)", jobs.len());

        let mut handles = Vec::new();

        for job in jobs {
            // Try to acquire semaphore permit, skip if at max capacity
            if let Ok(permit) = self.semaphore.clone().try_acquire_owned() {
                self.services.observer.job_discovered(&job);
                handles.push((job.id, self.spawn_job_task(job, permit)));
            } else {
                debug!("Max parallel jobs reached, leaving job {} queued", job.id);
            }
        }

        let num_jobs = handles.len();

        for (job_id, handle) in handles {
            if let Err(e) = handle.await {
                self.fail_lost_job(job_id, e).await;
            }
        }

        Ok(num_jobs)
    }

    /// Spawns a task to run a single job
    fn spawn_job_task(
        &self,
        job: JobSummary,
        permit: OwnedSemaphorePermit,
    ) -> tokio::task::JoinHandle<()> {
        let run = JobRun::new(job, &self.config, self.services.clone());

        tokio::spawn(async move {
            let job = run.run().await;
            debug!("Job {} finished in state {}", job.id, job.state());
            drop(permit);
        })
    }

    /// Fails a job whose task died before it could report a terminal state
    async fn fail_lost_job(&self, job_id: Uuid, err: JoinError) {
        let reason = match err.try_into_panic() {
            Ok(payload) => {
                let detail = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown cause".to_string());
                format!("job panicked: {}", detail)
            }
            Err(err) => format!("job task aborted: {}", err),
        };

        error!(job_id = %job_id, "{}", reason);
        self.services
            .observer
            .job_finished(job_id, JobState::Failed, Some(&reason));

        if let Err(e) = self
            .services
            .logs
            .send_logs(job_id, vec![LogEntry::error(reason.clone())])
            .await
        {
            warn!("Failed to send logs for job {}: {}", job_id, e);
        }
        if let Err(e) = self
            .services
            .jobs
            .report_status(job_id, JobState::Failed, Some(reason), None)
            .await
        {
            error!("Failed to report failure of job {}: {}", job_id, e);
        }

        let workspace = job_workspace(&self.config, job_id);
        if let Err(e) = tokio::fs::remove_dir_all(&workspace).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to remove workspace {}: {}", workspace.display(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::TracingObserver;
    use crate::geometry::SimulatedKernel;
    use crate::geometry::simulated::fixtures::{BRACKET, EMPTY};
    use crate::repository::{JobRepository, LogRepository};
    use crate::geometry::Document;
    use crate::service::{ExecutionService, ModelAnalyzer, OperationExecutor};
    use async_trait::async_trait;
    use remodel_client::{ClientError, RefinementStatus};
    use remodel_core::domain::analysis::AnalysisResult;
    use remodel_core::domain::job::{ArtifactRef, JobRecord, JobState};
    use remodel_core::domain::log::LogEntry;
    use remodel_core::domain::operation::OperationDirective;
    use remodel_core::domain::report::{ExecutionReport, OperationResult, OverallOutcome};
    use std::collections::HashMap;
    use std::path::Path;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;
    use uuid::Uuid;

    type Status = (JobState, Option<String>, Option<ExecutionReport>);

    /// In-process backend recording everything the worker sends
    #[derive(Default)]
    struct FakeBackend {
        queued: Mutex<Vec<JobSummary>>,
        models: HashMap<String, String>,
        /// `None` keeps refinement pending forever
        operations: Option<Vec<OperationDirective>>,
        cancel_requested: AtomicBool,
        unreachable: bool,
        downloads: AtomicUsize,
        analyses: Mutex<Vec<AnalysisResult>>,
        statuses: Mutex<HashMap<Uuid, Vec<Status>>>,
        uploads: Mutex<Vec<String>>,
        logs: Mutex<Vec<LogEntry>>,
    }

    impl FakeBackend {
        fn with_job(model: &str, operations: Option<Vec<OperationDirective>>) -> (Self, Uuid) {
            let id = Uuid::new_v4();
            let backend = Self {
                queued: Mutex::new(vec![summary(id, "models/bracket.json")]),
                models: HashMap::from([("models/bracket.json".to_string(), model.to_string())]),
                operations,
                ..Default::default()
            };
            (backend, id)
        }

        fn statuses(&self, id: Uuid) -> Vec<Status> {
            self.statuses
                .lock()
                .unwrap()
                .get(&id)
                .cloned()
                .unwrap_or_default()
        }

        fn states(&self, id: Uuid) -> Vec<JobState> {
            self.statuses(id).into_iter().map(|s| s.0).collect()
        }
    }

    fn summary(id: Uuid, artifact: &str) -> JobSummary {
        JobSummary {
            id,
            command: "make it lighter".to_string(),
            input_artifact: ArtifactRef(artifact.to_string()),
            attempt: 1,
        }
    }

    fn unavailable() -> ClientError {
        ClientError::api_error(503, "backend unavailable")
    }

    #[async_trait]
    impl JobRepository for FakeBackend {
        async fn list_queued_jobs(&self) -> remodel_client::Result<Vec<JobSummary>> {
            if self.unreachable {
                return Err(unavailable());
            }
            Ok(self.queued.lock().unwrap().clone())
        }

        async fn get_job(&self, job_id: Uuid) -> remodel_client::Result<JobRecord> {
            Ok(JobRecord {
                id: job_id,
                command: "make it lighter".to_string(),
                state: JobState::Queued,
                attempt: 1,
                input_artifact: ArtifactRef("models/bracket.json".to_string()),
                output_artifact: None,
                cancel_requested: self.cancel_requested.load(Ordering::SeqCst),
                reason: None,
                analysis: None,
                operations: Vec::new(),
                report: None,
                updated_at: None,
            })
        }

        async fn download(&self, artifact: &ArtifactRef, dest: &Path) -> remodel_client::Result<()> {
            self.downloads.fetch_add(1, Ordering::SeqCst);
            let model = self
                .models
                .get(&artifact.0)
                .ok_or_else(|| ClientError::api_error(404, "artifact not found"))?;
            tokio::fs::write(dest, model).await?;
            Ok(())
        }

        async fn submit_analysis(
            &self,
            _job_id: Uuid,
            analysis: &AnalysisResult,
        ) -> remodel_client::Result<bool> {
            self.analyses.lock().unwrap().push(analysis.clone());
            Ok(self.operations.is_some())
        }

        async fn poll_operations(&self, _job_id: Uuid) -> remodel_client::Result<RefinementStatus> {
            Ok(match &self.operations {
                Some(operations) => RefinementStatus::Ready {
                    operations: operations.clone(),
                },
                None => RefinementStatus::Pending,
            })
        }

        async fn upload(&self, job_id: Uuid, path: &Path) -> remodel_client::Result<ArtifactRef> {
            let content = tokio::fs::read_to_string(path).await?;
            self.uploads.lock().unwrap().push(content);
            Ok(ArtifactRef(format!("results/{}", job_id)))
        }

        async fn report_status(
            &self,
            job_id: Uuid,
            state: JobState,
            reason: Option<String>,
            report: Option<ExecutionReport>,
        ) -> remodel_client::Result<()> {
            // Any reported transition takes the job off the queue
            self.queued.lock().unwrap().retain(|j| j.id != job_id);
            self.statuses
                .lock()
                .unwrap()
                .entry(job_id)
                .or_default()
                .push((state, reason, report));
            Ok(())
        }
    }

    #[async_trait]
    impl LogRepository for FakeBackend {
        async fn send_logs(&self, _job_id: Uuid, entries: Vec<LogEntry>) -> remodel_client::Result<()> {
            self.logs.lock().unwrap().extend(entries);
            Ok(())
        }
    }

    fn test_config() -> Config {
        let mut config = Config::default();
        config.poll_interval = Duration::from_millis(20);
        config.refinement_timeout = Duration::from_millis(200);
        config.refinement_poll_interval = Duration::from_millis(20);
        config.workspace_dir = std::env::temp_dir().join(format!("remodel-test-{}", Uuid::new_v4()));
        config
    }

    fn poller(backend: &Arc<FakeBackend>, config: Config) -> JobPoller {
        poller_with(backend, config, Arc::new(OperationExecutor::new()))
    }

    fn poller_with(
        backend: &Arc<FakeBackend>,
        config: Config,
        executor: Arc<dyn ExecutionService>,
    ) -> JobPoller {
        let services = WorkerServices {
            jobs: backend.clone(),
            logs: backend.clone(),
            kernel: Arc::new(SimulatedKernel::new()),
            analyzer: Arc::new(ModelAnalyzer::new()),
            executor,
            observer: Arc::new(TracingObserver),
        };
        JobPoller::new(config, services)
    }

    struct CrashingExecutor;

    impl ExecutionService for CrashingExecutor {
        fn execute(
            &self,
            _document: &mut dyn Document,
            _operations: &[OperationDirective],
            _on_result: &mut dyn FnMut(&OperationResult),
        ) -> ExecutionReport {
            panic!("kernel crashed")
        }
    }

    fn lighten() -> Vec<OperationDirective> {
        vec![
            OperationDirective::new("shell_body").with_param("wall_thickness", 2.0),
            OperationDirective::new("fillet_edges").with_param("radius", 1.0),
        ]
    }

    #[tokio::test]
    async fn test_empty_poll_is_noop() {
        let backend = Arc::new(FakeBackend::default());
        let poller = poller(&backend, test_config());

        assert_eq!(poller.poll_and_execute_once().await.unwrap(), 0);
        assert!(backend.statuses.lock().unwrap().is_empty());
        assert_eq!(backend.downloads.load(Ordering::SeqCst), 0);
        assert!(backend.uploads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_job_completes_through_every_stage() {
        let (backend, id) = FakeBackend::with_job(BRACKET, Some(lighten()));
        let backend = Arc::new(backend);
        let config = test_config();
        let poller = poller(&backend, config.clone());

        assert_eq!(poller.poll_and_execute_once().await.unwrap(), 1);

        assert_eq!(
            backend.states(id),
            vec![
                JobState::Downloading,
                JobState::Analyzing,
                JobState::AwaitingRefinement,
                JobState::Executing,
                JobState::Uploading,
                JobState::Completed,
            ]
        );

        let statuses = backend.statuses(id);
        let (_, reason, report) = statuses.last().unwrap();
        assert!(reason.is_none());
        let report = report.as_ref().unwrap();
        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.overall_outcome(), OverallOutcome::Completed);

        assert_eq!(backend.analyses.lock().unwrap()[0].mass_grams, 9.92);
        let uploads = backend.uploads.lock().unwrap();
        assert_eq!(uploads.len(), 1);
        assert!(uploads[0].contains("\"shells\": 1"));

        assert!(!backend.logs.lock().unwrap().is_empty());
        assert!(!config.workspace_dir.join(id.to_string()).exists());
    }

    #[tokio::test]
    async fn test_refinement_timeout_fails_without_execution() {
        let (backend, id) = FakeBackend::with_job(BRACKET, None);
        let backend = Arc::new(backend);
        let poller = poller(&backend, test_config());

        poller.poll_and_execute_once().await.unwrap();

        let states = backend.states(id);
        assert!(!states.contains(&JobState::Executing));
        assert_eq!(states.last(), Some(&JobState::Failed));
        let statuses = backend.statuses(id);
        let (_, reason, report) = statuses.last().unwrap();
        assert!(reason.as_deref().unwrap().contains("refinement timed out"));
        assert!(report.is_none());
        assert!(backend.uploads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_job_stops_before_download() {
        let (backend, id) = FakeBackend::with_job(BRACKET, Some(lighten()));
        backend.cancel_requested.store(true, Ordering::SeqCst);
        let backend = Arc::new(backend);
        let poller = poller(&backend, test_config());

        poller.poll_and_execute_once().await.unwrap();

        let statuses = backend.statuses(id);
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].0, JobState::Failed);
        assert_eq!(statuses[0].1.as_deref(), Some("cancelled"));
        assert_eq!(backend.downloads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_artifact_fails_job_not_cycle() {
        let id = Uuid::new_v4();
        let backend = Arc::new(FakeBackend {
            queued: Mutex::new(vec![summary(id, "models/missing.json")]),
            operations: Some(lighten()),
            ..Default::default()
        });
        let poller = poller(&backend, test_config());

        assert_eq!(poller.poll_and_execute_once().await.unwrap(), 1);
        assert_eq!(
            backend.states(id),
            vec![JobState::Downloading, JobState::Failed]
        );
        let statuses = backend.statuses(id);
        assert!(
            statuses[1]
                .1
                .as_deref()
                .unwrap()
                .starts_with("backend request failed")
        );
    }

    #[tokio::test]
    async fn test_analysis_failure_skips_refinement() {
        let (backend, id) = FakeBackend::with_job(EMPTY, Some(lighten()));
        let backend = Arc::new(backend);
        let poller = poller(&backend, test_config());

        poller.poll_and_execute_once().await.unwrap();

        assert_eq!(
            backend.states(id),
            vec![JobState::Downloading, JobState::Analyzing, JobState::Failed]
        );
        assert!(backend.analyses.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_execution_is_not_uploaded() {
        let operations = vec![OperationDirective::new("fillet").with_param("radius", 8.0)];
        let (backend, id) = FakeBackend::with_job(BRACKET, Some(operations));
        let backend = Arc::new(backend);
        let poller = poller(&backend, test_config());

        poller.poll_and_execute_once().await.unwrap();

        let statuses = backend.statuses(id);
        let (state, reason, report) = statuses.last().unwrap();
        assert_eq!(*state, JobState::Failed);
        assert_eq!(reason.as_deref(), Some("execution failed validation"));
        assert_eq!(
            report.as_ref().unwrap().overall_outcome(),
            OverallOutcome::Failed
        );
        assert!(!backend.states(id).contains(&JobState::Uploading));
        assert!(backend.uploads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_surplus_jobs_wait_for_capacity() {
        let (backend, first) = FakeBackend::with_job(BRACKET, Some(lighten()));
        let second = Uuid::new_v4();
        backend
            .queued
            .lock()
            .unwrap()
            .push(summary(second, "models/bracket.json"));
        let backend = Arc::new(backend);
        let poller = poller(&backend, test_config());

        assert_eq!(poller.poll_and_execute_once().await.unwrap(), 1);
        assert_eq!(backend.states(first).last(), Some(&JobState::Completed));
        assert!(backend.states(second).is_empty());

        assert_eq!(poller.poll_and_execute_once().await.unwrap(), 1);
        assert_eq!(backend.states(second).last(), Some(&JobState::Completed));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_cycle_error() {
        let backend = Arc::new(FakeBackend {
            unreachable: true,
            ..Default::default()
        });
        let poller = poller(&backend, test_config());

        assert!(poller.poll_and_execute_once().await.is_err());
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let backend = Arc::new(FakeBackend {
            unreachable: true,
            ..Default::default()
        });
        let poller = poller(&backend, test_config());
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn(async move { poller.run(rx).await });
        time::sleep(Duration::from_millis(60)).await;
        tx.send(true).unwrap();

        let result = time::timeout(Duration::from_secs(2), handle).await;
        assert!(result.unwrap().unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_panicking_job_is_failed_and_cleaned_up() {
        let (backend, id) = FakeBackend::with_job(BRACKET, Some(lighten()));
        let backend = Arc::new(backend);
        let config = test_config();
        let workspace = config.workspace_dir.join(id.to_string());
        let poller = poller_with(&backend, config, Arc::new(CrashingExecutor));

        assert_eq!(poller.poll_and_execute_once().await.unwrap(), 1);

        let statuses = backend.statuses(id);
        let (state, reason, report) = statuses.last().unwrap();
        assert_eq!(*state, JobState::Failed);
        assert_eq!(reason.as_deref(), Some("job panicked: kernel crashed"));
        assert!(report.is_none());
        assert!(!workspace.exists());
        assert!(backend.queued.lock().unwrap().is_empty());
        assert!(
            backend
                .logs
                .lock()
                .unwrap()
                .iter()
                .any(|l| l.message == "job panicked: kernel crashed")
        );
    }

    #[tokio::test]
    async fn test_dense_hole_grid_fails_the_job() {
        let operations = vec![
            OperationDirective::new("strategic_holes")
                .with_param("hole_diameter", 0.00009)
                .with_param("spacing", 0.0001),
        ];
        let (backend, id) = FakeBackend::with_job(BRACKET, Some(operations));
        let backend = Arc::new(backend);
        let poller = poller(&backend, test_config());

        poller.poll_and_execute_once().await.unwrap();

        let statuses = backend.statuses(id);
        let (state, _, report) = statuses.last().unwrap();
        assert_eq!(*state, JobState::Failed);
        let report = report.as_ref().unwrap();
        assert_eq!(report.failed(), 1);
        assert_eq!(report.overall_outcome(), OverallOutcome::Failed);
        assert!(backend.uploads.lock().unwrap().is_empty());
    }
}
