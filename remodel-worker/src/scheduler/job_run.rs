//! Single job lifecycle
//!
//! Drives one job from `Queued` to a terminal state. Each stage first checks
//! for cancellation, then advances the job, reports the transition and ships
//! buffered logs. Any error ends the job in `Failed` with the error text as
//! the reason; nothing escapes to the poller.

use remodel_core::domain::job::{ArtifactRef, Job, JobState, JobSummary};
use remodel_core::domain::log::{LogEntry, LogLevel};
use remodel_core::domain::report::{Outcome, OverallOutcome};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{JobError, Result};
use crate::geometry::DocumentSession;
use crate::repository::RefinementWait;
use crate::scheduler::WorkerServices;
use crate::service::{InMemoryLogBuffer, LogBufferService};

pub struct JobRun {
    job: Job,
    services: WorkerServices,
    wait: RefinementWait,
    workspace: PathBuf,
    logs: InMemoryLogBuffer,
    executed: bool,
}

impl JobRun {
    pub fn new(summary: JobSummary, config: &Config, services: WorkerServices) -> Self {
        let workspace = job_workspace(config, summary.id);
        Self {
            job: Job::new(summary),
            services,
            wait: RefinementWait {
                timeout: config.refinement_timeout,
                poll_interval: config.refinement_poll_interval,
            },
            workspace,
            logs: InMemoryLogBuffer::new(),
            executed: false,
        }
    }

    /// Runs the job to completion or failure and returns its final state
    pub async fn run(mut self) -> Job {
        match self.process().await {
            Ok(()) => self.complete().await,
            Err(err) => self.fail(err).await,
        }

        self.flush_logs().await;
        self.cleanup().await;
        self.job
    }

    async fn process(&mut self) -> Result<()> {
        let job_id = self.job.id;

        self.enter(JobState::Downloading).await?;
        tokio::fs::create_dir_all(&self.workspace).await?;
        let input = self.workspace.join(input_file_name(&self.job.input_artifact));
        self.services
            .jobs
            .download(&self.job.input_artifact, &input)
            .await?;
        self.logs
            .info(format!("Downloaded input {}", self.job.input_artifact));

        self.enter(JobState::Analyzing).await?;
        let mut document = DocumentSession::open(self.services.kernel.as_ref(), &input)?;
        let analysis = self.services.analyzer.analyze(&*document)?;
        self.logs.info(format!(
            "Analyzed '{}': {} bodies, {} g",
            document.name(),
            analysis.body_count,
            analysis.mass_grams
        ));
        self.job.record_analysis(analysis.clone())?;

        self.enter(JobState::AwaitingRefinement).await?;
        let refined = self
            .services
            .jobs
            .submit_analysis(job_id, &analysis)
            .await?;
        let operations = self
            .services
            .jobs
            .fetch_operations(job_id, refined, self.wait)
            .await?;
        self.logs
            .info(format!("Received {} operation(s)", operations.len()));
        self.job.set_operations(operations)?;

        self.enter(JobState::Executing).await?;
        let observer = Arc::clone(&self.services.observer);
        let logs = self.logs.clone();
        let report = self.services.executor.execute(
            &mut *document,
            self.job.operations(),
            &mut |result| {
                observer.operation_finished(job_id, result);
                let level = match result.outcome {
                    Outcome::Success => LogLevel::Info,
                    Outcome::Skipped => LogLevel::Warning,
                    Outcome::Failed => LogLevel::Error,
                };
                logs.add_entry(LogEntry::new(
                    level,
                    format!("[{}] {}: {}", result.index, result.kind, result.message),
                ));
            },
        );
        self.executed = true;
        self.logs.info(format!(
            "Execution finished: {} succeeded, {} failed, {} skipped",
            report.succeeded(),
            report.failed(),
            report.skipped()
        ));
        let outcome = report.overall_outcome();
        self.job.set_report(report);
        if outcome == OverallOutcome::Failed {
            return Err(JobError::ExecutionFailed);
        }

        self.enter(JobState::Uploading).await?;
        let output = self.workspace.join(output_file_name(&input));
        document.save(&output)?;
        let artifact = self.services.jobs.upload(job_id, &output).await?;
        self.logs.info(format!("Uploaded result as {}", artifact));
        self.job.output_artifact = Some(artifact);

        Ok(())
    }

    /// Checks for cancellation, then moves to `state` and reports it
    async fn enter(&mut self, state: JobState) -> Result<()> {
        let record = self.services.jobs.get_job(self.job.id).await?;
        if record.cancel_requested {
            return Err(JobError::Cancelled);
        }

        self.job.advance(state)?;
        self.services.observer.stage_entered(self.job.id, state);
        self.logs.info(format!("Entering {}", state));
        self.services
            .jobs
            .report_status(self.job.id, state, None, None)
            .await?;
        self.flush_logs().await;
        Ok(())
    }

    async fn complete(&mut self) {
        let job_id = self.job.id;
        if let Err(err) = self.job.advance(JobState::Completed) {
            error!("Job {} cannot complete: {}", job_id, err);
            return;
        }

        self.logs.info("Job completed");
        self.services
            .observer
            .job_finished(job_id, JobState::Completed, None);
        if let Err(err) = self
            .services
            .jobs
            .report_status(
                job_id,
                JobState::Completed,
                None,
                Some(self.job.report().clone()),
            )
            .await
        {
            error!("Failed to report completion of job {}: {}", job_id, err);
        }
    }

    async fn fail(&mut self, err: JobError) {
        let job_id = self.job.id;
        let reason = err.to_string();
        if let Err(err) = self.job.fail(reason.clone()) {
            warn!("Job {} already terminal: {}", job_id, err);
        }

        self.logs.error(format!("Job failed: {}", reason));
        self.services
            .observer
            .job_finished(job_id, JobState::Failed, Some(&reason));

        let report = self.executed.then(|| self.job.report().clone());
        if let Err(err) = self
            .services
            .jobs
            .report_status(job_id, JobState::Failed, Some(reason), report)
            .await
        {
            error!("Failed to report failure of job {}: {}", job_id, err);
        }
    }

    /// Ships buffered log entries; delivery is best-effort
    async fn flush_logs(&self) {
        let entries = self.logs.drain();
        if entries.is_empty() {
            return;
        }

        debug!("Sending {} logs for job {}", entries.len(), self.job.id);
        if let Err(err) = self.services.logs.send_logs(self.job.id, entries).await {
            warn!("Failed to send logs for job {}: {}", self.job.id, err);
        }
    }

    async fn cleanup(&self) {
        if let Err(err) = tokio::fs::remove_dir_all(&self.workspace).await {
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!(
                    "Failed to remove workspace {}: {}",
                    self.workspace.display(),
                    err
                );
            }
        }
    }
}

/// Scratch directory holding one job's files
pub fn job_workspace(config: &Config, job_id: Uuid) -> PathBuf {
    config.workspace_dir.join(job_id.to_string())
}

fn input_file_name(artifact: &ArtifactRef) -> String {
    Path::new(&artifact.0)
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| "input".to_string())
}

fn output_file_name(input: &Path) -> String {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    match input.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{}_modified.{}", stem, ext),
        None => format!("{}_modified", stem),
    }
}
