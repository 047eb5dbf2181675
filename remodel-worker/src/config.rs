//! Worker configuration
//!
//! Defines all configurable parameters for the worker: backend connection,
//! polling and refinement timing, workspace location and parallelism.
//! Every value can come from a command-line flag or an environment variable.

use clap::Args;
use std::path::PathBuf;
use std::time::Duration;

/// Worker configuration
///
/// All timeouts and intervals are configurable to allow tuning
/// for different deployment scenarios (dev vs prod, fast vs slow backends).
#[derive(Debug, Clone)]
pub struct Config {
    /// Identifier for this worker instance, used in logs
    pub worker_id: String,

    /// Backend base URL (e.g., "http://127.0.0.1:8000")
    pub backend_url: String,

    /// How often to poll the backend for queued jobs
    pub poll_interval: Duration,

    /// How long a job may wait for refined operations
    pub refinement_timeout: Duration,

    /// How often to ask whether refined operations are ready
    pub refinement_poll_interval: Duration,

    /// Root directory for per-job working files
    pub workspace_dir: PathBuf,

    /// Max jobs processed at once; 1 keeps document access strictly serial
    pub max_parallel_jobs: usize,

    /// Timeout applied to every backend request
    pub http_timeout: Duration,
}

impl Config {
    /// Creates a new configuration with defaults
    pub fn new(worker_id: String, backend_url: String) -> Self {
        Self {
            worker_id,
            backend_url,
            poll_interval: Duration::from_secs(10),
            refinement_timeout: Duration::from_secs(300), // 5 minutes
            refinement_poll_interval: Duration::from_secs(5),
            workspace_dir: std::env::temp_dir().join("remodel"),
            max_parallel_jobs: 1,
            http_timeout: Duration::from_secs(60),
        }
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.worker_id.is_empty() {
            anyhow::bail!("worker_id cannot be empty");
        }

        if !self.backend_url.starts_with("http://") && !self.backend_url.starts_with("https://") {
            anyhow::bail!("backend_url must start with http:// or https://");
        }

        if self.poll_interval.is_zero() {
            anyhow::bail!("poll_interval must be greater than 0");
        }

        if self.refinement_timeout.is_zero() {
            anyhow::bail!("refinement_timeout must be greater than 0");
        }

        if self.refinement_poll_interval.is_zero() {
            anyhow::bail!("refinement_poll_interval must be greater than 0");
        }

        if self.refinement_poll_interval > self.refinement_timeout {
            anyhow::bail!("refinement_poll_interval cannot exceed refinement_timeout");
        }

        if self.http_timeout.is_zero() {
            anyhow::bail!("http_timeout must be greater than 0");
        }

        if self.max_parallel_jobs == 0 {
            anyhow::bail!("max_parallel_jobs must be greater than 0");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(
            uuid::Uuid::new_v4().to_string(),
            "http://127.0.0.1:8000".to_string(),
        )
    }
}

/// Command-line and environment settings
#[derive(Debug, Clone, Args)]
pub struct WorkerArgs {
    /// Worker identifier (random when omitted)
    #[arg(long, env = "REMODEL_WORKER_ID")]
    pub worker_id: Option<String>,

    /// Backend base URL
    #[arg(long, env = "REMODEL_BACKEND_URL", default_value = "http://127.0.0.1:8000")]
    pub backend_url: String,

    /// Seconds between polls for queued jobs
    #[arg(long, env = "REMODEL_POLL_INTERVAL", default_value_t = 10)]
    pub poll_interval: u64,

    /// Seconds to wait for refined operations before failing a job
    #[arg(long, env = "REMODEL_REFINEMENT_TIMEOUT", default_value_t = 300)]
    pub refinement_timeout: u64,

    /// Seconds between refinement checks
    #[arg(long, env = "REMODEL_REFINEMENT_POLL_INTERVAL", default_value_t = 5)]
    pub refinement_poll_interval: u64,

    /// Workspace root for downloaded and saved models
    #[arg(long, env = "REMODEL_WORKSPACE_DIR")]
    pub workspace_dir: Option<PathBuf>,

    /// Jobs processed at once
    #[arg(long, env = "REMODEL_MAX_PARALLEL_JOBS", default_value_t = 1)]
    pub max_parallel_jobs: usize,

    /// Seconds before a backend request times out
    #[arg(long, env = "REMODEL_HTTP_TIMEOUT", default_value_t = 60)]
    pub http_timeout: u64,
}

impl From<WorkerArgs> for Config {
    fn from(args: WorkerArgs) -> Self {
        let mut config = Config::new(
            args.worker_id
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            args.backend_url,
        );
        config.poll_interval = Duration::from_secs(args.poll_interval);
        config.refinement_timeout = Duration::from_secs(args.refinement_timeout);
        config.refinement_poll_interval = Duration::from_secs(args.refinement_poll_interval);
        if let Some(dir) = args.workspace_dir {
            config.workspace_dir = dir;
        }
        config.max_parallel_jobs = args.max_parallel_jobs;
        config.http_timeout = Duration::from_secs(args.http_timeout);
        config
    }
}
