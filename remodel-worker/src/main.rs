//! Remodel Worker
//!
//! A worker that turns natural-language CAD modification jobs into edited
//! models.
//!
//! Architecture:
//! - Configuration: flags with environment fallbacks
//! - Repositories: HTTP communication with the job backend (jobs, logs)
//! - Geometry: the kernel adapter every document access goes through
//! - Services: model analysis, operation execution, log buffering
//! - Scheduler: job polling and lifecycle management
//!
//! The worker polls the backend for queued jobs, downloads each model,
//! analyses it, waits for refined operations, applies them and uploads the
//! result, reporting every stage along the way.

mod config;
mod error;
mod events;
mod geometry;
mod operations;
mod repository;
mod scheduler;
mod service;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Config, WorkerArgs};
use crate::events::TracingObserver;
use crate::geometry::{GeometryKernel, SimulatedKernel};
use crate::repository::{HttpJobRepository, HttpLogRepository};
use crate::scheduler::{JobPoller, WorkerServices};
use crate::service::{ModelAnalyzer, OperationExecutor};
use remodel_client::BackendClient;

#[derive(Parser)]
#[command(name = "remodel-worker")]
#[command(about = "Processes queued CAD modification jobs", long_about = None)]
#[command(version)]
struct Cli {
    #[command(flatten)]
    worker: WorkerArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "remodel_worker=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Remodel Worker");

    let config = Config::from(Cli::parse().worker);
    config.validate().context("Invalid worker configuration")?;
    info!(
        "Loaded configuration: worker_id={}, backend_url={}",
        config.worker_id, config.backend_url
    );

    tokio::fs::create_dir_all(&config.workspace_dir)
        .await
        .with_context(|| {
            format!(
                "Failed to create workspace {}",
                config.workspace_dir.display()
            )
        })?;

    // Initialize backend client
    let http = reqwest::Client::builder()
        .timeout(config.http_timeout)
        .build()
        .context("Failed to build HTTP client")?;
    let client = Arc::new(BackendClient::with_client(
        config.backend_url.clone(),
        http,
    ));

    info!("Backend client initialized");

    let kernel: Arc<dyn GeometryKernel> = Arc::new(SimulatedKernel::new());
    info!("Using {} geometry kernel", kernel.name());

    let services = WorkerServices {
        jobs: Arc::new(HttpJobRepository::new(Arc::clone(&client))),
        logs: Arc::new(HttpLogRepository::new(Arc::clone(&client))),
        kernel,
        analyzer: Arc::new(ModelAnalyzer::new()),
        executor: Arc::new(OperationExecutor::new()),
        observer: Arc::new(TracingObserver),
    };

    info!("Services initialized");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl-C, finishing current jobs");
                let _ = shutdown_tx.send(true);
            }
            Err(e) => {
                warn!("Failed to listen for Ctrl-C: {}", e);
                // Keep the sender alive so the poller keeps running
                std::future::pending::<()>().await;
            }
        }
    });

    // Create job poller
    let poller = JobPoller::new(config.clone(), services);

    info!(
        "Poll interval: {:?}, refinement timeout: {:?}",
        config.poll_interval, config.refinement_timeout
    );

    // Start polling loop
    info!("Starting job polling loop");
    if let Err(e) = poller.run(shutdown_rx).await {
        error!("Poller error: {}", e);
        return Err(e);
    }

    info!("Remodel Worker stopped");
    Ok(())
}
