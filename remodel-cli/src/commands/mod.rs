//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod job;
mod operations;

use anyhow::Result;
use clap::Subcommand;

use crate::config::Config;
use crate::types::JobRef;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// List all jobs
    Jobs {
        /// Only show queued jobs
        #[arg(long)]
        queued: bool,
    },
    /// Show job details
    Job {
        /// Job ID or unambiguous prefix
        id: JobRef,
    },
    /// Show job logs
    Logs {
        /// Job ID or unambiguous prefix
        id: JobRef,
    },
    /// List the operations the worker understands
    Operations,
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Jobs { queued } => job::list_jobs(config, queued).await,
        Commands::Job { id } => job::show_job(config, &id).await,
        Commands::Logs { id } => job::show_job_logs(config, &id).await,
        Commands::Operations => {
            operations::list_operations();
            Ok(())
        }
    }
}
