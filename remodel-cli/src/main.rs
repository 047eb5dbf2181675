//! Remodel CLI
//!
//! Command-line interface for inspecting jobs on the Remodel backend and the
//! operations the worker supports.

mod commands;
mod config;
mod id_resolver;
mod types;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;

#[derive(Parser)]
#[command(name = "remodel")]
#[command(about = "Remodel CAD job CLI", long_about = None)]
struct Cli {
    /// Backend URL
    #[arg(long, env = "REMODEL_BACKEND_URL", default_value = "http://localhost:8000")]
    backend_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config {
        backend_url: cli.backend_url,
    };

    handle_command(cli.command, &config).await
}
