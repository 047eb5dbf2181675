//! Job command handlers
//!
//! Handles all job-related CLI commands including listing,
//! viewing details, and accessing logs.

use anyhow::{Context, Result};
use colored::*;
use remodel_client::BackendClient;
use remodel_core::domain::job::{JobRecord, JobState};
use remodel_core::domain::log::{LogEntry, LogLevel};
use remodel_core::domain::report::{ExecutionReport, Outcome, OverallOutcome};

use crate::config::Config;
use crate::id_resolver::resolve_job_id;
use crate::types::JobRef;

/// List jobs, optionally only the queued ones
pub async fn list_jobs(config: &Config, queued_only: bool) -> Result<()> {
    let client = BackendClient::new(&config.backend_url);

    let mut jobs = client.list_jobs().await.context("Failed to list jobs")?;
    if queued_only {
        jobs.retain(|j| j.state == JobState::Queued);
    }

    if jobs.is_empty() {
        println!("{}", "No jobs found.".yellow());
    } else {
        println!("{}", format!("Found {} job(s):", jobs.len()).bold());
        println!();
        for job in &jobs {
            print_job_summary(job);
        }
    }

    Ok(())
}

/// Get and display a single job
pub async fn show_job(config: &Config, id: &JobRef) -> Result<()> {
    let client = BackendClient::new(&config.backend_url);
    let uuid = resolve_job_id(&client, id).await?;

    let job = match client.get_job(uuid).await {
        Ok(job) => job,
        Err(e) if e.is_not_found() => {
            println!("{}", format!("Job {} not found.", uuid).yellow());
            return Ok(());
        }
        Err(e) => return Err(e).with_context(|| format!("Failed to fetch job {}", uuid)),
    };

    print_job_details(&job);

    Ok(())
}

/// Get and display job logs
pub async fn show_job_logs(config: &Config, id: &JobRef) -> Result<()> {
    let client = BackendClient::new(&config.backend_url);
    let uuid = resolve_job_id(&client, id).await?;

    let logs = client
        .get_job_logs(uuid)
        .await
        .with_context(|| format!("Failed to fetch logs for job {}", uuid))?;

    if logs.is_empty() {
        println!("{}", "No logs found for this job.".yellow());
    } else {
        println!("{}", format!("Logs for job {}:", uuid).bold());
        println!("{}", "─".repeat(80).dimmed());
        for log in &logs {
            print_log_entry(log);
        }
        println!("{}", "─".repeat(80).dimmed());
    }

    Ok(())
}

fn print_job_summary(job: &JobRecord) {
    println!("  {} Job {}", "▸".cyan(), job.id.to_string().dimmed());
    println!("    Command: {}", job.command);
    println!("    State:   {}", colorize_state(job.state));
    if job.attempt > 1 {
        println!("    Attempt: {}", job.attempt);
    }
    if let Some(updated) = job.updated_at {
        println!(
            "    Updated: {}",
            updated.format("%Y-%m-%d %H:%M:%S").to_string().dimmed()
        );
    }
    println!();
}

fn print_job_details(job: &JobRecord) {
    println!("{}", "Job Details:".bold());
    println!("  ID:       {}", job.id.to_string().cyan());
    println!("  Command:  {}", job.command);
    println!("  State:    {}", colorize_state(job.state));
    println!("  Attempt:  {}", job.attempt);
    println!("  Input:    {}", job.input_artifact.to_string().dimmed());
    if let Some(output) = &job.output_artifact {
        println!("  Output:   {}", output.to_string().green());
    }
    if job.cancel_requested {
        println!("  {}", "Cancellation requested".yellow());
    }
    if let Some(reason) = &job.reason {
        println!("  Reason:   {}", reason.red());
    }

    if let Some(analysis) = &job.analysis {
        println!("\n{}", "Analysis:".bold());
        println!("  Mass:       {:.2} g", analysis.mass_grams);
        println!("  Volume:     {:.2} cm³", analysis.volume_cm3);
        println!("  Area:       {:.2} cm²", analysis.surface_area_cm2);
        println!(
            "  Size:       {:.1} × {:.1} × {:.1} mm",
            analysis.bounding_box_mm.x, analysis.bounding_box_mm.y, analysis.bounding_box_mm.z
        );
        println!(
            "  Bodies:     {} ({} component(s))",
            analysis.body_count, analysis.component_count
        );
        println!("  Material:   {}", analysis.material);
        if let Some(wall) = analysis.wall_thickness_estimate_mm {
            println!("  Wall est.:  {:.2} mm", wall);
        }
        for (feature, count) in &analysis.feature_summary {
            println!("  {:?}: {}", feature, count);
        }
    }

    if !job.operations.is_empty() {
        println!("\n{}", "Operations:".bold());
        for (index, op) in job.operations.iter().enumerate() {
            let params = serde_json::to_string(&op.params).unwrap_or_default();
            println!("  {}. {} {}", index, op.kind.cyan(), params.dimmed());
            if let Some(reasoning) = &op.reasoning {
                println!("     {}", reasoning.dimmed());
            }
        }
    }

    if let Some(report) = &job.report {
        print_report(report);
    }
}

fn print_report(report: &ExecutionReport) {
    let overall = match report.overall_outcome() {
        OverallOutcome::Completed => "Completed".green(),
        OverallOutcome::Failed => "Failed".red(),
    };

    println!("\n{} {}", "Report:".bold(), overall);
    println!(
        "  {} succeeded, {} failed, {} skipped",
        report.succeeded(),
        report.failed(),
        report.skipped()
    );
    for result in report.results() {
        let mark = match result.outcome {
            Outcome::Success => "✓".green(),
            Outcome::Skipped => "-".yellow(),
            Outcome::Failed => "✗".red(),
        };
        println!(
            "  {} [{}] {}: {}",
            mark, result.index, result.kind, result.message
        );
    }
}

fn print_log_entry(log: &LogEntry) {
    let level_str = log.level.to_string();
    let level_colored = match log.level {
        LogLevel::Debug => level_str.dimmed(),
        LogLevel::Info => level_str.cyan(),
        LogLevel::Warning => level_str.yellow(),
        LogLevel::Error => level_str.red(),
    };

    println!(
        "{} [{}] {}",
        log.timestamp.format("%H:%M:%S").to_string().dimmed(),
        level_colored,
        log.message
    );
}

/// Colorize job state for display
fn colorize_state(state: JobState) -> ColoredString {
    let state_str = state.to_string();
    match state {
        JobState::Queued => state_str.yellow(),
        JobState::Completed => state_str.green(),
        JobState::Failed => state_str.red(),
        _ => state_str.cyan(),
    }
}
