//! ID resolver module
//!
//! Handles resolution of UUID prefixes to full UUIDs by querying the backend.
//! This allows users to specify short, unambiguous prefixes instead of full UUIDs.

use anyhow::{Context, Result, anyhow};
use remodel_client::BackendClient;
use uuid::Uuid;

use crate::types::JobRef;

/// Resolve a job ID or prefix to a full UUID
///
/// If the input is already a full UUID, returns it immediately.
/// Otherwise, fetches all jobs and finds the one matching the prefix.
///
/// # Errors
/// Returns an error if:
/// - No job matches the prefix
/// - Multiple jobs match the prefix (ambiguous)
/// - The backend call fails
pub async fn resolve_job_id(client: &BackendClient, job: &JobRef) -> Result<Uuid> {
    let prefix = match job {
        JobRef::Full(uuid) => return Ok(*uuid),
        JobRef::Prefix(prefix) => prefix,
    };

    let jobs = client
        .list_jobs()
        .await
        .context("Failed to fetch jobs for ID resolution")?;

    match_prefix(jobs.iter().map(|j| j.id), prefix)
}

/// Picks the single ID starting with `prefix`, case-insensitively
fn match_prefix(ids: impl IntoIterator<Item = Uuid>, prefix: &str) -> Result<Uuid> {
    let prefix = prefix.to_lowercase();
    let matches: Vec<Uuid> = ids
        .into_iter()
        .filter(|id| id.to_string().starts_with(&prefix))
        .collect();

    match matches.as_slice() {
        [] => Err(anyhow!("No job found with ID starting with '{}'", prefix)),
        [id] => Ok(*id),
        _ => {
            let ids: Vec<String> = matches.iter().map(Uuid::to_string).collect();
            Err(anyhow!(
                "Ambiguous prefix '{}' matches multiple jobs: {}",
                prefix,
                ids.join(", ")
            ))
        }
    }
}
