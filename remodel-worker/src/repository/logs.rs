//! Logs repository
//!
//! Handles sending job logs to the backend.
//! Log buffering is handled by the service layer.

use async_trait::async_trait;
use remodel_client::{BackendClient, Result};
use remodel_core::domain::log::LogEntry;
use std::sync::Arc;
use uuid::Uuid;

/// Repository trait for log-related operations with the backend
#[async_trait]
pub trait LogRepository: Send + Sync {
    /// Sends logs to the backend for a specific job
    ///
    /// # Arguments
    /// * `job_id` - The ID of the job these logs belong to
    /// * `entries` - The log entries to send
    async fn send_logs(&self, job_id: Uuid, entries: Vec<LogEntry>) -> Result<()>;
}

/// HTTP implementation of LogRepository
pub struct HttpLogRepository {
    client: Arc<BackendClient>,
}

impl HttpLogRepository {
    pub fn new(client: Arc<BackendClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl LogRepository for HttpLogRepository {
    async fn send_logs(&self, job_id: Uuid, entries: Vec<LogEntry>) -> Result<()> {
        self.client.send_logs(job_id, entries).await
    }
}
