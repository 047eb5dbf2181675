//! Configuration module
//!
//! Handles CLI configuration: where the job backend lives.

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// URL of the job backend
    pub backend_url: String,
}
