//! Repository layer
//!
//! Repositories abstract communication with the job backend behind small,
//! focused traits. The HTTP implementations delegate to `BackendClient`;
//! tests substitute in-process fakes.

mod jobs;
mod logs;

// Re-export traits
pub use jobs::JobRepository;
pub use logs::LogRepository;

// Re-export implementations
pub use jobs::HttpJobRepository;
pub use logs::HttpLogRepository;

pub use jobs::RefinementWait;
