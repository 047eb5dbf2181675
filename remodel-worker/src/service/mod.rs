//! Service layer
//!
//! Services hold the worker's business logic: analysing a document,
//! executing operation directives against it, and buffering job logs.
//! They work on an already open document and never talk to the backend.
//!
//! All services are trait-based to enable testing and dependency injection.

mod analyzer;
mod executor;
mod log_buffer;

// Re-export traits
pub use analyzer::AnalysisService;
pub use executor::ExecutionService;
pub use log_buffer::LogBufferService;

// Re-export implementations
pub use analyzer::{AnalysisError, ModelAnalyzer};
pub use executor::OperationExecutor;
pub use log_buffer::InMemoryLogBuffer;
