//! Core domain types
//!
//! These types describe a modification job end to end: the request itself,
//! the analysis snapshot of the model, the operations the refinement service
//! produced, and the report the worker accumulates while applying them.
//! They are shared between the worker (which produces them) and the CLI
//! (which displays what the backend persisted).

pub mod analysis;
pub mod job;
pub mod log;
pub mod operation;
pub mod report;
