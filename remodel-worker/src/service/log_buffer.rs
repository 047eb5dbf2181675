//! Job log buffer
//!
//! Collects the log entries of one job between stages. The orchestrator
//! drains the buffer after every stage and ships the entries to the backend.

use remodel_core::domain::log::{LogEntry, LogLevel};
use std::sync::{Arc, Mutex};

/// Buffer of job log entries awaiting delivery
pub trait LogBufferService: Send + Sync {
    fn add_entry(&self, entry: LogEntry);

    /// Takes every buffered entry, leaving the buffer empty
    fn drain(&self) -> Vec<LogEntry>;

    fn log(&self, level: LogLevel, message: impl Into<String>)
    where
        Self: Sized,
    {
        self.add_entry(LogEntry::new(level, message));
    }
}

/// In-memory implementation of LogBufferService
///
/// Clones share the same buffer.
#[derive(Clone, Default)]
pub struct InMemoryLogBuffer {
    buffer: Arc<Mutex<Vec<LogEntry>>>,
}

impl InMemoryLogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.log(LogLevel::Warning, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }
}

impl LogBufferService for InMemoryLogBuffer {
    fn add_entry(&self, entry: LogEntry) {
        let mut buffer = self.buffer.lock().unwrap();
        buffer.push(entry);
    }

    fn drain(&self) -> Vec<LogEntry> {
        let mut buffer = self.buffer.lock().unwrap();
        buffer.drain(..).collect()
    }
}
