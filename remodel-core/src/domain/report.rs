//! Execution report domain types

use serde::{Deserialize, Serialize};

/// Outcome of applying a single directive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Skipped,
    Failed,
}

/// Why a directive failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// Geometric prerequisites were unmet; nothing was attempted
    Precondition,
    /// The geometry kernel rejected the mutation
    Adapter,
}

/// Result of one directive, in execution order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationResult {
    pub index: usize,
    pub kind: String,
    pub outcome: Outcome,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureClass>,
}

impl OperationResult {
    pub fn success(index: usize, kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            index,
            kind: kind.into(),
            outcome: Outcome::Success,
            message: message.into(),
            failure: None,
        }
    }

    pub fn skipped(index: usize, kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            index,
            kind: kind.into(),
            outcome: Outcome::Skipped,
            message: message.into(),
            failure: None,
        }
    }

    pub fn failed(
        index: usize,
        kind: impl Into<String>,
        class: FailureClass,
        message: impl Into<String>,
    ) -> Self {
        Self {
            index,
            kind: kind.into(),
            outcome: Outcome::Failed,
            message: message.into(),
            failure: Some(class),
        }
    }
}

/// Final verdict of an execution attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallOutcome {
    Completed,
    Failed,
}

/// Aggregate of one execution attempt
///
/// Results can only be appended; the counters are maintained alongside so
/// they always agree with `results`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    results: Vec<OperationResult>,
    succeeded: usize,
    failed: usize,
    skipped: usize,
    overall_outcome: OverallOutcome,
}

impl ExecutionReport {
    pub fn new() -> Self {
        Self {
            results: Vec::new(),
            succeeded: 0,
            failed: 0,
            skipped: 0,
            overall_outcome: OverallOutcome::Completed,
        }
    }

    /// Appends the next result
    pub fn record(&mut self, result: OperationResult) {
        match result.outcome {
            Outcome::Success => self.succeeded += 1,
            Outcome::Failed => self.failed += 1,
            Outcome::Skipped => self.skipped += 1,
        }
        self.results.push(result);
    }

    /// Settles the overall outcome once every directive has a result
    ///
    /// Completed requires a valid document, and either at least one success
    /// or no kernel rejection at all (only skips and unmet preconditions,
    /// which leave the document untouched).
    pub fn conclude(&mut self, document_valid: bool) -> OverallOutcome {
        let rejected = self
            .results
            .iter()
            .any(|r| r.failure == Some(FailureClass::Adapter));

        self.overall_outcome = if document_valid && (self.succeeded > 0 || !rejected) {
            OverallOutcome::Completed
        } else {
            OverallOutcome::Failed
        };
        self.overall_outcome
    }

    pub fn results(&self) -> &[OperationResult] {
        &self.results
    }

    pub fn succeeded(&self) -> usize {
        self.succeeded
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn overall_outcome(&self) -> OverallOutcome {
        self.overall_outcome
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

impl Default for ExecutionReport {
    fn default() -> Self {
        Self::new()
    }
}
