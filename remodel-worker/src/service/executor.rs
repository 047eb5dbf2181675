//! Operation execution service
//!
//! Applies a job's directives to an open document in order and records one
//! result per directive. Nothing in here can fail the job: unknown kinds and
//! placeholders are skipped, and every error is captured into the report.

use remodel_core::domain::operation::{OperationDirective, OperationKind};
use remodel_core::domain::report::{
    ExecutionReport, FailureClass, OperationResult, Outcome, OverallOutcome,
};
use tracing::{debug, info, warn};

use crate::geometry::{self, Document};
use crate::operations::{Handler, OperationError, handler_for};

const ABORTED: &str = "aborted: prior fatal failure.";

/// Service trait for executing operation directives
pub trait ExecutionService: Send + Sync {
    /// Executes every directive and concludes the report
    ///
    /// `on_result` sees each result as soon as it is recorded.
    fn execute(
        &self,
        document: &mut dyn Document,
        operations: &[OperationDirective],
        on_result: &mut dyn FnMut(&OperationResult),
    ) -> ExecutionReport;
}

/// Executor dispatching through the fixed operation registry
#[derive(Debug, Clone, Default)]
pub struct OperationExecutor;

impl OperationExecutor {
    pub fn new() -> Self {
        Self
    }

    fn apply_one(
        &self,
        document: &mut dyn Document,
        index: usize,
        directive: &OperationDirective,
    ) -> OperationResult {
        let Some(kind) = OperationKind::from_name(&directive.kind) else {
            return OperationResult::skipped(
                index,
                &directive.kind,
                format!("no handler for operation '{}'", directive.kind),
            );
        };

        let handler = match handler_for(kind) {
            Handler::Geometry(handler) => handler,
            Handler::Placeholder => {
                return OperationResult::skipped(
                    index,
                    &directive.kind,
                    format!("{}: not implemented", kind),
                );
            }
        };

        let transform = match handler.prepare(&*document, &directive.params) {
            Ok(transform) => transform,
            Err(err) => return failure(index, &directive.kind, err),
        };

        let mass_before = document.mass_properties().ok().map(|p| p.mass_grams);
        match document.apply(&transform) {
            Ok(affected) => {
                let mut message = transform.describe(affected);
                let mass_after = document.mass_properties().ok().map(|p| p.mass_grams);
                if let (Some(before), Some(after)) = (mass_before, mass_after) {
                    message.push_str(&format!(" (mass {:+.2} g)", after - before));
                }
                OperationResult::success(index, &directive.kind, message)
            }
            Err(err) => failure(index, &directive.kind, OperationError::Adapter(err)),
        }
    }
}

fn failure(index: usize, kind: &str, err: OperationError) -> OperationResult {
    let class = match err {
        OperationError::Precondition(_) => FailureClass::Precondition,
        OperationError::Adapter(_) => FailureClass::Adapter,
    };
    OperationResult::failed(index, kind, class, err.to_string())
}

impl ExecutionService for OperationExecutor {
    fn execute(
        &self,
        document: &mut dyn Document,
        operations: &[OperationDirective],
        on_result: &mut dyn FnMut(&OperationResult),
    ) -> ExecutionReport {
        let mut report = ExecutionReport::new();
        let mut aborted = false;

        for (index, directive) in operations.iter().enumerate() {
            let result = if aborted {
                OperationResult::skipped(index, &directive.kind, ABORTED)
            } else {
                self.apply_one(document, index, directive)
            };

            match result.outcome {
                Outcome::Success => debug!("[{}] {}: {}", index, result.kind, result.message),
                Outcome::Skipped => info!("[{}] {} skipped: {}", index, result.kind, result.message),
                Outcome::Failed => warn!("[{}] {} failed: {}", index, result.kind, result.message),
            }

            if result.outcome == Outcome::Failed && !aborted && document.bodies().is_empty() {
                warn!("Document has no bodies left, skipping remaining operations");
                aborted = true;
            }

            on_result(&result);
            report.record(result);
        }

        let outcome = report.conclude(geometry::is_valid(document));
        if outcome == OverallOutcome::Failed {
            warn!(
                "Execution failed: {} succeeded, {} failed, {} skipped",
                report.succeeded(),
                report.failed(),
                report.skipped()
            );
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::SimulatedKernel;
    use crate::geometry::simulated::fixtures::{BRACKET, EMPTY, ROUNDED_SURFACE};

    fn run(json: &str, operations: &[OperationDirective]) -> (ExecutionReport, Box<dyn Document>) {
        let mut doc = SimulatedKernel::new().load(json).unwrap();
        let report = OperationExecutor::new().execute(doc.as_mut(), operations, &mut |_| {});
        (report, doc)
    }

    #[test]
    fn test_one_result_per_directive_in_order() {
        let operations = vec![
            OperationDirective::new("shell_body").with_param("wall_thickness", 2.0),
            OperationDirective::new("fillet_edges").with_param("radius", 1.0),
            OperationDirective::new("rotate").with_param("angle", 45.0),
        ];
        let (report, _) = run(BRACKET, &operations);

        assert_eq!(report.len(), 3);
        for (i, result) in report.results().iter().enumerate() {
            assert_eq!(result.index, i);
            assert_eq!(result.kind, operations[i].kind);
        }
        assert_eq!(report.succeeded() + report.failed() + report.skipped(), 3);
        assert_eq!(report.succeeded(), 3);
        assert_eq!(report.overall_outcome(), OverallOutcome::Completed);
    }

    #[test]
    fn test_success_message_reports_mass_delta() {
        let operations = vec![OperationDirective::new("shell").with_param("wall_thickness", 2.0)];
        let (report, _) = run(BRACKET, &operations);
        let message = &report.results()[0].message;
        assert!(message.starts_with("Shelled to 2 mm wall thickness"));
        assert!(message.contains("(mass -"));
    }

    #[test]
    fn test_unknown_and_placeholder_kinds_are_skipped() {
        let operations = vec![
            OperationDirective::new("make_it_pretty"),
            OperationDirective::new("lattice_infill"),
            OperationDirective::new("run_topology_optimization"),
        ];
        let (report, _) = run(BRACKET, &operations);

        assert_eq!(report.skipped(), 3);
        assert!(report.results()[0].message.contains("no handler"));
        assert!(report.results()[1].message.contains("not implemented"));
        assert!(report.results()[2].message.contains("not implemented"));
        assert_eq!(report.overall_outcome(), OverallOutcome::Completed);
    }

    #[test]
    fn test_empty_operation_list_completes() {
        let (report, _) = run(BRACKET, &[]);
        assert!(report.is_empty());
        assert_eq!(report.overall_outcome(), OverallOutcome::Completed);
    }

    #[test]
    fn test_precondition_failure_leaves_document_untouched() {
        let mut doc = SimulatedKernel::new().load(ROUNDED_SURFACE).unwrap();
        let before = doc.mass_properties().unwrap();
        let features = doc.feature_counts();

        let operations = vec![OperationDirective::new("fillet_edges").with_param("radius", 1.0)];
        let report = OperationExecutor::new().execute(doc.as_mut(), &operations, &mut |_| {});

        let result = &report.results()[0];
        assert_eq!(result.outcome, Outcome::Failed);
        assert_eq!(result.failure, Some(FailureClass::Precondition));
        assert!(result.message.contains("edge selection"));
        assert_eq!(doc.mass_properties().unwrap(), before);
        assert_eq!(doc.feature_counts(), features);
        // An unmet precondition is not a kernel rejection
        assert_eq!(report.overall_outcome(), OverallOutcome::Completed);
    }

    #[test]
    fn test_lone_adapter_rejection_fails_execution() {
        let operations = vec![OperationDirective::new("fillet").with_param("radius", 8.0)];
        let (report, doc) = run(BRACKET, &operations);

        assert_eq!(report.results()[0].failure, Some(FailureClass::Adapter));
        assert_eq!(doc.bodies().len(), 1);
        assert_eq!(report.overall_outcome(), OverallOutcome::Failed);
    }

    #[test]
    fn test_failure_does_not_stop_later_operations() {
        let operations = vec![
            OperationDirective::new("fillet").with_param("radius", 8.0),
            OperationDirective::new("move").with_param("x", 5.0),
        ];
        let (report, doc) = run(BRACKET, &operations);

        assert_eq!(report.failed(), 1);
        assert_eq!(report.succeeded(), 1);
        assert_eq!(doc.bounding_box().unwrap().min[0], 5.0);
        assert_eq!(report.overall_outcome(), OverallOutcome::Completed);
    }

    #[test]
    fn test_failure_without_bodies_aborts_the_rest() {
        let operations = vec![
            OperationDirective::new("shell_body"),
            OperationDirective::new("rotate"),
            OperationDirective::new("scale").with_param("factor", 2.0),
        ];
        let (report, _) = run(EMPTY, &operations);

        let results = report.results();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].outcome, Outcome::Failed);
        assert_eq!(results[0].failure, Some(FailureClass::Precondition));
        for result in &results[1..] {
            assert_eq!(result.outcome, Outcome::Skipped);
            assert_eq!(result.message, "aborted: prior fatal failure.");
        }
        assert_eq!(report.overall_outcome(), OverallOutcome::Failed);
    }

    #[test]
    fn test_dense_hole_grid_fails_without_panicking() {
        let operations = vec![
            OperationDirective::new("strategic_holes")
                .with_param("hole_diameter", 0.00009)
                .with_param("spacing", 0.0001),
            OperationDirective::new("rotate"),
        ];
        let (report, doc) = run(BRACKET, &operations);

        let results = report.results();
        assert_eq!(results[0].outcome, Outcome::Failed);
        assert_eq!(results[0].failure, Some(FailureClass::Adapter));
        assert_eq!(results[1].outcome, Outcome::Success);
        assert_eq!(doc.mass_properties().unwrap().volume_mm3, 8000.0);
    }

    #[test]
    fn test_observer_sees_every_result() {
        let mut doc = SimulatedKernel::new().load(BRACKET).unwrap();
        let operations = vec![
            OperationDirective::new("scale").with_param("factor", 0.5),
            OperationDirective::new("extrude"),
        ];
        let mut seen = Vec::new();
        OperationExecutor::new().execute(doc.as_mut(), &operations, &mut |r| {
            seen.push(r.outcome)
        });
        assert_eq!(seen, vec![Outcome::Success, Outcome::Skipped]);
    }
}
