//! Operation handlers
//!
//! A handler turns one directive's parameters into a [`Transform`] after
//! checking every precondition against the document. Handlers never mutate;
//! the executor applies the prepared transform.
//!
//! The registry is a fixed `match` over [`OperationKind`], so adding a kind
//! without deciding how it is handled does not compile.

mod features;
mod transforms;

use remodel_core::domain::operation::{EntityRef, OperationKind, ParamError, Params};
use thiserror::Error;

use crate::geometry::{AdapterError, Axis, BodyId, Document, Resolved, Transform};

/// Why a single operation could not be applied
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OperationError {
    /// Parameters or document state rule the operation out; nothing was touched
    #[error("precondition failed: {0}")]
    Precondition(String),

    #[error("{0}")]
    Adapter(#[from] AdapterError),
}

impl From<ParamError> for OperationError {
    fn from(err: ParamError) -> Self {
        OperationError::Precondition(err.to_string())
    }
}

/// Validates a directive against a document and plans its transform
pub trait OperationHandler: Send + Sync {
    fn prepare(&self, document: &dyn Document, params: &Params)
    -> Result<Transform, OperationError>;
}

/// How a kind is handled
pub enum Handler {
    Geometry(&'static dyn OperationHandler),
    /// Known kind without a kernel capability behind it
    Placeholder,
}

pub fn handler_for(kind: OperationKind) -> Handler {
    match kind {
        OperationKind::Scale => Handler::Geometry(&transforms::Scale),
        OperationKind::Mirror => Handler::Geometry(&transforms::Mirror),
        OperationKind::Rotate => Handler::Geometry(&transforms::Rotate),
        OperationKind::Move => Handler::Geometry(&transforms::Move),
        OperationKind::ShellBody => Handler::Geometry(&features::ShellBody),
        OperationKind::FilletEdges => Handler::Geometry(&features::FilletEdges),
        OperationKind::AddRibs => Handler::Geometry(&features::AddRibs),
        OperationKind::StrategicHoles => Handler::Geometry(&features::STRATEGIC_HOLES),
        OperationKind::AddVentilation => Handler::Geometry(&features::VENTILATION),
        OperationKind::Pattern
        | OperationKind::Extrude
        | OperationKind::TopologyOptimization
        | OperationKind::LatticeInfill
        | OperationKind::VariableWallThickness
        | OperationKind::AddGussets
        | OperationKind::DraftAngles => Handler::Placeholder,
    }
}

// =============================================================================
// Shared precondition helpers
// =============================================================================

fn require_bodies(document: &dyn Document) -> Result<(), OperationError> {
    if document.bodies().is_empty() {
        return Err(OperationError::Precondition(
            "document has no bodies".to_string(),
        ));
    }
    Ok(())
}

fn require_solid(document: &dyn Document) -> Result<(), OperationError> {
    if !document.bodies().iter().any(|b| b.solid) {
        return Err(OperationError::Precondition(
            "document has no solid body".to_string(),
        ));
    }
    Ok(())
}

/// Resolves the body entity under `key`; resolution failures are unmet
/// preconditions, not kernel rejections
fn target_bodies(
    document: &dyn Document,
    params: &Params,
    key: &str,
    default: EntityRef,
) -> Result<Vec<BodyId>, OperationError> {
    let entity = params.entity(key, default)?;
    match document.resolve(&entity) {
        Ok(Resolved::Bodies(bodies)) => Ok(bodies),
        Ok(Resolved::Face(_)) => Err(OperationError::Precondition(format!(
            "'{}' is a face, expected a body",
            entity
        ))),
        Err(AdapterError::UnknownEntity(name)) => Err(OperationError::Precondition(format!(
            "no body matches '{}'",
            name
        ))),
        Err(err) => Err(err.into()),
    }
}

fn positive(params: &Params, key: &str, default: f64) -> Result<f64, OperationError> {
    let value = params.number(key, default)?;
    if !value.is_finite() || value <= 0.0 {
        return Err(OperationError::Precondition(format!(
            "'{}' must be greater than 0, got {}",
            key, value
        )));
    }
    Ok(value)
}

fn axis(params: &Params, key: &str, default: Axis) -> Result<Axis, OperationError> {
    match params.get(key) {
        None => Ok(default),
        Some(_) => params
            .text(key, "")?
            .parse()
            .map_err(OperationError::Precondition),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::SimulatedKernel;
    use crate::geometry::simulated::fixtures::{BRACKET, EMPTY};

    #[test]
    fn test_registry_matches_catalog() {
        for kind in OperationKind::ALL {
            let placeholder = matches!(handler_for(kind), Handler::Placeholder);
            assert_eq!(placeholder, kind.is_placeholder(), "{}", kind);
        }
    }

    #[test]
    fn test_type_mismatch_is_precondition() {
        let doc = SimulatedKernel::new().load(BRACKET).unwrap();
        let mut params = Params::default();
        params.insert("factor", "big");

        let Handler::Geometry(handler) = handler_for(OperationKind::Scale) else {
            panic!("scale is implemented");
        };
        let err = handler.prepare(doc.as_ref(), &params).unwrap_err();
        assert!(matches!(err, OperationError::Precondition(_)));
    }

    #[test]
    fn test_empty_document_fails_body_preconditions() {
        let doc = SimulatedKernel::new().load(EMPTY).unwrap();
        for kind in OperationKind::ALL {
            if let Handler::Geometry(handler) = handler_for(kind) {
                let err = handler.prepare(doc.as_ref(), &Params::default()).unwrap_err();
                assert!(
                    matches!(err, OperationError::Precondition(_)),
                    "{} gave {:?}",
                    kind,
                    err
                );
            }
        }
    }

    #[test]
    fn test_invalid_axis() {
        let doc = SimulatedKernel::new().load(BRACKET).unwrap();
        let mut params = Params::default();
        params.insert("axis", "W");

        let Handler::Geometry(handler) = handler_for(OperationKind::Rotate) else {
            panic!("rotate is implemented");
        };
        assert!(matches!(
            handler.prepare(doc.as_ref(), &params),
            Err(OperationError::Precondition(_))
        ));
    }
}
