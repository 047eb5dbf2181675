//! Rigid and scaling transforms over whole bodies

use remodel_core::domain::operation::{EntityRef, Params};

use super::{OperationError, OperationHandler, axis, positive, require_bodies, target_bodies};
use crate::geometry::{Axis, Document, Transform};

pub struct Scale;

impl OperationHandler for Scale {
    fn prepare(&self, document: &dyn Document, params: &Params) -> Result<Transform, OperationError> {
        require_bodies(document)?;
        let factors = if params.flag("uniform", true)? {
            let factor = positive(params, "factor", 1.0)?;
            [factor; 3]
        } else {
            [
                positive(params, "x_factor", 1.0)?,
                positive(params, "y_factor", 1.0)?,
                positive(params, "z_factor", 1.0)?,
            ]
        };
        Ok(Transform::Scale {
            bodies: target_bodies(document, params, "target", EntityRef::All)?,
            factors,
        })
    }
}

pub struct Mirror;

impl OperationHandler for Mirror {
    fn prepare(&self, document: &dyn Document, params: &Params) -> Result<Transform, OperationError> {
        require_bodies(document)?;
        Ok(Transform::Mirror {
            plane: axis(params, "axis", Axis::X)?,
            bodies: target_bodies(document, params, "target", EntityRef::All)?,
        })
    }
}

pub struct Rotate;

impl OperationHandler for Rotate {
    fn prepare(&self, document: &dyn Document, params: &Params) -> Result<Transform, OperationError> {
        require_bodies(document)?;
        let degrees = params.number("angle", 90.0)?;
        if !degrees.is_finite() {
            return Err(OperationError::Precondition(
                "'angle' must be a finite number".to_string(),
            ));
        }
        Ok(Transform::Rotate {
            axis: axis(params, "axis", Axis::Z)?,
            degrees,
            bodies: target_bodies(document, params, "target", EntityRef::All)?,
        })
    }
}

pub struct Move;

impl OperationHandler for Move {
    fn prepare(&self, document: &dyn Document, params: &Params) -> Result<Transform, OperationError> {
        require_bodies(document)?;
        let offset = [
            params.number("x", 0.0)?,
            params.number("y", 0.0)?,
            params.number("z", 0.0)?,
        ];
        Ok(Transform::Translate {
            bodies: target_bodies(document, params, "target", EntityRef::All)?,
            offset,
        })
    }
}
