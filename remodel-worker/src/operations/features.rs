//! Feature operations: shells, fillets, ribs and hole grids

use remodel_core::domain::operation::{EntityRef, ParamValue, Params};

use super::{OperationError, OperationHandler, positive, require_bodies, require_solid, target_bodies};
use crate::geometry::{AdapterError, Document, EdgeSelection, Resolved, Transform};

pub struct ShellBody;

impl OperationHandler for ShellBody {
    fn prepare(&self, document: &dyn Document, params: &Params) -> Result<Transform, OperationError> {
        require_solid(document)?;
        let thickness_mm = positive(params, "wall_thickness", 2.0)?;

        let bodies = target_bodies(document, params, "target", EntityRef::FirstSolid)?;
        let Some(body) = bodies.first().copied() else {
            return Err(OperationError::Precondition(
                "no body to shell".to_string(),
            ));
        };
        if !document.bodies().iter().any(|b| b.id == body && b.solid) {
            return Err(OperationError::Precondition(
                "shell target is not a solid body".to_string(),
            ));
        }

        // "none" keeps the shell closed
        let open_face = match params.get("open_face") {
            Some(ParamValue::Text(t)) if t == "none" => None,
            _ => {
                let entity = params.entity("open_face", EntityRef::TopFace)?;
                match document.resolve(&entity) {
                    Ok(Resolved::Face(face)) if face.body == body => Some(face),
                    Ok(_) => {
                        return Err(OperationError::Precondition(format!(
                            "'{}' is not a face of the shell target",
                            entity
                        )));
                    }
                    Err(AdapterError::UnknownEntity(name)) => {
                        return Err(OperationError::Precondition(format!(
                            "no face matches '{}'",
                            name
                        )));
                    }
                    Err(err) => return Err(err.into()),
                }
            }
        };

        Ok(Transform::Shell {
            body,
            open_face,
            thickness_mm,
        })
    }
}

pub struct FilletEdges;

impl OperationHandler for FilletEdges {
    fn prepare(&self, document: &dyn Document, params: &Params) -> Result<Transform, OperationError> {
        require_bodies(document)?;
        let selection: EdgeSelection = params
            .text("edge_selection", "linear")?
            .parse()
            .map_err(OperationError::Precondition)?;
        let radius_mm = positive(params, "radius", 1.0)?;
        let bodies = target_bodies(document, params, "target", EntityRef::All)?;

        let edges: Vec<_> = document
            .edges(selection)
            .into_iter()
            .filter(|e| bodies.contains(&e.body))
            .collect();
        if edges.is_empty() {
            return Err(OperationError::Precondition(format!(
                "edge selection '{}' matched no edges",
                selection
            )));
        }

        Ok(Transform::Fillet { edges, radius_mm })
    }
}

pub struct AddRibs;

impl OperationHandler for AddRibs {
    fn prepare(&self, document: &dyn Document, params: &Params) -> Result<Transform, OperationError> {
        require_bodies(document)?;
        let thickness_mm = positive(params, "thickness", 1.5)?;
        let height_mm = positive(params, "height", 10.0)?;
        let pattern = params.text("pattern", "cross_bracing")?;
        if !matches!(pattern.as_str(), "cross_bracing" | "linear") {
            return Err(OperationError::Precondition(format!(
                "unknown rib pattern '{}'",
                pattern
            )));
        }

        Ok(Transform::AddRib {
            thickness_mm,
            height_mm,
            pattern,
        })
    }
}

/// Grid of through holes; strategic lightening holes and ventilation differ
/// only in parameter names and defaults
pub struct HoleGrid {
    diameter_key: &'static str,
    default_diameter: f64,
    default_spacing: f64,
}

pub static STRATEGIC_HOLES: HoleGrid = HoleGrid {
    diameter_key: "hole_diameter",
    default_diameter: 5.0,
    default_spacing: 15.0,
};

pub static VENTILATION: HoleGrid = HoleGrid {
    diameter_key: "hole_size",
    default_diameter: 5.0,
    default_spacing: 20.0,
};

impl OperationHandler for HoleGrid {
    fn prepare(&self, document: &dyn Document, params: &Params) -> Result<Transform, OperationError> {
        require_solid(document)?;
        let diameter_mm = positive(params, self.diameter_key, self.default_diameter)?;
        let spacing_mm = positive(params, "spacing", self.default_spacing)?;
        if diameter_mm >= spacing_mm {
            return Err(OperationError::Precondition(format!(
                "hole diameter {} mm must be smaller than spacing {} mm",
                diameter_mm, spacing_mm
            )));
        }

        let bodies = target_bodies(document, params, "target", EntityRef::FirstSolid)?;
        let Some(body) = bodies.first().copied() else {
            return Err(OperationError::Precondition(
                "no body to cut holes into".to_string(),
            ));
        };

        Ok(Transform::CutHoles {
            body,
            diameter_mm,
            spacing_mm,
        })
    }
}
