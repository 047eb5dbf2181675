//! In-process geometry kernel over JSON model documents
//!
//! A model artifact is a JSON file listing bodies with their physical
//! properties and topology counts. Transforms update those properties with
//! closed-form approximations, which is enough to drive the whole job
//! lifecycle without a CAD installation.

use remodel_core::domain::analysis::FeatureKind;
use remodel_core::domain::operation::EntityRef;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::f64::consts::PI;
use std::path::Path;
use tracing::debug;

use super::{
    AdapterError, Axis, BodyId, BodyInfo, BoundingBox, Document, EdgeId, EdgeSelection, FaceId,
    GeometryKernel, MassProperties, Resolved, Transform,
};

/// Kernel that opens JSON model documents
#[derive(Debug, Clone, Default)]
pub struct SimulatedKernel;

impl SimulatedKernel {
    pub fn new() -> Self {
        Self
    }

    /// Parses a model document from its JSON text
    pub fn load(&self, json: &str) -> Result<Box<dyn Document>, AdapterError> {
        let model: Model =
            serde_json::from_str(json).map_err(|e| AdapterError::Open(e.to_string()))?;
        Ok(Box::new(SimulatedDocument {
            model,
            closed: false,
        }))
    }
}

impl GeometryKernel for SimulatedKernel {
    fn name(&self) -> &'static str {
        "simulated"
    }

    fn open(&self, path: &Path) -> Result<Box<dyn Document>, AdapterError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| AdapterError::Open(format!("{}: {}", path.display(), e)))?;
        debug!("Opened model document {}", path.display());
        self.load(&json)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Model {
    name: String,
    #[serde(default)]
    components: u32,
    #[serde(default)]
    features: BTreeMap<FeatureKind, u32>,
    #[serde(default)]
    bodies: Vec<Body>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Body {
    name: String,
    #[serde(default = "default_true")]
    solid: bool,
    #[serde(default = "default_true")]
    manifold: bool,
    #[serde(default)]
    material: Option<String>,
    #[serde(default = "default_density")]
    density_g_cm3: f64,
    volume_mm3: f64,
    area_mm2: f64,
    min: [f64; 3],
    max: [f64; 3],
    #[serde(default)]
    linear_edges: u32,
    #[serde(default)]
    curved_edges: u32,
    #[serde(default)]
    faces: u32,
}

fn default_true() -> bool {
    true
}

fn default_density() -> f64 {
    1.0
}

impl Body {
    fn bbox(&self) -> BoundingBox {
        BoundingBox {
            min: self.min,
            max: self.max,
        }
    }

    fn set_bbox(&mut self, bbox: BoundingBox) {
        self.min = bbox.min;
        self.max = bbox.max;
    }

    fn thinnest(&self) -> f64 {
        let size = self.bbox().size();
        size[0].min(size[1]).min(size[2])
    }

    fn edge_count(&self) -> u32 {
        self.linear_edges + self.curved_edges
    }
}

struct SimulatedDocument {
    model: Model,
    closed: bool,
}

impl SimulatedDocument {
    fn body_id(index: usize) -> BodyId {
        BodyId(index as u32)
    }

    fn body_named(&self, name: &str) -> Option<BodyId> {
        self.model
            .bodies
            .iter()
            .position(|b| b.name == name)
            .map(Self::body_id)
    }

    fn extreme_body(&self, largest: bool) -> Option<BodyId> {
        let mut best: Option<(usize, f64)> = None;
        for (i, body) in self.model.bodies.iter().enumerate() {
            let better = match best {
                None => true,
                Some((_, v)) if largest => body.volume_mm3 > v,
                Some((_, v)) => body.volume_mm3 < v,
            };
            if better {
                best = Some((i, body.volume_mm3));
            }
        }
        best.map(|(i, _)| Self::body_id(i))
    }
}

impl Document for SimulatedDocument {
    fn name(&self) -> &str {
        &self.model.name
    }

    fn bodies(&self) -> Vec<BodyInfo> {
        self.model
            .bodies
            .iter()
            .enumerate()
            .map(|(i, b)| BodyInfo {
                id: Self::body_id(i),
                name: b.name.clone(),
                solid: b.solid,
                manifold: b.manifold,
                material: b.material.clone(),
            })
            .collect()
    }

    fn component_count(&self) -> u32 {
        self.model.components
    }

    fn mass_properties(&self) -> Result<MassProperties, AdapterError> {
        let mut props = MassProperties {
            mass_grams: 0.0,
            volume_mm3: 0.0,
            area_mm2: 0.0,
        };
        for body in &self.model.bodies {
            if !body.manifold {
                return Err(AdapterError::MassProperties(format!(
                    "body '{}' is not manifold",
                    body.name
                )));
            }
            props.volume_mm3 += body.volume_mm3;
            props.area_mm2 += body.area_mm2;
            props.mass_grams += body.volume_mm3 / 1000.0 * body.density_g_cm3;
        }
        Ok(props)
    }

    fn bounding_box(&self) -> Option<BoundingBox> {
        self.model
            .bodies
            .iter()
            .map(Body::bbox)
            .reduce(|acc, b| acc.union(&b))
    }

    fn feature_counts(&self) -> BTreeMap<FeatureKind, u32> {
        self.model.features.clone()
    }

    fn edges(&self, selection: EdgeSelection) -> Vec<EdgeId> {
        let mut edges = Vec::new();
        for (i, body) in self.model.bodies.iter().enumerate() {
            let count = match selection {
                EdgeSelection::All => body.edge_count(),
                EdgeSelection::Linear => body.linear_edges,
            };
            edges.extend((0..count).map(|index| EdgeId {
                body: Self::body_id(i),
                index,
            }));
        }
        edges
    }

    fn faces(&self, body: BodyId) -> Vec<FaceId> {
        let count = self
            .model
            .bodies
            .get(body.0 as usize)
            .map_or(0, |b| b.faces);
        (0..count).map(|index| FaceId { body, index }).collect()
    }

    fn resolve(&self, entity: &EntityRef) -> Result<Resolved, AdapterError> {
        let unknown = || AdapterError::UnknownEntity(entity.to_string());
        let body = match entity {
            EntityRef::All => {
                if self.model.bodies.is_empty() {
                    return Err(unknown());
                }
                let all = (0..self.model.bodies.len()).map(Self::body_id).collect();
                return Ok(Resolved::Bodies(all));
            }
            EntityRef::LargestBody => self.extreme_body(true),
            EntityRef::SmallestBody => self.extreme_body(false),
            EntityRef::FirstSolid => self
                .model
                .bodies
                .iter()
                .position(|b| b.solid)
                .map(Self::body_id),
            // Face 0 is the top face and face 1 the bottom face of the first solid
            EntityRef::TopFace | EntityRef::BottomFace => {
                let index = if *entity == EntityRef::TopFace { 0 } else { 1 };
                let solid = self
                    .model
                    .bodies
                    .iter()
                    .position(|b| b.solid && b.faces > index)
                    .ok_or_else(unknown)?;
                return Ok(Resolved::Face(FaceId {
                    body: Self::body_id(solid),
                    index,
                }));
            }
            EntityRef::Named(name) => self.body_named(name),
        };
        body.map(|id| Resolved::Bodies(vec![id])).ok_or_else(unknown)
    }

    fn apply(&mut self, transform: &Transform) -> Result<usize, AdapterError> {
        if self.closed {
            return Err(AdapterError::Rejected("document is closed".to_string()));
        }
        let mut next = self.model.clone();
        let affected = apply_transform(&mut next, transform)?;
        self.model = next;
        Ok(affected)
    }

    fn save(&self, path: &Path) -> Result<(), AdapterError> {
        let json = serde_json::to_vec_pretty(&self.model)
            .map_err(|e| AdapterError::Save(e.to_string()))?;
        std::fs::write(path, json)
            .map_err(|e| AdapterError::Save(format!("{}: {}", path.display(), e)))?;
        debug!("Saved model document {}", path.display());
        Ok(())
    }

    fn close(&mut self) {
        if !self.closed {
            debug!("Closing model document '{}'", self.model.name);
            self.closed = true;
        }
    }
}

// =============================================================================
// Transforms
// =============================================================================

fn apply_transform(model: &mut Model, transform: &Transform) -> Result<usize, AdapterError> {
    let affected = match transform {
        Transform::Scale { bodies, factors } => scale(model, bodies, *factors)?,
        Transform::Shell {
            body,
            open_face,
            thickness_mm,
        } => shell(model, *body, *open_face, *thickness_mm)?,
        Transform::Fillet { edges, radius_mm } => fillet(model, edges, *radius_mm)?,
        Transform::Mirror { bodies, plane } => mirror(model, bodies, *plane)?,
        Transform::Rotate {
            bodies,
            axis,
            degrees,
        } => rotate(model, bodies, *axis, *degrees)?,
        Transform::Translate { bodies, offset } => translate(model, bodies, *offset)?,
        Transform::AddRib {
            thickness_mm,
            height_mm,
            pattern,
        } => add_rib(model, *thickness_mm, *height_mm, pattern)?,
        Transform::CutHoles {
            body,
            diameter_mm,
            spacing_mm,
        } => cut_holes(model, *body, *diameter_mm, *spacing_mm)?,
    };
    Ok(affected)
}

fn bump(model: &mut Model, feature: FeatureKind) {
    let count = model.features.entry(feature).or_insert(0);
    *count = count.saturating_add(1);
}

/// Grows a topology count, rejecting totals a body cannot hold
fn add_count(count: u32, extra: usize, what: &str) -> Result<u32, AdapterError> {
    u32::try_from(extra)
        .ok()
        .and_then(|extra| count.checked_add(extra))
        .ok_or_else(|| AdapterError::Degenerate(format!("too many {} on one body", what)))
}

fn body_mut(model: &mut Model, id: BodyId) -> Result<&mut Body, AdapterError> {
    model
        .bodies
        .get_mut(id.0 as usize)
        .ok_or_else(|| AdapterError::UnknownEntity(format!("body #{}", id.0)))
}

fn require_bodies(bodies: &[BodyId]) -> Result<(), AdapterError> {
    if bodies.is_empty() {
        return Err(AdapterError::Rejected("no bodies selected".to_string()));
    }
    Ok(())
}

fn scale(model: &mut Model, bodies: &[BodyId], factors: [f64; 3]) -> Result<usize, AdapterError> {
    require_bodies(bodies)?;
    if factors.iter().any(|f| !f.is_finite() || *f <= 0.0) {
        return Err(AdapterError::Degenerate(format!(
            "scale factors {:?} must be positive",
            factors
        )));
    }
    let volume_ratio = factors[0] * factors[1] * factors[2];
    for id in bodies {
        let body = body_mut(model, *id)?;
        body.volume_mm3 *= volume_ratio;
        body.area_mm2 *= volume_ratio.powf(2.0 / 3.0);
        for axis in 0..3 {
            body.min[axis] *= factors[axis];
            body.max[axis] *= factors[axis];
        }
    }
    bump(model, FeatureKind::Scales);
    Ok(bodies.len())
}

fn shell(
    model: &mut Model,
    id: BodyId,
    open_face: Option<FaceId>,
    thickness: f64,
) -> Result<usize, AdapterError> {
    let body = body_mut(model, id)?;
    if !body.solid {
        return Err(AdapterError::Rejected(format!(
            "body '{}' is not solid",
            body.name
        )));
    }
    if thickness <= 0.0 || thickness * 2.0 >= body.thinnest() {
        return Err(AdapterError::Rejected(format!(
            "wall thickness {} mm does not fit body '{}' ({:.2} mm at its thinnest)",
            thickness,
            body.name,
            body.thinnest()
        )));
    }

    let size = body.bbox().size();
    // The open face removes one wall along Z
    let z_walls = if open_face.is_some() { 1.0 } else { 2.0 };
    let inner_ratio = ((size[0] - 2.0 * thickness) / size[0])
        * ((size[1] - 2.0 * thickness) / size[1])
        * ((size[2] - z_walls * thickness) / size[2]);

    body.volume_mm3 *= 1.0 - inner_ratio;
    body.area_mm2 *= 1.0 + inner_ratio.powf(2.0 / 3.0);
    body.faces = add_count(body.faces, body.faces as usize, "faces")?
        .saturating_sub(u32::from(open_face.is_some()));
    bump(model, FeatureKind::Shells);
    Ok(1)
}

fn fillet(model: &mut Model, edges: &[EdgeId], radius: f64) -> Result<usize, AdapterError> {
    if edges.is_empty() {
        return Err(AdapterError::Rejected("no edges to fillet".to_string()));
    }

    let mut per_body: BTreeMap<BodyId, BTreeSet<u32>> = BTreeMap::new();
    for edge in edges {
        per_body.entry(edge.body).or_default().insert(edge.index);
    }

    let mut filleted = 0;
    for (id, indices) in per_body {
        let body = body_mut(model, id)?;
        if let Some(bad) = indices.iter().find(|i| **i >= body.edge_count()) {
            return Err(AdapterError::UnknownEntity(format!(
                "edge #{} of body '{}'",
                bad, body.name
            )));
        }
        if radius * 2.0 >= body.thinnest() {
            return Err(AdapterError::Degenerate(format!(
                "fillet radius {} mm consumes body '{}'",
                radius, body.name
            )));
        }

        let size = body.bbox().size();
        let mean_edge_length = (size[0] + size[1] + size[2]) / 3.0;
        let removed = radius * radius * (1.0 - PI / 4.0) * mean_edge_length * indices.len() as f64;
        if removed >= body.volume_mm3 {
            return Err(AdapterError::Degenerate(format!(
                "fillets would remove all of body '{}'",
                body.name
            )));
        }

        let linear = indices.iter().filter(|i| **i < body.linear_edges).count() as u32;
        body.volume_mm3 -= removed;
        body.linear_edges -= linear;
        body.curved_edges = add_count(body.curved_edges, linear as usize * 2, "edges")?;
        body.faces = add_count(body.faces, indices.len(), "faces")?;
        filleted += indices.len();
    }

    bump(model, FeatureKind::Fillets);
    Ok(filleted)
}

fn mirror(model: &mut Model, bodies: &[BodyId], plane: Axis) -> Result<usize, AdapterError> {
    require_bodies(bodies)?;
    let axis = plane.index();
    let mut copies = Vec::with_capacity(bodies.len());
    for id in bodies {
        let mut copy = body_mut(model, *id)?.clone();
        copy.name = format!("{} (mirror {})", copy.name, plane);
        let (min, max) = (copy.min[axis], copy.max[axis]);
        copy.min[axis] = -max;
        copy.max[axis] = -min;
        copies.push(copy);
    }
    model.bodies.extend(copies);
    bump(model, FeatureKind::Mirrors);
    Ok(bodies.len())
}

fn rotate(
    model: &mut Model,
    bodies: &[BodyId],
    axis: Axis,
    degrees: f64,
) -> Result<usize, AdapterError> {
    require_bodies(bodies)?;
    let (sin, cos) = degrees.to_radians().sin_cos();
    // Indices of the two coordinates that turn about `axis`
    let (a, b) = match axis {
        Axis::X => (1, 2),
        Axis::Y => (2, 0),
        Axis::Z => (0, 1),
    };

    for id in bodies {
        let body = body_mut(model, *id)?;
        let bbox = body.bbox();
        let mut rotated: Option<BoundingBox> = None;
        for corner in 0..8 {
            let mut p = [0.0; 3];
            for (i, coord) in p.iter_mut().enumerate() {
                *coord = if corner & (1 << i) == 0 {
                    bbox.min[i]
                } else {
                    bbox.max[i]
                };
            }
            let (pa, pb) = (p[a], p[b]);
            p[a] = pa * cos - pb * sin;
            p[b] = pa * sin + pb * cos;
            let point = BoundingBox { min: p, max: p };
            rotated = Some(match rotated {
                Some(acc) => acc.union(&point),
                None => point,
            });
        }
        if let Some(rotated) = rotated {
            body.set_bbox(rotated);
        }
    }
    bump(model, FeatureKind::Moves);
    Ok(bodies.len())
}

fn translate(model: &mut Model, bodies: &[BodyId], offset: [f64; 3]) -> Result<usize, AdapterError> {
    require_bodies(bodies)?;
    for id in bodies {
        let body = body_mut(model, *id)?;
        for axis in 0..3 {
            body.min[axis] += offset[axis];
            body.max[axis] += offset[axis];
        }
    }
    bump(model, FeatureKind::Moves);
    Ok(bodies.len())
}

fn add_rib(
    model: &mut Model,
    thickness: f64,
    height: f64,
    pattern: &str,
) -> Result<usize, AdapterError> {
    let (Some(first), Some(extent)) = (
        model.bodies.first().cloned(),
        model.bodies.iter().map(Body::bbox).reduce(|a, b| a.union(&b)),
    ) else {
        return Err(AdapterError::Rejected(
            "cannot place a rib in an empty document".to_string(),
        ));
    };

    // Cross bracing adds one rib along X and one along Y
    let directions: &[usize] = if pattern == "cross_bracing" {
        &[0, 1]
    } else {
        &[0]
    };

    let size = extent.size();
    let center = extent.center();
    for &along in directions {
        let across = 1 - along;
        let length = size[along] * 0.8;
        if length <= thickness {
            return Err(AdapterError::Rejected(format!(
                "model too small for a {} mm rib",
                thickness
            )));
        }

        let mut min = [0.0; 3];
        let mut max = [0.0; 3];
        min[along] = center[along] - length / 2.0;
        max[along] = center[along] + length / 2.0;
        min[across] = center[across] - thickness / 2.0;
        max[across] = center[across] + thickness / 2.0;
        min[2] = extent.min[2];
        max[2] = extent.min[2] + height;

        let index = model.bodies.len() + 1;
        model.bodies.push(Body {
            name: format!("Rib{}", index),
            solid: true,
            manifold: true,
            material: first.material.clone(),
            density_g_cm3: first.density_g_cm3,
            volume_mm3: thickness * height * length,
            area_mm2: 2.0 * (thickness * height + thickness * length + height * length),
            min,
            max,
            linear_edges: 12,
            curved_edges: 0,
            faces: 6,
        });
        bump(model, FeatureKind::Ribs);
    }
    Ok(directions.len())
}

/// Largest grid a single hole operation may cut
const MAX_HOLES: usize = 10_000;

fn cut_holes(
    model: &mut Model,
    id: BodyId,
    diameter: f64,
    spacing: f64,
) -> Result<usize, AdapterError> {
    let body = body_mut(model, id)?;
    if !body.solid {
        return Err(AdapterError::Rejected(format!(
            "body '{}' is not solid",
            body.name
        )));
    }
    if diameter <= 0.0 || diameter >= spacing {
        return Err(AdapterError::Rejected(format!(
            "hole diameter {} mm must be positive and below the {} mm spacing",
            diameter, spacing
        )));
    }

    // Grid positions stay one spacing clear of the body outline
    let along = |axis: usize| {
        let span = body.max[axis] - body.min[axis] - 2.0 * spacing;
        (span / spacing).ceil().max(0.0)
    };
    let grid = along(0) * along(1);
    if grid > MAX_HOLES as f64 {
        return Err(AdapterError::Rejected(format!(
            "a {} mm spacing needs {} holes, more than the {} allowed",
            spacing, grid, MAX_HOLES
        )));
    }
    let holes = grid as usize;
    if holes == 0 {
        return Ok(0);
    }

    let depth = body.bbox().size()[2];
    let radius = diameter / 2.0;
    let removed = PI * radius * radius * depth * holes as f64;
    if removed >= body.volume_mm3 {
        return Err(AdapterError::Degenerate(format!(
            "holes would remove all of body '{}'",
            body.name
        )));
    }

    body.volume_mm3 -= removed;
    body.area_mm2 += PI * diameter * depth * holes as f64 - 2.0 * PI * radius * radius * holes as f64;
    body.faces = add_count(body.faces, holes, "faces")?;
    body.curved_edges = add_count(body.curved_edges, 2 * holes, "edges")?;
    bump(model, FeatureKind::Holes);
    Ok(holes)
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    fn bracket() -> Box<dyn Document> {
        SimulatedKernel::new().load(BRACKET).unwrap()
    }

    fn mass(doc: &dyn Document) -> f64 {
        doc.mass_properties().unwrap().mass_grams
    }

    #[test]
    fn test_mass_properties() {
        let doc = bracket();
        let props = doc.mass_properties().unwrap();
        assert_eq!(props.volume_mm3, 8000.0);
        assert!((props.mass_grams - 9.92).abs() < 1e-9);
        assert_eq!(doc.bounding_box().unwrap().size(), [40.0, 20.0, 10.0]);
    }

    #[test]
    fn test_non_manifold_mass_properties_fail() {
        let doc = SimulatedKernel::new().load(BROKEN).unwrap();
        assert!(matches!(
            doc.mass_properties(),
            Err(AdapterError::MassProperties(_))
        ));
    }

    #[test]
    fn test_resolve_entities() {
        let doc = bracket();
        assert_eq!(
            doc.resolve(&EntityRef::FirstSolid).unwrap(),
            Resolved::Bodies(vec![BodyId(0)])
        );
        assert_eq!(
            doc.resolve(&EntityRef::Named("Body1".to_string())).unwrap(),
            Resolved::Bodies(vec![BodyId(0)])
        );
        assert_eq!(
            doc.resolve(&EntityRef::TopFace).unwrap(),
            Resolved::Face(FaceId {
                body: BodyId(0),
                index: 0
            })
        );
        assert!(matches!(
            doc.resolve(&EntityRef::Named("Body9".to_string())),
            Err(AdapterError::UnknownEntity(_))
        ));
    }

    #[test]
    fn test_shell_reduces_mass() {
        let mut doc = bracket();
        let before = mass(doc.as_ref());
        let top = FaceId {
            body: BodyId(0),
            index: 0,
        };
        doc.apply(&Transform::Shell {
            body: BodyId(0),
            open_face: Some(top),
            thickness_mm: 2.0,
        })
        .unwrap();
        assert!(mass(doc.as_ref()) < before);
        assert_eq!(doc.feature_counts()[&FeatureKind::Shells], 1);
        assert_eq!(doc.faces(BodyId(0)).len(), 11);
    }

    #[test]
    fn test_failed_transform_leaves_document_unchanged() {
        let mut doc = bracket();
        let before = doc.mass_properties().unwrap();
        let features = doc.feature_counts();

        let err = doc
            .apply(&Transform::Shell {
                body: BodyId(0),
                open_face: None,
                thickness_mm: 6.0,
            })
            .unwrap_err();
        assert!(matches!(err, AdapterError::Rejected(_)));
        assert_eq!(doc.mass_properties().unwrap(), before);
        assert_eq!(doc.feature_counts(), features);
    }

    #[test]
    fn test_fillet_converts_linear_edges() {
        let mut doc = bracket();
        let edges = doc.edges(EdgeSelection::Linear);
        assert_eq!(edges.len(), 12);

        let n = doc
            .apply(&Transform::Fillet {
                edges,
                radius_mm: 1.0,
            })
            .unwrap();
        assert_eq!(n, 12);
        assert!(doc.edges(EdgeSelection::Linear).is_empty());
        assert_eq!(doc.edges(EdgeSelection::All).len(), 24);
    }

    #[test]
    fn test_oversized_fillet_is_degenerate() {
        let mut doc = bracket();
        let edges = doc.edges(EdgeSelection::Linear);
        let err = doc
            .apply(&Transform::Fillet {
                edges,
                radius_mm: 5.0,
            })
            .unwrap_err();
        assert!(matches!(err, AdapterError::Degenerate(_)));
    }

    #[test]
    fn test_mirror_adds_reflected_body() {
        let mut doc = bracket();
        doc.apply(&Transform::Mirror {
            bodies: vec![BodyId(0)],
            plane: Axis::X,
        })
        .unwrap();
        let bodies = doc.bodies();
        assert_eq!(bodies.len(), 2);
        assert_eq!(bodies[1].name, "Body1 (mirror X)");
        let bbox = doc.bounding_box().unwrap();
        assert_eq!(bbox.min[0], -40.0);
        assert_eq!(bbox.max[0], 40.0);
    }

    #[test]
    fn test_rotate_swaps_extent() {
        let mut doc = bracket();
        doc.apply(&Transform::Rotate {
            bodies: vec![BodyId(0)],
            axis: Axis::Z,
            degrees: 90.0,
        })
        .unwrap();
        let size = doc.bounding_box().unwrap().size();
        assert!((size[0] - 20.0).abs() < 1e-9);
        assert!((size[1] - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_holes_grid() {
        let mut doc = bracket();
        let holes = doc
            .apply(&Transform::CutHoles {
                body: BodyId(0),
                diameter_mm: 2.0,
                spacing_mm: 5.0,
            })
            .unwrap();
        assert_eq!(holes, 12);

        let none = doc
            .apply(&Transform::CutHoles {
                body: BodyId(0),
                diameter_mm: 5.0,
                spacing_mm: 15.0,
            })
            .unwrap();
        assert_eq!(none, 0);
    }

    #[test]
    fn test_dense_hole_grid_is_rejected() {
        let mut doc = bracket();
        let before = mass(doc.as_ref());

        let err = doc
            .apply(&Transform::CutHoles {
                body: BodyId(0),
                diameter_mm: 0.00009,
                spacing_mm: 0.0001,
            })
            .unwrap_err();
        assert!(matches!(err, AdapterError::Rejected(_)));
        assert_eq!(mass(doc.as_ref()), before);
    }

    #[test]
    fn test_topology_counts_never_overflow() {
        assert_eq!(add_count(6, 4, "faces").unwrap(), 10);
        assert!(matches!(
            add_count(u32::MAX, 1, "faces"),
            Err(AdapterError::Degenerate(_))
        ));
        assert!(matches!(
            add_count(0, usize::MAX, "edges"),
            Err(AdapterError::Degenerate(_))
        ));
    }

    #[test]
    fn test_shell_with_huge_face_count_is_rejected() {
        let json = BRACKET.replace("\"faces\": 6", &format!("\"faces\": {}", u32::MAX));
        let mut doc = SimulatedKernel::new().load(&json).unwrap();

        let err = doc
            .apply(&Transform::Shell {
                body: BodyId(0),
                open_face: None,
                thickness_mm: 2.0,
            })
            .unwrap_err();
        assert!(matches!(err, AdapterError::Degenerate(_)));
    }

    #[test]
    fn test_cross_bracing_adds_two_ribs() {
        let mut doc = bracket();
        let ribs = doc
            .apply(&Transform::AddRib {
                thickness_mm: 1.5,
                height_mm: 10.0,
                pattern: "cross_bracing".to_string(),
            })
            .unwrap();
        assert_eq!(ribs, 2);
        assert_eq!(doc.bodies().len(), 3);
        assert_eq!(doc.bodies()[1].material.as_deref(), Some("PLA"));
    }

    #[test]
    fn test_save_and_reopen() {
        let dir = std::env::temp_dir().join(format!("remodel-sim-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("out.json");

        let mut doc = bracket();
        doc.apply(&Transform::Translate {
            bodies: vec![BodyId(0)],
            offset: [5.0, 0.0, 0.0],
        })
        .unwrap();
        doc.save(&path).unwrap();

        let reopened = SimulatedKernel::new().open(&path).unwrap();
        assert_eq!(reopened.bounding_box().unwrap().min[0], 5.0);
        assert_eq!(reopened.feature_counts()[&FeatureKind::Moves], 1);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_closed_document_rejects_changes() {
        let mut doc = bracket();
        doc.close();
        assert!(
            doc.apply(&Transform::Translate {
                bodies: vec![BodyId(0)],
                offset: [1.0, 0.0, 0.0],
            })
            .is_err()
        );
    }
}
