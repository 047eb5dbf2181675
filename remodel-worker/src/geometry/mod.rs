//! Geometry capability layer
//!
//! The only place that touches CAD geometry. The analyzer and the operation
//! handlers work exclusively through the [`GeometryKernel`] and [`Document`]
//! traits, so a native kernel can replace the bundled [`SimulatedKernel`]
//! without changes elsewhere.
//!
//! Units are millimetres, grams and degrees throughout.

pub(crate) mod simulated;

pub use simulated::SimulatedKernel;

use remodel_core::domain::analysis::FeatureKind;
use remodel_core::domain::operation::EntityRef;
use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};
use std::path::Path;
use thiserror::Error;

/// Errors raised by a geometry kernel
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AdapterError {
    #[error("cannot open document: {0}")]
    Open(String),

    #[error("cannot save document: {0}")]
    Save(String),

    #[error("unknown entity '{0}'")]
    UnknownEntity(String),

    #[error("mass properties unavailable: {0}")]
    MassProperties(String),

    #[error("geometry became degenerate: {0}")]
    Degenerate(String),

    #[error("kernel rejected operation: {0}")]
    Rejected(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FaceId {
    pub body: BodyId,
    pub index: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EdgeId {
    pub body: BodyId,
    pub index: u32,
}

/// Summary of one body in a document
#[derive(Debug, Clone, PartialEq)]
pub struct BodyInfo {
    pub id: BodyId,
    pub name: String,
    pub solid: bool,
    pub manifold: bool,
    pub material: Option<String>,
}

/// Physical properties of the whole document
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MassProperties {
    pub mass_grams: f64,
    pub volume_mm3: f64,
    pub area_mm2: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl BoundingBox {
    pub fn size(&self) -> [f64; 3] {
        [
            self.max[0] - self.min[0],
            self.max[1] - self.min[1],
            self.max[2] - self.min[2],
        ]
    }

    pub fn center(&self) -> [f64; 3] {
        [
            (self.max[0] + self.min[0]) / 2.0,
            (self.max[1] + self.min[1]) / 2.0,
            (self.max[2] + self.min[2]) / 2.0,
        ]
    }

    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min: [
                self.min[0].min(other.min[0]),
                self.min[1].min(other.min[1]),
                self.min[2].min(other.min[2]),
            ],
            max: [
                self.max[0].max(other.max[0]),
                self.max[1].max(other.max[1]),
                self.max[2].max(other.max[2]),
            ],
        }
    }
}

/// Principal axis; for mirroring it names the plane normal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

impl std::str::FromStr for Axis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "X" => Ok(Axis::X),
            "Y" => Ok(Axis::Y),
            "Z" => Ok(Axis::Z),
            _ => Err(format!("'{}' is not an axis (expected X, Y or Z)", s)),
        }
    }
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Axis::X => write!(f, "X"),
            Axis::Y => write!(f, "Y"),
            Axis::Z => write!(f, "Z"),
        }
    }
}

/// Which edges an edge query returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeSelection {
    All,
    /// Straight edges only; these are the sharp ones a fillet rounds
    Linear,
}

impl std::str::FromStr for EdgeSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(EdgeSelection::All),
            "linear" | "sharp" => Ok(EdgeSelection::Linear),
            _ => Err(format!("unknown edge selection '{}'", s)),
        }
    }
}

impl std::fmt::Display for EdgeSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EdgeSelection::All => write!(f, "all"),
            EdgeSelection::Linear => write!(f, "linear"),
        }
    }
}

/// What an entity reference resolved to
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    Bodies(Vec<BodyId>),
    Face(FaceId),
}

/// A single geometry mutation
#[derive(Debug, Clone, PartialEq)]
pub enum Transform {
    /// Scale about the origin with per-axis factors
    Scale { bodies: Vec<BodyId>, factors: [f64; 3] },
    /// Hollow a solid body, removing `open_face`
    Shell {
        body: BodyId,
        open_face: Option<FaceId>,
        thickness_mm: f64,
    },
    Fillet { edges: Vec<EdgeId>, radius_mm: f64 },
    /// Add mirrored copies across the plane through the origin normal to `plane`
    Mirror { bodies: Vec<BodyId>, plane: Axis },
    Rotate {
        bodies: Vec<BodyId>,
        axis: Axis,
        degrees: f64,
    },
    Translate { bodies: Vec<BodyId>, offset: [f64; 3] },
    /// Add a rib body across the model footprint
    AddRib {
        thickness_mm: f64,
        height_mm: f64,
        pattern: String,
    },
    /// Cut a grid of through holes into a body
    CutHoles {
        body: BodyId,
        diameter_mm: f64,
        spacing_mm: f64,
    },
}

impl Transform {
    /// Human-readable account of a committed transform
    pub fn describe(&self, affected: usize) -> String {
        match self {
            Transform::Scale { factors, .. } if factors[0] == factors[1] && factors[1] == factors[2] => {
                format!("Scaled {} body(ies) by {}", affected, factors[0])
            }
            Transform::Scale { factors, .. } => format!(
                "Scaled {} body(ies) by ({}, {}, {})",
                affected, factors[0], factors[1], factors[2]
            ),
            Transform::Shell { thickness_mm, .. } => {
                format!("Shelled to {} mm wall thickness", thickness_mm)
            }
            Transform::Fillet { radius_mm, .. } => {
                format!("Added {} mm fillet to {} edges", radius_mm, affected)
            }
            Transform::Mirror { plane, .. } => {
                format!("Mirrored {} body(ies) along {} axis", affected, plane)
            }
            Transform::Rotate { axis, degrees, .. } => {
                format!("Rotated {}° around {}", degrees, axis)
            }
            Transform::Translate { offset, .. } => {
                format!("Moved ({}, {}, {}) mm", offset[0], offset[1], offset[2])
            }
            Transform::AddRib {
                thickness_mm,
                height_mm,
                pattern,
            } => format!(
                "Added {} {} rib(s) ({} mm x {} mm)",
                affected, pattern, thickness_mm, height_mm
            ),
            Transform::CutHoles { .. } if affected == 0 => {
                "Model too small for holes at this spacing".to_string()
            }
            Transform::CutHoles {
                diameter_mm,
                spacing_mm,
                ..
            } => format!(
                "Added {} holes ({} mm dia, {} mm spacing)",
                affected, diameter_mm, spacing_mm
            ),
        }
    }
}

/// An open CAD document
///
/// Queries never mutate. [`Document::apply`] is atomic: it either commits the
/// whole transform or leaves the document exactly as it was.
pub trait Document: Send {
    fn name(&self) -> &str;

    fn bodies(&self) -> Vec<BodyInfo>;

    fn component_count(&self) -> u32;

    fn mass_properties(&self) -> Result<MassProperties, AdapterError>;

    /// Extent of all bodies, `None` for an empty document
    fn bounding_box(&self) -> Option<BoundingBox>;

    fn feature_counts(&self) -> BTreeMap<FeatureKind, u32>;

    fn edges(&self, selection: EdgeSelection) -> Vec<EdgeId>;

    fn faces(&self, body: BodyId) -> Vec<FaceId>;

    fn resolve(&self, entity: &EntityRef) -> Result<Resolved, AdapterError>;

    /// Applies a transform, returning the number of entities it produced or
    /// modified (edges filleted, holes cut, bodies moved, ...)
    fn apply(&mut self, transform: &Transform) -> Result<usize, AdapterError>;

    fn save(&self, path: &Path) -> Result<(), AdapterError>;

    /// Releases the document; unsaved changes are discarded
    fn close(&mut self);
}

/// Entry point to a geometry kernel
pub trait GeometryKernel: Send + Sync {
    fn name(&self) -> &'static str;

    fn open(&self, path: &Path) -> Result<Box<dyn Document>, AdapterError>;
}

/// An open document that is closed when dropped
///
/// Guarantees release on every exit path of a job, including errors and
/// cancellation.
pub struct DocumentSession {
    document: Box<dyn Document>,
}

impl DocumentSession {
    pub fn open(kernel: &dyn GeometryKernel, path: &Path) -> Result<Self, AdapterError> {
        Ok(Self {
            document: kernel.open(path)?,
        })
    }
}

impl Deref for DocumentSession {
    type Target = dyn Document;

    fn deref(&self) -> &Self::Target {
        self.document.as_ref()
    }
}

impl DerefMut for DocumentSession {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.document.as_mut()
    }
}

impl Drop for DocumentSession {
    fn drop(&mut self) {
        self.document.close();
    }
}

/// A document is valid when it has bodies and all of them are manifold
pub fn is_valid(document: &dyn Document) -> bool {
    let bodies = document.bodies();
    !bodies.is_empty() && bodies.iter().all(|b| b.manifold)
}
