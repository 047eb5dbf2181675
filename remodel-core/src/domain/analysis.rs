//! Model analysis domain types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Kind of modelling feature counted in an analysis snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    Extrudes,
    Revolves,
    Holes,
    Fillets,
    Chamfers,
    Shells,
    Patterns,
    Mirrors,
    Moves,
    Scales,
    Ribs,
}

/// Axis-aligned extent of the model, in millimetres
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Dimensions {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Immutable snapshot of a model, taken once per job before refinement
///
/// Sent to the backend so the refinement service can turn the job's
/// natural-language command into concrete operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    #[serde(rename = "mass")]
    pub mass_grams: f64,
    #[serde(rename = "volume")]
    pub volume_cm3: f64,
    pub body_count: u32,
    pub feature_summary: BTreeMap<FeatureKind, u32>,
    pub bounding_box_mm: Dimensions,
    pub component_count: u32,
    /// Whether at least one body is solid, i.e. a shell operation can apply
    pub can_shell: bool,
    pub material: String,
    pub surface_area_cm2: f64,
    /// Rough wall thickness derived from volume over surface area
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wall_thickness_estimate_mm: Option<f64>,
}
