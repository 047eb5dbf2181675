//! Model analysis service
//!
//! Produces the read-only snapshot of a document that the refinement service
//! uses to turn a job's command into concrete operations.

use remodel_core::domain::analysis::{AnalysisResult, Dimensions};
use thiserror::Error;
use tracing::debug;

use crate::geometry::{AdapterError, Document};

const NO_MATERIAL: &str = "No material assigned";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error("document '{0}' has no bodies")]
    NoBodies(String),

    #[error(transparent)]
    Geometry(#[from] AdapterError),
}

/// Service trait for analysing documents
pub trait AnalysisService: Send + Sync {
    /// Takes a snapshot of the document without modifying it
    fn analyze(&self, document: &dyn Document) -> Result<AnalysisResult, AnalysisError>;
}

/// Analyzer reading everything through the geometry adapter
#[derive(Debug, Clone, Default)]
pub struct ModelAnalyzer;

impl ModelAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl AnalysisService for ModelAnalyzer {
    fn analyze(&self, document: &dyn Document) -> Result<AnalysisResult, AnalysisError> {
        let bodies = document.bodies();
        if bodies.is_empty() {
            return Err(AnalysisError::NoBodies(document.name().to_string()));
        }

        let props = document.mass_properties()?;
        let volume_cm3 = props.volume_mm3 / 1000.0;
        let surface_area_cm2 = props.area_mm2 / 100.0;
        let size = document
            .bounding_box()
            .map(|b| b.size())
            .unwrap_or([0.0; 3]);

        let material = bodies
            .iter()
            .find_map(|b| b.material.clone())
            .unwrap_or_else(|| NO_MATERIAL.to_string());

        // Volume over area is half the wall of a thin plate; x10 converts cm to mm
        let wall_thickness_estimate_mm =
            (surface_area_cm2 > 0.0).then(|| round2(volume_cm3 / surface_area_cm2 * 10.0));

        let result = AnalysisResult {
            mass_grams: round2(props.mass_grams),
            volume_cm3: round2(volume_cm3),
            body_count: bodies.len() as u32,
            feature_summary: document.feature_counts(),
            bounding_box_mm: Dimensions {
                x: round2(size[0]),
                y: round2(size[1]),
                z: round2(size[2]),
            },
            component_count: document.component_count(),
            can_shell: bodies.iter().any(|b| b.solid),
            material,
            surface_area_cm2: round2(surface_area_cm2),
            wall_thickness_estimate_mm,
        };

        debug!(
            "Analyzed '{}': {} bodies, {} g, {} cm3",
            document.name(),
            result.body_count,
            result.mass_grams,
            result.volume_cm3
        );
        Ok(result)
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
