//! Operation directive domain types
//!
//! Directives are produced by the refinement service and consumed read-only
//! by the worker. The `kind` travels as a free-form string so that unknown
//! kinds survive deserialization and can be reported as skipped; the worker
//! resolves it against the fixed [`OperationKind`] catalog.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// One requested geometric change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationDirective {
    pub kind: String,
    #[serde(default)]
    pub params: Params,
    /// Free-text justification supplied by the refinement service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

impl OperationDirective {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            params: Params::default(),
            reasoning: None,
        }
    }

    /// Adds a parameter, builder style
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.insert(key, value);
        self
    }
}

/// A single parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Number(f64),
    Text(String),
    Entity { entity: EntityRef },
}

impl ParamValue {
    fn type_name(&self) -> &'static str {
        match self {
            ParamValue::Bool(_) => "boolean",
            ParamValue::Number(_) => "number",
            ParamValue::Text(_) => "string",
            ParamValue::Entity { .. } => "entity reference",
        }
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Number(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<EntityRef> for ParamValue {
    fn from(entity: EntityRef) -> Self {
        ParamValue::Entity { entity }
    }
}

/// Error raised when a parameter has the wrong type
#[derive(Debug, Clone, PartialEq, Error)]
#[error("parameter '{key}' must be a {expected}, got {found}")]
pub struct ParamError {
    pub key: String,
    pub expected: &'static str,
    pub found: &'static str,
}

/// Named parameters of a directive
///
/// Accessors take the default the operation uses when the parameter is
/// absent; a parameter that is present with the wrong type is an error.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params(BTreeMap<String, ParamValue>);

impl Params {
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.0.iter()
    }

    pub fn number(&self, key: &str, default: f64) -> Result<f64, ParamError> {
        match self.0.get(key) {
            None => Ok(default),
            Some(ParamValue::Number(n)) => Ok(*n),
            Some(other) => Err(mismatch(key, "number", other)),
        }
    }

    pub fn flag(&self, key: &str, default: bool) -> Result<bool, ParamError> {
        match self.0.get(key) {
            None => Ok(default),
            Some(ParamValue::Bool(b)) => Ok(*b),
            Some(other) => Err(mismatch(key, "boolean", other)),
        }
    }

    pub fn text(&self, key: &str, default: &str) -> Result<String, ParamError> {
        match self.0.get(key) {
            None => Ok(default.to_string()),
            Some(ParamValue::Text(s)) => Ok(s.clone()),
            Some(other) => Err(mismatch(key, "string", other)),
        }
    }

    /// Reads an entity reference, given either as a plain string or as
    /// `{"entity": "..."}`
    pub fn entity(&self, key: &str, default: EntityRef) -> Result<EntityRef, ParamError> {
        match self.0.get(key) {
            None => Ok(default),
            Some(ParamValue::Text(s)) => Ok(EntityRef::from(s.clone())),
            Some(ParamValue::Entity { entity }) => Ok(entity.clone()),
            Some(other) => Err(mismatch(key, "entity reference", other)),
        }
    }
}

fn mismatch(key: &str, expected: &'static str, found: &ParamValue) -> ParamError {
    ParamError {
        key: key.to_string(),
        expected,
        found: found.type_name(),
    }
}

/// Symbolic reference to a body or face, resolved by the geometry adapter
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EntityRef {
    LargestBody,
    SmallestBody,
    FirstSolid,
    TopFace,
    BottomFace,
    All,
    /// A body or face addressed by its name in the document
    Named(String),
}

impl From<String> for EntityRef {
    fn from(value: String) -> Self {
        match value.as_str() {
            "largest_body" => EntityRef::LargestBody,
            "smallest_body" => EntityRef::SmallestBody,
            "first_solid" => EntityRef::FirstSolid,
            "top_face" => EntityRef::TopFace,
            "bottom_face" => EntityRef::BottomFace,
            "all" => EntityRef::All,
            _ => EntityRef::Named(value),
        }
    }
}

impl From<EntityRef> for String {
    fn from(value: EntityRef) -> Self {
        value.to_string()
    }
}

impl std::fmt::Display for EntityRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityRef::LargestBody => write!(f, "largest_body"),
            EntityRef::SmallestBody => write!(f, "smallest_body"),
            EntityRef::FirstSolid => write!(f, "first_solid"),
            EntityRef::TopFace => write!(f, "top_face"),
            EntityRef::BottomFace => write!(f, "bottom_face"),
            EntityRef::All => write!(f, "all"),
            EntityRef::Named(name) => write!(f, "{}", name),
        }
    }
}

/// Catalog of operation kinds the worker knows about
///
/// Every kind has exactly one canonical wire name plus optional aliases the
/// refinement service is known to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Scale,
    ShellBody,
    FilletEdges,
    Mirror,
    Rotate,
    Move,
    AddRibs,
    StrategicHoles,
    AddVentilation,
    Pattern,
    Extrude,
    TopologyOptimization,
    LatticeInfill,
    VariableWallThickness,
    AddGussets,
    DraftAngles,
}

impl OperationKind {
    pub const ALL: [OperationKind; 16] = [
        OperationKind::Scale,
        OperationKind::ShellBody,
        OperationKind::FilletEdges,
        OperationKind::Mirror,
        OperationKind::Rotate,
        OperationKind::Move,
        OperationKind::AddRibs,
        OperationKind::StrategicHoles,
        OperationKind::AddVentilation,
        OperationKind::Pattern,
        OperationKind::Extrude,
        OperationKind::TopologyOptimization,
        OperationKind::LatticeInfill,
        OperationKind::VariableWallThickness,
        OperationKind::AddGussets,
        OperationKind::DraftAngles,
    ];

    /// Canonical wire name
    pub fn name(self) -> &'static str {
        match self {
            OperationKind::Scale => "scale",
            OperationKind::ShellBody => "shell_body",
            OperationKind::FilletEdges => "fillet_edges",
            OperationKind::Mirror => "mirror",
            OperationKind::Rotate => "rotate",
            OperationKind::Move => "move",
            OperationKind::AddRibs => "add_ribs",
            OperationKind::StrategicHoles => "strategic_holes",
            OperationKind::AddVentilation => "add_ventilation",
            OperationKind::Pattern => "pattern",
            OperationKind::Extrude => "extrude",
            OperationKind::TopologyOptimization => "topology_optimization",
            OperationKind::LatticeInfill => "lattice_infill",
            OperationKind::VariableWallThickness => "variable_wall_thickness",
            OperationKind::AddGussets => "add_gussets",
            OperationKind::DraftAngles => "apply_draft_angles",
        }
    }

    /// Additional wire names accepted for this kind
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            OperationKind::ShellBody => &["shell"],
            OperationKind::FilletEdges => &["fillet", "fillet_all_edges"],
            OperationKind::TopologyOptimization => &["run_topology_optimization"],
            OperationKind::LatticeInfill => &["add_lattice_infill"],
            OperationKind::DraftAngles => &["add_draft_angles"],
            _ => &[],
        }
    }

    /// Resolves a wire name (canonical or alias) to a kind
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == name || kind.aliases().contains(&name))
    }

    /// Kinds that are reserved in the catalog but not backed by geometry
    ///
    /// Generative design, lattice generation and similar analyses have no
    /// kernel capability behind them; applying one reports "not implemented".
    pub fn is_placeholder(self) -> bool {
        matches!(
            self,
            OperationKind::Pattern
                | OperationKind::Extrude
                | OperationKind::TopologyOptimization
                | OperationKind::LatticeInfill
                | OperationKind::VariableWallThickness
                | OperationKind::AddGussets
                | OperationKind::DraftAngles
        )
    }

    /// One-line description for operators
    pub fn description(self) -> &'static str {
        match self {
            OperationKind::Scale => "Resize bodies uniformly or per axis",
            OperationKind::ShellBody => "Hollow a solid body, opening its top face",
            OperationKind::FilletEdges => "Round sharp edges with a constant radius",
            OperationKind::Mirror => "Mirror bodies across a principal plane",
            OperationKind::Rotate => "Rotate bodies about a principal axis",
            OperationKind::Move => "Translate bodies",
            OperationKind::AddRibs => "Add a thin reinforcing rib body",
            OperationKind::StrategicHoles => "Cut a grid of through holes to remove material",
            OperationKind::AddVentilation => "Cut ventilation holes",
            OperationKind::Pattern => "Linear or circular feature pattern",
            OperationKind::Extrude => "Extrude a sketch profile",
            OperationKind::TopologyOptimization => "Generative topology optimization",
            OperationKind::LatticeInfill => "Lattice infill structure",
            OperationKind::VariableWallThickness => "Variable wall thickness",
            OperationKind::AddGussets => "Reinforcing gussets",
            OperationKind::DraftAngles => "Draft angles for moulding",
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_aliases_resolve() {
        assert_eq!(OperationKind::from_name("fillet"), Some(OperationKind::FilletEdges));
        assert_eq!(
            OperationKind::from_name("fillet_all_edges"),
            Some(OperationKind::FilletEdges)
        );
        assert_eq!(
            OperationKind::from_name("run_topology_optimization"),
            Some(OperationKind::TopologyOptimization)
        );
        assert_eq!(OperationKind::from_name("shell_body"), Some(OperationKind::ShellBody));
        assert_eq!(OperationKind::from_name("teleport"), None);
    }

    #[test]
    fn test_names_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for kind in OperationKind::ALL {
            assert!(seen.insert(kind.name()), "duplicate name {}", kind.name());
            for alias in kind.aliases() {
                assert!(seen.insert(alias), "duplicate alias {}", alias);
            }
        }
    }

    #[test]
    fn test_directive_deserialization() {
        let json = r#"{
            "kind": "shell_body",
            "params": {"wall_thickness": 2, "target": "largest_body", "keep_top": false},
            "reasoning": "reduce weight"
        }"#;

        let directive: OperationDirective = serde_json::from_str(json).unwrap();
        assert_eq!(directive.kind, "shell_body");
        assert_eq!(directive.params.number("wall_thickness", 0.0), Ok(2.0));
        assert_eq!(
            directive.params.entity("target", EntityRef::FirstSolid),
            Ok(EntityRef::LargestBody)
        );
        assert_eq!(directive.params.flag("keep_top", true), Ok(false));
    }

    #[test]
    fn test_entity_object_form() {
        let json = r#"{"kind": "fillet_edges", "params": {"target": {"entity": "Bracket"}}}"#;
        let directive: OperationDirective = serde_json::from_str(json).unwrap();
        assert_eq!(
            directive.params.entity("target", EntityRef::All),
            Ok(EntityRef::Named("Bracket".to_string()))
        );
    }

    #[test]
    fn test_param_type_mismatch() {
        let directive = OperationDirective::new("scale").with_param("factor", "big");
        let err = directive.params.number("factor", 1.0).unwrap_err();
        assert_eq!(err.key, "factor");
        assert_eq!(err.found, "string");
        assert!(err.to_string().contains("must be a number"));
    }

    #[test]
    fn test_missing_params_use_defaults() {
        let directive: OperationDirective = serde_json::from_str(r#"{"kind": "move"}"#).unwrap();
        assert!(directive.params.is_empty());
        assert_eq!(directive.params.number("x", 0.0), Ok(0.0));
        assert_eq!(directive.params.text("axis", "Z"), Ok("Z".to_string()));
    }
}
