use crate::{CampaignGraph, Connection, GraphError, SchemaRegistry};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Wildcard marker accepted in place of a target list
pub const WILDCARD: &str = "*";

/// What a source field may feed: anything, or an explicit set of
/// `"module_type.input_field"` keys.
///
/// On disk `Any` is the string `"*"`; any other bare string is rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTargets", into = "RawTargets")]
pub enum Targets {
    Any,
    Keys(Vec<String>),
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawTargets {
    Marker(String),
    Keys(Vec<String>),
}

impl TryFrom<RawTargets> for Targets {
    type Error = String;

    fn try_from(raw: RawTargets) -> Result<Self, Self::Error> {
        match raw {
            RawTargets::Marker(marker) if marker == WILDCARD => Ok(Targets::Any),
            RawTargets::Marker(other) => Err(format!(
                "expected \"{}\" or a list of targets, got {:?}",
                WILDCARD, other
            )),
            RawTargets::Keys(keys) => Ok(Targets::Keys(keys)),
        }
    }
}

impl From<Targets> for RawTargets {
    fn from(targets: Targets) -> Self {
        match targets {
            Targets::Any => RawTargets::Marker(WILDCARD.to_string()),
            Targets::Keys(keys) => RawTargets::Keys(keys),
        }
    }
}

impl Targets {
    pub fn any() -> Self {
        Targets::Any
    }

    pub fn keys<S: Into<String>>(keys: impl IntoIterator<Item = S>) -> Self {
        Targets::Keys(keys.into_iter().map(Into::into).collect())
    }

    fn allows(&self, target_key: &str) -> bool {
        match self {
            Targets::Any => true,
            Targets::Keys(keys) => keys.iter().any(|k| k == target_key || k == WILDCARD),
        }
    }
}

/// Static map of which output fields may feed which input fields.
///
/// Consulted when a connection is authored. The executor assumes every
/// connection it receives already passed this check.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompatibilityMatrix {
    entries: HashMap<String, Targets>,
}

pub fn field_key(module_type: &str, field: &str) -> String {
    format!("{}.{}", module_type, field)
}

impl CompatibilityMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow `source_type.source_field` to feed the given targets. Repeated
    /// calls for the same source accumulate keys.
    pub fn allow(&mut self, source_type: &str, source_field: &str, targets: Targets) {
        let key = field_key(source_type, source_field);
        if let (Some(Targets::Keys(existing)), Targets::Keys(more)) =
            (self.entries.get_mut(&key), &targets)
        {
            for k in more {
                if !existing.contains(k) {
                    existing.push(k.clone());
                }
            }
            return;
        }
        self.entries.insert(key, targets);
    }

    pub fn targets(&self, source_type: &str, source_field: &str) -> Option<&Targets> {
        self.entries.get(&field_key(source_type, source_field))
    }

    pub fn is_compatible(
        &self,
        source_type: &str,
        source_field: &str,
        target_type: &str,
        target_field: &str,
    ) -> bool {
        self.targets(source_type, source_field)
            .map(|t| t.allows(&field_key(target_type, target_field)))
            .unwrap_or(false)
    }

    /// Authoring-time validation of one connection: both modules exist,
    /// both fields are declared, and the pair is allowed.
    pub fn check_connection(
        &self,
        graph: &CampaignGraph,
        schemas: &SchemaRegistry,
        connection: &Connection,
    ) -> Result<(), GraphError> {
        let source = graph
            .find_module(&connection.source_module_id)
            .ok_or_else(|| GraphError::UnknownModule(connection.source_module_id.clone()))?;
        let target = graph
            .find_module(&connection.target_module_id)
            .ok_or_else(|| GraphError::UnknownModule(connection.target_module_id.clone()))?;

        let source_schema = schemas
            .get(&source.module_type)
            .ok_or_else(|| GraphError::UnknownModuleType(source.module_type.clone()))?;
        if !source_schema.outputs.contains_key(&connection.source_output_field) {
            return Err(GraphError::UnknownField {
                module_type: source.module_type.clone(),
                direction: "output",
                field: connection.source_output_field.clone(),
            });
        }

        if connection.targets_any_input() {
            return Ok(());
        }

        let target_schema = schemas
            .get(&target.module_type)
            .ok_or_else(|| GraphError::UnknownModuleType(target.module_type.clone()))?;
        if !target_schema.inputs.contains_key(&connection.target_input_field) {
            return Err(GraphError::UnknownField {
                module_type: target.module_type.clone(),
                direction: "input",
                field: connection.target_input_field.clone(),
            });
        }

        if !self.is_compatible(
            &source.module_type,
            &connection.source_output_field,
            &target.module_type,
            &connection.target_input_field,
        ) {
            return Err(GraphError::Incompatible {
                source_key: field_key(&source.module_type, &connection.source_output_field),
                target_key: field_key(&target.module_type, &connection.target_input_field),
            });
        }

        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FieldSpec, ModuleInstance, ModuleSchema};

    fn fixture() -> (CompatibilityMatrix, SchemaRegistry, CampaignGraph) {
        let mut matrix = CompatibilityMatrix::new();
        matrix.allow("writer", "copies", Targets::keys(["painter.prompt"]));
        matrix.allow("painter", "images", Targets::any());

        let mut schemas = SchemaRegistry::new();
        schemas.register(
            ModuleSchema::new("writer")
                .input("brief", FieldSpec::string())
                .output("copies", FieldSpec::list()),
        );
        schemas.register(
            ModuleSchema::new("painter")
                .input("prompt", FieldSpec::string())
                .input("style", FieldSpec::string())
                .output("images", FieldSpec::list()),
        );

        let mut graph = CampaignGraph::new("test");
        graph.add_module(ModuleInstance::new("w", "writer"));
        graph.add_module(ModuleInstance::new("p", "painter"));
        (matrix, schemas, graph)
    }

    #[test]
    fn explicit_and_wildcard_targets() {
        let (matrix, _, _) = fixture();
        assert!(matrix.is_compatible("writer", "copies", "painter", "prompt"));
        assert!(!matrix.is_compatible("writer", "copies", "painter", "style"));
        assert!(matrix.is_compatible("painter", "images", "writer", "brief"));
        assert!(!matrix.is_compatible("painter", "unknown", "writer", "brief"));
    }

    #[test]
    fn allow_accumulates_keys() {
        let mut matrix = CompatibilityMatrix::new();
        matrix.allow("a", "x", Targets::keys(["b.y"]));
        matrix.allow("a", "x", Targets::keys(["c.z"]));
        assert!(matrix.is_compatible("a", "x", "b", "y"));
        assert!(matrix.is_compatible("a", "x", "c", "z"));
    }

    #[test]
    fn check_connection_reports_problems() {
        let (matrix, schemas, mut graph) = fixture();
        graph.connect("w", "copies", "p", "prompt");
        graph.connect("w", "copies", "p", "style");
        graph.connect("w", "drafts", "p", "prompt");
        graph.connect("w", "copies", "ghost", "prompt");

        assert!(matrix.check_connection(&graph, &schemas, &graph.connections[0]).is_ok());
        assert!(matches!(
            matrix.check_connection(&graph, &schemas, &graph.connections[1]),
            Err(GraphError::Incompatible { .. })
        ));
        assert!(matches!(
            matrix.check_connection(&graph, &schemas, &graph.connections[2]),
            Err(GraphError::UnknownField { direction: "output", .. })
        ));
        assert_eq!(
            matrix.check_connection(&graph, &schemas, &graph.connections[3]),
            Err(GraphError::UnknownModule("ghost".to_string()))
        );
    }

    #[test]
    fn matrix_json_accepts_wildcard_string() {
        let matrix: CompatibilityMatrix = serde_json::from_value(serde_json::json!({
            "a.x": "*",
            "a.y": ["b.z"]
        }))
        .unwrap();
        assert!(matrix.is_compatible("a", "x", "q", "r"));
        assert!(matrix.is_compatible("a", "y", "b", "z"));
        assert_eq!(matrix.targets("a", "x"), Some(&Targets::Any));
    }

    #[test]
    fn matrix_json_rejects_unknown_marker() {
        let err = serde_json::from_value::<CompatibilityMatrix>(serde_json::json!({
            "a.x": "all"
        }))
        .unwrap_err();
        assert!(err.to_string().contains("expected \"*\""), "{}", err);
    }

    #[test]
    fn wildcard_serializes_as_star() {
        let mut matrix = CompatibilityMatrix::new();
        matrix.allow("a", "x", Targets::any());
        assert_eq!(
            serde_json::to_value(&matrix).unwrap(),
            serde_json::json!({"a.x": "*"})
        );
    }
}
