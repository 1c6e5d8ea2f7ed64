use crate::Value;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

pub type CampaignId = Uuid;
pub type ModuleId = String;

/// Target field of a connection that accepts anything. Such wires are kept
/// for display but never resolve into an input.
pub const ANY_INPUT: &str = "*";

/// A user-built campaign graph: the single value handed to the engine for
/// one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignGraph {
    #[serde(default = "Uuid::new_v4")]
    pub id: CampaignId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub modules: Vec<ModuleInstance>,
    #[serde(default)]
    pub connections: Vec<Connection>,
}

impl CampaignGraph {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            modules: Vec::new(),
            connections: Vec::new(),
        }
    }

    pub fn add_module(&mut self, module: ModuleInstance) -> ModuleId {
        let id = module.id.clone();
        self.modules.push(module);
        id
    }

    pub fn connect(
        &mut self,
        source_module_id: impl Into<ModuleId>,
        source_output_field: impl Into<String>,
        target_module_id: impl Into<ModuleId>,
        target_input_field: impl Into<String>,
    ) {
        self.connections.push(Connection {
            source_module_id: source_module_id.into(),
            source_output_field: source_output_field.into(),
            target_module_id: target_module_id.into(),
            target_input_field: target_input_field.into(),
        });
    }

    pub fn find_module(&self, id: &str) -> Option<&ModuleInstance> {
        self.modules.iter().find(|m| m.id == id)
    }
}

/// One configured module on the canvas
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleInstance {
    pub id: ModuleId,
    pub module_type: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub config: HashMap<String, Value>,
}

impl ModuleInstance {
    pub fn new(id: impl Into<ModuleId>, module_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            module_type: module_type.into(),
            name: None,
            config: HashMap::new(),
        }
    }

    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Display label: the user-facing name when set, otherwise the id
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// A wire from one module's output field to another module's input field
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Connection {
    pub source_module_id: ModuleId,
    pub source_output_field: String,
    pub target_module_id: ModuleId,
    pub target_input_field: String,
}

impl Connection {
    pub fn targets_any_input(&self) -> bool {
        self.target_input_field == ANY_INPUT
    }
}
