use crate::Value;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Declared shape of a module field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FieldType {
    String,
    Integer,
    Number,
    Boolean,
    Enum {
        values: Vec<String>,
    },
    List {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        items: Option<Box<FieldSpec>>,
    },
    Object {
        #[serde(default)]
        properties: BTreeMap<String, FieldSpec>,
    },
}

impl FieldType {
    pub fn name(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Integer => "integer",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Enum { .. } => "enum",
            FieldType::List { .. } => "list",
            FieldType::Object { .. } => "object",
        }
    }
}

/// A single input or output field of a module schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    #[serde(flatten)]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FieldSpec {
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            required: false,
            default: None,
            description: None,
        }
    }

    pub fn string() -> Self {
        Self::new(FieldType::String)
    }

    pub fn integer() -> Self {
        Self::new(FieldType::Integer)
    }

    pub fn number() -> Self {
        Self::new(FieldType::Number)
    }

    pub fn boolean() -> Self {
        Self::new(FieldType::Boolean)
    }

    pub fn enumeration<S: Into<String>>(values: impl IntoIterator<Item = S>) -> Self {
        Self::new(FieldType::Enum {
            values: values.into_iter().map(Into::into).collect(),
        })
    }

    pub fn list() -> Self {
        Self::new(FieldType::List { items: None })
    }

    pub fn list_of(items: FieldSpec) -> Self {
        Self::new(FieldType::List {
            items: Some(Box::new(items)),
        })
    }

    pub fn object<S: Into<String>>(properties: impl IntoIterator<Item = (S, FieldSpec)>) -> Self {
        Self::new(FieldType::Object {
            properties: properties
                .into_iter()
                .map(|(name, spec)| (name.into(), spec))
                .collect(),
        })
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn describe(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    /// Value used when the field is missing from a module's configuration.
    ///
    /// An explicit default wins. Lists default to `[]`, objects to an
    /// object with every declared property defaulted. Required scalars get
    /// their zero value; optional scalars without a default stay absent.
    pub fn default_value(&self) -> Option<Value> {
        if let Some(default) = self.default.as_ref().filter(|v| v.is_defined()) {
            return Some(default.clone());
        }

        match &self.field_type {
            FieldType::List { .. } => Some(Value::empty_list()),
            FieldType::Object { properties } => Some(default_object(properties)),
            _ if self.required => Some(self.zero_value()),
            _ => None,
        }
    }

    /// Default for a property nested inside an object field
    fn property_default(&self) -> Value {
        if let Some(default) = self.default.as_ref().filter(|v| v.is_defined()) {
            return default.clone();
        }

        match &self.field_type {
            FieldType::List { .. } => Value::empty_list(),
            FieldType::Object { properties } => default_object(properties),
            _ => Value::String(String::new()),
        }
    }

    /// Zero value for the field's type: `""`, `0`, `false`, first enum
    /// value, `[]` or a defaulted object
    pub fn zero_value(&self) -> Value {
        match &self.field_type {
            FieldType::String => Value::String(String::new()),
            FieldType::Integer => Value::Integer(0),
            FieldType::Number => Value::Float(0.0),
            FieldType::Boolean => Value::Bool(false),
            FieldType::Enum { values } => {
                Value::String(values.first().cloned().unwrap_or_default())
            }
            FieldType::List { .. } => Value::empty_list(),
            FieldType::Object { properties } => default_object(properties),
        }
    }
}

fn default_object(properties: &BTreeMap<String, FieldSpec>) -> Value {
    Value::Object(
        properties
            .iter()
            .map(|(name, spec)| (name.clone(), spec.property_default()))
            .collect(),
    )
}

/// Declared inputs and outputs of one module type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleSchema {
    pub module_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_category")]
    pub category: String,
    /// Path segment of the remote operation, relative to the invoker's base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub inputs: BTreeMap<String, FieldSpec>,
    #[serde(default)]
    pub outputs: BTreeMap<String, FieldSpec>,
}

fn default_category() -> String {
    "general".to_string()
}

impl ModuleSchema {
    pub fn new(module_type: impl Into<String>) -> Self {
        Self {
            module_type: module_type.into(),
            description: String::new(),
            category: default_category(),
            endpoint: None,
            inputs: BTreeMap::new(),
            outputs: BTreeMap::new(),
        }
    }

    pub fn describe(mut self, text: impl Into<String>) -> Self {
        self.description = text.into();
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn input(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        self.inputs.insert(name.into(), spec);
        self
    }

    pub fn output(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        self.outputs.insert(name.into(), spec);
        self
    }

    /// Endpoint path, falling back to the module type
    pub fn endpoint_path(&self) -> &str {
        self.endpoint.as_deref().unwrap_or(&self.module_type)
    }

    pub fn required_inputs(&self) -> impl Iterator<Item = &str> {
        self.inputs
            .iter()
            .filter(|(_, spec)| spec.required)
            .map(|(name, _)| name.as_str())
    }
}

/// Read-only catalog of module types
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<ModuleSchema>", into = "Vec<ModuleSchema>")]
pub struct SchemaRegistry {
    schemas: HashMap<String, ModuleSchema>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, schema: ModuleSchema) {
        tracing::debug!("Registering module schema: {}", schema.module_type);
        self.schemas.insert(schema.module_type.clone(), schema);
    }

    pub fn get(&self, module_type: &str) -> Option<&ModuleSchema> {
        self.schemas.get(module_type)
    }

    pub fn contains(&self, module_type: &str) -> bool {
        self.schemas.contains_key(module_type)
    }

    /// Registered module types, sorted
    pub fn module_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.schemas.keys().cloned().collect();
        types.sort();
        types
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

impl From<Vec<ModuleSchema>> for SchemaRegistry {
    fn from(schemas: Vec<ModuleSchema>) -> Self {
        let mut registry = SchemaRegistry::new();
        for schema in schemas {
            registry.register(schema);
        }
        registry
    }
}

impl From<SchemaRegistry> for Vec<ModuleSchema> {
    fn from(registry: SchemaRegistry) -> Self {
        let mut schemas: Vec<ModuleSchema> = registry.schemas.into_values().collect();
        schemas.sort_by(|a, b| a.module_type.cmp(&b.module_type));
        schemas
    }
}
