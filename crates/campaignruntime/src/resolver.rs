use crate::graph::DependencyGraph;
use crate::transform::{TransformKey, TransformerRegistry};
use campaigncore::{ExecutionResult, ModuleId, ModuleInstance, SchemaRegistry, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Builds the concrete input object for a module about to run.
///
/// Precedence, lowest first: schema defaults, stored configuration, wired
/// upstream outputs.
#[derive(Debug, Clone)]
pub struct InputResolver {
    schemas: Arc<SchemaRegistry>,
    transformers: Arc<TransformerRegistry>,
}

impl InputResolver {
    pub fn new(schemas: Arc<SchemaRegistry>, transformers: Arc<TransformerRegistry>) -> Self {
        Self {
            schemas,
            transformers,
        }
    }

    pub fn schemas(&self) -> &Arc<SchemaRegistry> {
        &self.schemas
    }

    pub fn transformers(&self) -> &Arc<TransformerRegistry> {
        &self.transformers
    }

    /// Stored configuration merged with schema defaults. `Null` entries in
    /// the configuration count as missing.
    pub fn configured_inputs(&self, module: &ModuleInstance) -> HashMap<String, Value> {
        let mut inputs: HashMap<String, Value> = module
            .config
            .iter()
            .filter(|(_, v)| v.is_defined())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        match self.schemas.get(&module.module_type) {
            Some(schema) => {
                for (field, spec) in &schema.inputs {
                    if inputs.contains_key(field) {
                        continue;
                    }
                    if let Some(default) = spec.default_value() {
                        inputs.insert(field.clone(), default);
                    }
                }
            }
            None => {
                tracing::warn!(
                    "No schema for module type '{}' ({}); using stored config only",
                    module.module_type,
                    module.id
                );
            }
        }

        inputs
    }

    /// Full resolution: configured inputs overwritten by every wired value
    /// whose producer has it. A producer that has not run, failed, or left
    /// the field empty is a resolution gap: the configured value stays.
    pub fn resolve(
        &self,
        module: &ModuleInstance,
        graph: &DependencyGraph,
        results: &HashMap<ModuleId, ExecutionResult>,
    ) -> HashMap<String, Value> {
        let mut inputs = self.configured_inputs(module);

        for triple in graph.resolutions(&module.id) {
            let upstream = results
                .get(&triple.producer)
                .and_then(|result| result.output(&triple.output_field));

            let Some(value) = upstream else {
                tracing::warn!(
                    "Module {}: no '{}' from {} for input '{}'; keeping configured value",
                    module.id,
                    triple.output_field,
                    triple.producer,
                    triple.input_field
                );
                continue;
            };

            let key = TransformKey::new(
                graph.module_type(&triple.producer).unwrap_or_default(),
                triple.output_field.clone(),
                module.module_type.clone(),
                triple.input_field.clone(),
            );
            let transformed = self.transformers.apply(&key, value);

            if transformed.is_null() {
                tracing::warn!("Module {}: transform {} produced nothing", module.id, key);
                continue;
            }

            tracing::debug!(
                "Module {}: '{}' wired from {}.{} ({})",
                module.id,
                triple.input_field,
                triple.producer,
                triple.output_field,
                transformed.kind()
            );
            inputs.insert(triple.input_field.clone(), transformed);
        }

        inputs
    }
}
