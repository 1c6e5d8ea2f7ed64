use async_trait::async_trait;
use campaigncore::{ExecutionResult, SchemaRegistry};
use campaignruntime::{Invocation, ModuleInvoker};
use std::sync::Arc;

/// Invoker that never leaves the process. It logs what would have been
/// sent and answers with placeholder outputs shaped like the schema, so a
/// graph can be exercised end to end without any services running.
pub struct DryRunInvoker {
    schemas: Arc<SchemaRegistry>,
}

impl DryRunInvoker {
    pub fn new(schemas: Arc<SchemaRegistry>) -> Self {
        Self { schemas }
    }
}

#[async_trait]
impl ModuleInvoker for DryRunInvoker {
    async fn invoke(&self, invocation: &Invocation) -> ExecutionResult {
        tracing::info!(
            "DRY RUN: {} ({})",
            invocation.module_id,
            invocation.module_type
        );
        let mut fields: Vec<_> = invocation.inputs.iter().collect();
        fields.sort_by(|a, b| a.0.cmp(b.0));
        for (key, value) in fields {
            tracing::info!("  {}: {}", key, value.to_json());
        }

        let Some(schema) = self.schemas.get(&invocation.module_type) else {
            tracing::warn!(
                "DRY RUN: no schema for {}; echoing inputs",
                invocation.module_type
            );
            return ExecutionResult::success(invocation.inputs.clone()).with_metadata("dry_run", true);
        };

        let outputs = schema
            .outputs
            .iter()
            .map(|(name, spec)| {
                let value = spec.default_value().unwrap_or_else(|| spec.zero_value());
                (name.clone(), value)
            })
            .collect();

        ExecutionResult::success(outputs).with_metadata("dry_run", true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::{builtin_schemas, EMAIL_SENDER, VISUAL_GENERATOR};
    use campaigncore::Value;
    use std::collections::HashMap;

    fn invocation(module_type: &str) -> Invocation {
        Invocation {
            module_id: "m".to_string(),
            module_type: module_type.to_string(),
            inputs: HashMap::from([("prompt".to_string(), Value::from("latte art"))]),
        }
    }

    #[tokio::test]
    async fn test_outputs_follow_schema() {
        let invoker = DryRunInvoker::new(Arc::new(builtin_schemas()));

        let result = invoker.invoke(&invocation(VISUAL_GENERATOR)).await;
        assert!(result.is_success());
        assert_eq!(result.outputs["generated_images"], Value::empty_list());
        assert_eq!(result.metadata.unwrap()["dry_run"], Value::Bool(true));

        let result = invoker.invoke(&invocation(EMAIL_SENDER)).await;
        assert_eq!(result.outputs["campaign_summary"], Value::empty_object());
    }

    #[tokio::test]
    async fn test_unknown_type_echoes_inputs() {
        let invoker = DryRunInvoker::new(Arc::new(SchemaRegistry::new()));
        let result = invoker.invoke(&invocation("mystery")).await;
        assert_eq!(result.outputs["prompt"], Value::from("latte art"));
    }
}
