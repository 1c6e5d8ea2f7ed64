use crate::{ModuleId, Value};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Success,
    Error,
}

/// Uniform result envelope produced once per module per run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub outputs: HashMap<String, Value>,
    pub status: ExecutionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, Value>>,
}

impl ExecutionResult {
    pub fn success(outputs: HashMap<String, Value>) -> Self {
        Self {
            outputs,
            status: ExecutionStatus::Success,
            error: None,
            metadata: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            outputs: HashMap::new(),
            status: ExecutionStatus::Error,
            error: Some(message.into()),
            metadata: None,
        }
    }

    /// Result recorded for a module promoted to complete to break a
    /// scheduling deadlock. It carries no outputs.
    pub fn forced() -> Self {
        Self::success(HashMap::new()).with_metadata("forced", true)
    }

    pub fn with_output(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.outputs.insert(field.into(), value.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == ExecutionStatus::Success
    }

    pub fn is_forced(&self) -> bool {
        self.metadata
            .as_ref()
            .and_then(|m| m.get("forced"))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// A defined output value, if the module produced one
    pub fn output(&self, field: &str) -> Option<&Value> {
        self.outputs.get(field).filter(|v| v.is_defined())
    }
}

/// Everything a run produced, keyed by module id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub execution_id: Uuid,
    pub results: HashMap<ModuleId, ExecutionResult>,
    /// Modules force-promoted to complete to keep the run live
    pub forced: Vec<ModuleId>,
    pub duration_ms: u64,
}

impl RunReport {
    pub fn result(&self, module_id: &str) -> Option<&ExecutionResult> {
        self.results.get(module_id)
    }

    pub fn succeeded(&self) -> usize {
        self.results.values().filter(|r| r.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_value(ExecutionResult::failure("boom")).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["error"], "boom");
        assert!(json.get("metadata").is_none());
    }

    #[test]
    fn forced_result_is_empty_success() {
        let result = ExecutionResult::forced();
        assert!(result.is_success());
        assert!(result.is_forced());
        assert!(result.outputs.is_empty());
    }

    #[test]
    fn null_outputs_are_not_reported() {
        let result = ExecutionResult::success(HashMap::new()).with_output("prompt", Value::Null);
        assert!(result.output("prompt").is_none());
    }
}
