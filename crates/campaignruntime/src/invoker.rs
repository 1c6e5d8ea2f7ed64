use async_trait::async_trait;
use campaigncore::{ExecutionResult, ModuleId, Value};
use std::collections::HashMap;

/// One module call: which module, of what type, with which resolved inputs
#[derive(Debug, Clone)]
pub struct Invocation {
    pub module_id: ModuleId,
    pub module_type: String,
    pub inputs: HashMap<String, Value>,
}

/// Performs the remote operation behind a module type.
///
/// Infallible by signature: transport failures, error responses and
/// malformed bodies must come back as an `error` result, so the scheduler
/// always receives a terminal state.
#[async_trait]
pub trait ModuleInvoker: Send + Sync {
    async fn invoke(&self, invocation: &Invocation) -> ExecutionResult;
}
