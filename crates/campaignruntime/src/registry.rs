use crate::invoker::{Invocation, ModuleInvoker};
use async_trait::async_trait;
use campaigncore::{ExecutionResult, InvokeError};
use std::collections::HashMap;
use std::sync::Arc;

/// Routes module types to the invoker that serves them
pub struct InvokerRegistry {
    routes: HashMap<String, Arc<dyn ModuleInvoker>>,
    fallback: Option<Arc<dyn ModuleInvoker>>,
}

impl InvokerRegistry {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
            fallback: None,
        }
    }

    /// Registry that sends every module type to one invoker
    pub fn with_fallback(invoker: Arc<dyn ModuleInvoker>) -> Self {
        Self {
            routes: HashMap::new(),
            fallback: Some(invoker),
        }
    }

    /// Route a module type to a specific invoker
    pub fn register(&mut self, module_type: impl Into<String>, invoker: Arc<dyn ModuleInvoker>) {
        let module_type = module_type.into();
        tracing::info!("Registering invoker for module type: {}", module_type);
        self.routes.insert(module_type, invoker);
    }

    pub fn set_fallback(&mut self, invoker: Arc<dyn ModuleInvoker>) {
        self.fallback = Some(invoker);
    }

    /// Module types with a dedicated route
    pub fn routed_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.routes.keys().cloned().collect();
        types.sort();
        types
    }

    fn route(&self, module_type: &str) -> Option<&Arc<dyn ModuleInvoker>> {
        self.routes.get(module_type).or(self.fallback.as_ref())
    }
}

impl Default for InvokerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModuleInvoker for InvokerRegistry {
    async fn invoke(&self, invocation: &Invocation) -> ExecutionResult {
        match self.route(&invocation.module_type) {
            Some(invoker) => invoker.invoke(invocation).await,
            None => {
                let error = InvokeError::Unrouted(invocation.module_type.clone());
                tracing::error!("Module {}: {}", invocation.module_id, error);
                ExecutionResult::failure(error.to_string())
            }
        }
    }
}
