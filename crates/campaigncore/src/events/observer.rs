use crate::ExecutionResult;

/// Progress callbacks invoked synchronously from the scheduling loop.
///
/// Implementations must return quickly; anything slow (rendering,
/// persistence) belongs on the caller's side of a channel.
pub trait ExecutionObserver: Send + Sync {
    fn on_module_start(&self, _module_id: &str) {}

    fn on_module_complete(&self, _module_id: &str, _result: &ExecutionResult) {}

    /// Called before `on_module_complete` for a module pushed through a deadlock
    fn on_module_forced(&self, _module_id: &str) {}
}

/// Observer that ignores every callback
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ExecutionObserver for NoopObserver {}
