use crate::executor::CampaignExecutor;
use crate::graph::DependencyGraph;
use crate::invoker::ModuleInvoker;
use crate::resolver::InputResolver;
use crate::transform::TransformerRegistry;
use campaigncore::{
    CampaignError, CampaignGraph, EventBus, ExecutionEvent, ExecutionId, ExecutionObserver,
    ExecutionResult, NoopObserver, RunReport, SchemaRegistry,
};
use chrono::Utc;
use std::str::FromStr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Main entry point for running campaign graphs
pub struct CampaignRuntime {
    schemas: Arc<SchemaRegistry>,
    resolver: InputResolver,
    invoker: Arc<dyn ModuleInvoker>,
    executor: CampaignExecutor,
    event_bus: Arc<EventBus>,
}

impl CampaignRuntime {
    pub fn new(
        schemas: Arc<SchemaRegistry>,
        transformers: Arc<TransformerRegistry>,
        invoker: Arc<dyn ModuleInvoker>,
        config: RuntimeConfig,
    ) -> Self {
        let resolver = InputResolver::new(Arc::clone(&schemas), transformers);
        let executor = CampaignExecutor::new(config.max_parallel_modules);
        let event_bus = Arc::new(EventBus::new(config.event_buffer_size));

        Self {
            schemas,
            resolver,
            invoker,
            executor,
            event_bus,
        }
    }

    /// Run a graph to completion
    pub async fn execute(&self, graph: &CampaignGraph) -> Result<RunReport, CampaignError> {
        self.execute_with(graph, &NoopObserver, &CancellationToken::new())
            .await
    }

    /// Run a graph with progress callbacks and a cancellation handle.
    ///
    /// Graph-definition errors are returned before any module starts. Once
    /// the run has started, module failures only show up in the report.
    pub async fn execute_with(
        &self,
        graph: &CampaignGraph,
        observer: &dyn ExecutionObserver,
        cancel: &CancellationToken,
    ) -> Result<RunReport, CampaignError> {
        let deps = DependencyGraph::from_graph(graph)?;
        for cycle in deps.cycles() {
            tracing::warn!(
                "Campaign '{}' has a dependency cycle: {}",
                graph.name,
                cycle.join(" -> ")
            );
        }

        let execution_id = Uuid::new_v4();
        tracing::info!(
            "Starting run {} of campaign '{}' ({} modules, {} connections)",
            execution_id,
            graph.name,
            graph.modules.len(),
            graph.connections.len()
        );
        self.event_bus.emit(ExecutionEvent::RunStarted {
            execution_id,
            campaign_id: graph.id,
            modules: deps.len(),
            timestamp: Utc::now(),
        });

        let bridge = BusObserver {
            bus: &self.event_bus,
            execution_id,
            graph: &deps,
            inner: observer,
        };

        let report = self
            .executor
            .execute(
                execution_id,
                graph,
                &deps,
                &self.resolver,
                Arc::clone(&self.invoker),
                &bridge,
                cancel,
            )
            .await?;

        self.event_bus.emit(ExecutionEvent::RunCompleted {
            execution_id,
            succeeded: report.succeeded(),
            failed: report.failed(),
            forced: report.forced.len(),
            duration_ms: report.duration_ms,
            timestamp: Utc::now(),
        });

        Ok(report)
    }

    pub fn schemas(&self) -> &Arc<SchemaRegistry> {
        &self.schemas
    }

    pub fn resolver(&self) -> &InputResolver {
        &self.resolver
    }

    /// Subscribe to execution events
    pub fn subscribe_events(&self) -> tokio::sync::broadcast::Receiver<ExecutionEvent> {
        self.event_bus.subscribe()
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }
}

/// Mirrors scheduler callbacks onto the event bus, then forwards them
struct BusObserver<'a> {
    bus: &'a EventBus,
    execution_id: ExecutionId,
    graph: &'a DependencyGraph,
    inner: &'a dyn ExecutionObserver,
}

impl ExecutionObserver for BusObserver<'_> {
    fn on_module_start(&self, module_id: &str) {
        self.bus.emit(ExecutionEvent::ModuleStarted {
            execution_id: self.execution_id,
            module_id: module_id.to_string(),
            module_type: self.graph.module_type(module_id).unwrap_or_default().to_string(),
            timestamp: Utc::now(),
        });
        self.inner.on_module_start(module_id);
    }

    fn on_module_complete(&self, module_id: &str, result: &ExecutionResult) {
        self.bus.emit(ExecutionEvent::ModuleCompleted {
            execution_id: self.execution_id,
            module_id: module_id.to_string(),
            result: result.clone(),
            timestamp: Utc::now(),
        });
        self.inner.on_module_complete(module_id, result);
    }

    fn on_module_forced(&self, module_id: &str) {
        self.bus.emit(ExecutionEvent::ModuleForced {
            execution_id: self.execution_id,
            module_id: module_id.to_string(),
            timestamp: Utc::now(),
        });
        self.inner.on_module_forced(module_id);
    }
}

/// Configuration for the runtime
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub max_parallel_modules: usize,
    pub event_buffer_size: usize,
}

impl RuntimeConfig {
    /// Defaults overridden by `CAMPAIGN_MAX_PARALLEL` and `CAMPAIGN_EVENT_BUFFER`
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_parallel_modules: env_or("CAMPAIGN_MAX_PARALLEL", defaults.max_parallel_modules),
            event_buffer_size: env_or("CAMPAIGN_EVENT_BUFFER", defaults.event_buffer_size),
        }
    }

    pub fn with_max_parallel(mut self, max_parallel_modules: usize) -> Self {
        self.max_parallel_modules = max_parallel_modules;
        self
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_parallel_modules: 4,
            event_buffer_size: 1000,
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring unparsable {}={:?}", key, raw);
            default
        }),
        Err(_) => default,
    }
}
