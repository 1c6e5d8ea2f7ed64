use crate::graph::DependencyGraph;
use crate::invoker::{Invocation, ModuleInvoker};
use crate::resolver::InputResolver;
use campaigncore::{
    CampaignError, CampaignGraph, ExecutionObserver, ExecutionResult, ExecutionStatus,
    InvokeError, ModuleId, ModuleInstance, RunReport,
};
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Per-module scheduling state within one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleState {
    Pending,
    Ready,
    Running,
    Completed,
    Failed,
}

impl ModuleState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ModuleState::Completed | ModuleState::Failed)
    }
}

/// Drives a campaign graph to completion with bounded parallelism.
///
/// A module becomes ready once every producer it depends on is terminal,
/// whether it completed or failed. When nothing is ready or running but
/// modules remain pending, one of them is force-promoted so the run always
/// terminates.
pub struct CampaignExecutor {
    max_parallel: usize,
}

impl CampaignExecutor {
    /// `max_parallel` of 1 gives strictly sequential, deterministic runs
    pub fn new(max_parallel: usize) -> Self {
        Self {
            max_parallel: max_parallel.max(1),
        }
    }

    pub fn max_parallel(&self) -> usize {
        self.max_parallel
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn execute(
        &self,
        execution_id: Uuid,
        campaign: &CampaignGraph,
        graph: &DependencyGraph,
        resolver: &InputResolver,
        invoker: Arc<dyn ModuleInvoker>,
        observer: &dyn ExecutionObserver,
        cancel: &CancellationToken,
    ) -> Result<RunReport, CampaignError> {
        let start_time = Instant::now();
        let total = graph.len();

        let instances: HashMap<&str, &ModuleInstance> = campaign
            .modules
            .iter()
            .map(|m| (m.id.as_str(), m))
            .collect();
        let mut states: HashMap<ModuleId, ModuleState> = graph
            .modules()
            .iter()
            .map(|id| (id.clone(), ModuleState::Pending))
            .collect();
        let mut results: HashMap<ModuleId, ExecutionResult> = HashMap::new();
        let mut forced: Vec<ModuleId> = Vec::new();
        let mut running = FuturesUnordered::new();

        let cycles = graph.cycles();
        let cycle_of: HashMap<&str, usize> = cycles
            .iter()
            .enumerate()
            .flat_map(|(i, ids)| ids.iter().map(move |id| (id.as_str(), i)))
            .collect();

        loop {
            if cancel.is_cancelled() {
                tracing::warn!("Run {} cancelled with {} modules in flight", execution_id, running.len());
                return Err(CampaignError::Cancelled {
                    completed: results.len(),
                    total,
                });
            }

            self.promote_ready(graph, &mut states);

            // Launch ready modules in declaration order, up to the parallel limit
            for module_id in graph.modules() {
                if running.len() >= self.max_parallel {
                    break;
                }
                if states.get(module_id) != Some(&ModuleState::Ready) {
                    continue;
                }

                let module = instances
                    .get(module_id.as_str())
                    .ok_or_else(|| CampaignError::Execution(format!("module {} vanished", module_id)))?;

                let inputs = resolver.resolve(module, graph, &results);
                states.insert(module_id.clone(), ModuleState::Running);

                tracing::info!("Starting module {} ({})", module.id, module.module_type);
                observer.on_module_start(&module.id);

                let invocation = Invocation {
                    module_id: module.id.clone(),
                    module_type: module.module_type.clone(),
                    inputs,
                };
                let invoker = Arc::clone(&invoker);
                let handle = tokio::spawn(async move {
                    let started = Instant::now();
                    let result = invoker.invoke(&invocation).await;
                    (result, started.elapsed().as_millis() as u64)
                });

                let module_id = module.id.clone();
                let module_type = module.module_type.clone();
                running.push(async move { (module_id, module_type, handle.await) });
            }

            if running.is_empty() {
                if states.values().all(|s| s.is_terminal()) {
                    break;
                }

                // Nothing ready, nothing in flight, work remaining: a cycle
                // the builder let through. Force one module through.
                let stuck = self
                    .pick_forced(graph, &states, &cycle_of)
                    .ok_or_else(|| CampaignError::Execution("scheduler stalled".to_string()))?;

                tracing::warn!(
                    "Forced break: no ready modules, promoting {} to completed without output",
                    stuck
                );
                let result = ExecutionResult::forced();
                states.insert(stuck.clone(), ModuleState::Completed);
                observer.on_module_forced(&stuck);
                observer.on_module_complete(&stuck, &result);
                results.insert(stuck.clone(), result);
                forced.push(stuck);
                continue;
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::warn!("Run {} cancelled while awaiting {} modules", execution_id, running.len());
                    return Err(CampaignError::Cancelled {
                        completed: results.len(),
                        total,
                    });
                }
                Some((module_id, module_type, joined)) = running.next() => {
                    let result = match joined {
                        Ok((result, duration_ms)) => result.with_metadata("duration_ms", duration_ms as i64),
                        Err(e) => ExecutionResult::failure(
                            InvokeError::Aborted {
                                module_type: module_type.clone(),
                                message: e.to_string(),
                            }
                            .to_string(),
                        ),
                    };

                    let state = match result.status {
                        ExecutionStatus::Success => {
                            tracing::info!("Module {} ({}) completed", module_id, module_type);
                            ModuleState::Completed
                        }
                        ExecutionStatus::Error => {
                            tracing::error!(
                                "Module {} ({}) failed: {}",
                                module_id,
                                module_type,
                                result.error.as_deref().unwrap_or("unknown error")
                            );
                            ModuleState::Failed
                        }
                    };

                    states.insert(module_id.clone(), state);
                    observer.on_module_complete(&module_id, &result);
                    results.insert(module_id, result);
                }
            }
        }

        let report = RunReport {
            execution_id,
            results,
            forced,
            duration_ms: start_time.elapsed().as_millis() as u64,
        };

        tracing::info!(
            "Run {} finished: {} succeeded, {} failed, {} forced in {}ms",
            execution_id,
            report.succeeded(),
            report.failed(),
            report.forced.len(),
            report.duration_ms
        );

        Ok(report)
    }

    /// Module to push through a deadlock: the first pending module, in
    /// declaration order, whose unfinished producers all sit in its own
    /// cycle. Modules merely downstream of a cycle are left to run once it
    /// breaks. Falls back to the first pending module.
    fn pick_forced(
        &self,
        graph: &DependencyGraph,
        states: &HashMap<ModuleId, ModuleState>,
        cycle_of: &HashMap<&str, usize>,
    ) -> Option<ModuleId> {
        let pending: Vec<&ModuleId> = graph
            .modules()
            .iter()
            .filter(|id| states.get(*id) == Some(&ModuleState::Pending))
            .collect();

        let in_own_cycle = |id: &ModuleId| {
            let Some(component) = cycle_of.get(id.as_str()) else {
                return false;
            };
            graph.dependencies(id).map_or(true, |deps| {
                deps.iter()
                    .filter(|dep| !states.get(*dep).is_some_and(|s| s.is_terminal()))
                    .all(|dep| cycle_of.get(dep.as_str()) == Some(component))
            })
        };

        pending
            .iter()
            .find(|id| in_own_cycle(**id))
            .or_else(|| pending.first())
            .map(|id| (*id).clone())
    }

    /// Move pending modules whose producers are all terminal to ready
    fn promote_ready(&self, graph: &DependencyGraph, states: &mut HashMap<ModuleId, ModuleState>) {
        let ready: Vec<ModuleId> = graph
            .modules()
            .iter()
            .filter(|id| states.get(*id) == Some(&ModuleState::Pending))
            .filter(|id| {
                graph.dependencies(id).map_or(true, |deps| {
                    deps.iter()
                        .all(|dep| states.get(dep).is_some_and(|s| s.is_terminal()))
                })
            })
            .cloned()
            .collect();

        for id in ready {
            tracing::debug!("Module {} is ready", id);
            states.insert(id, ModuleState::Ready);
        }
    }
}
