use campaigncore::{CampaignGraph, Connection, GraphError, ModuleId, ModuleInstance};
use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{HashMap, HashSet};

/// `(producer module id, output field, input field)`: how one input of a
/// module is pulled from an upstream result.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolutionTriple {
    pub producer: ModuleId,
    pub output_field: String,
    pub input_field: String,
}

/// Producer/consumer structure derived from a campaign graph at the start
/// of every run.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    /// Module ids in declaration order
    order: Vec<ModuleId>,
    module_types: HashMap<ModuleId, String>,
    dependencies: HashMap<ModuleId, HashSet<ModuleId>>,
    resolutions: HashMap<ModuleId, Vec<ResolutionTriple>>,
}

impl DependencyGraph {
    pub fn from_graph(graph: &CampaignGraph) -> Result<Self, GraphError> {
        Self::build(&graph.modules, &graph.connections)
    }

    /// Build the dependency and resolution maps in one pass over the
    /// connections. Self loops, dangling endpoints and duplicate module ids
    /// are rejected here so a run never starts on a broken graph.
    pub fn build(modules: &[ModuleInstance], connections: &[Connection]) -> Result<Self, GraphError> {
        let mut order = Vec::with_capacity(modules.len());
        let mut module_types = HashMap::with_capacity(modules.len());
        let mut dependencies: HashMap<ModuleId, HashSet<ModuleId>> = HashMap::new();
        let mut resolutions: HashMap<ModuleId, Vec<ResolutionTriple>> = HashMap::new();

        for module in modules {
            if module_types
                .insert(module.id.clone(), module.module_type.clone())
                .is_some()
            {
                return Err(GraphError::DuplicateModule(module.id.clone()));
            }
            order.push(module.id.clone());
            dependencies.insert(module.id.clone(), HashSet::new());
            resolutions.insert(module.id.clone(), Vec::new());
        }

        for conn in connections {
            if conn.source_module_id == conn.target_module_id {
                return Err(GraphError::SelfLoop(conn.source_module_id.clone()));
            }
            if !module_types.contains_key(&conn.target_module_id) {
                return Err(GraphError::UnknownModule(conn.target_module_id.clone()));
            }
            if !module_types.contains_key(&conn.source_module_id) {
                return Err(GraphError::UnknownModule(conn.source_module_id.clone()));
            }
            if conn.targets_any_input() {
                continue;
            }

            if let Some(deps) = dependencies.get_mut(&conn.target_module_id) {
                deps.insert(conn.source_module_id.clone());
            }
            if let Some(triples) = resolutions.get_mut(&conn.target_module_id) {
                triples.push(ResolutionTriple {
                    producer: conn.source_module_id.clone(),
                    output_field: conn.source_output_field.clone(),
                    input_field: conn.target_input_field.clone(),
                });
            }
        }

        tracing::debug!(
            "Built dependency graph: {} modules, {} connections",
            order.len(),
            connections.len()
        );

        Ok(Self {
            order,
            module_types,
            dependencies,
            resolutions,
        })
    }

    /// Module ids in declaration order
    pub fn modules(&self) -> &[ModuleId] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn module_type(&self, module_id: &str) -> Option<&str> {
        self.module_types.get(module_id).map(String::as_str)
    }

    /// Modules that must be terminal before `module_id` may run
    pub fn dependencies(&self, module_id: &str) -> Option<&HashSet<ModuleId>> {
        self.dependencies.get(module_id)
    }

    pub fn resolutions(&self, module_id: &str) -> &[ResolutionTriple] {
        self.resolutions
            .get(module_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Modules that consume an output of `module_id`, in declaration order
    pub fn dependents(&self, module_id: &str) -> Vec<&ModuleId> {
        self.order
            .iter()
            .filter(|id| {
                self.dependencies
                    .get(*id)
                    .is_some_and(|deps| deps.contains(module_id))
            })
            .collect()
    }

    fn to_petgraph(&self) -> DiGraph<&str, ()> {
        let mut graph = DiGraph::new();
        let mut index: HashMap<&str, NodeIndex> = HashMap::new();

        for id in &self.order {
            index.insert(id.as_str(), graph.add_node(id.as_str()));
        }
        for id in &self.order {
            if let Some(deps) = self.dependencies.get(id) {
                for dep in deps {
                    graph.add_edge(index[dep.as_str()], index[id.as_str()], ());
                }
            }
        }
        graph
    }

    /// Groups of modules that depend on each other in a cycle. The executor
    /// still terminates on such graphs, but only by forcing modules through.
    pub fn cycles(&self) -> Vec<Vec<ModuleId>> {
        let graph = self.to_petgraph();
        let position: HashMap<&str, usize> = self
            .order
            .iter()
            .enumerate()
            .map(|(i, id)| (id.as_str(), i))
            .collect();

        let mut cycles: Vec<Vec<ModuleId>> = tarjan_scc(&graph)
            .into_iter()
            .filter(|component| component.len() > 1)
            .map(|component| {
                let mut ids: Vec<&str> = component.into_iter().map(|idx| graph[idx]).collect();
                ids.sort_by_key(|id| position[id]);
                ids.into_iter().map(str::to_string).collect()
            })
            .collect();
        cycles.sort_by_key(|ids: &Vec<ModuleId>| position[ids[0].as_str()]);
        cycles
    }

    /// A valid execution order, or `None` when the graph has a cycle
    pub fn topological_order(&self) -> Option<Vec<ModuleId>> {
        let graph = self.to_petgraph();
        toposort(&graph, None)
            .ok()
            .map(|nodes| nodes.into_iter().map(|idx| graph[idx].to_string()).collect())
    }
}
