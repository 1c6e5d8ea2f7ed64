//! Campaign execution runtime
//!
//! This crate turns a `CampaignGraph` into a run: it derives the dependency
//! structure, resolves each module's inputs from defaults, configuration and
//! upstream outputs, reshapes wired values through the transformer registry,
//! and schedules module invocations with bounded parallelism.

mod executor;
mod graph;
mod invoker;
mod registry;
mod resolver;
mod runtime;
pub mod transform;

pub use executor::{CampaignExecutor, ModuleState};
pub use graph::{DependencyGraph, ResolutionTriple};
pub use invoker::{Invocation, ModuleInvoker};
pub use registry::InvokerRegistry;
pub use resolver::InputResolver;
pub use runtime::{CampaignRuntime, RuntimeConfig};
pub use transform::{TransformFn, TransformKey, TransformerRegistry};
