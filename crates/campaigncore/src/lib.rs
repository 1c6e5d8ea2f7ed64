//! Core abstractions for the campaign flow engine
//!
//! This crate provides the data model every other component depends on:
//! values, module instances and connections, execution results, the
//! module schema registry and compatibility matrix types, errors and events.
//! It performs no I/O.

mod compatibility;
mod error;
pub mod events;
mod result;
mod schema;
mod value;
mod workflow;

pub use compatibility::{field_key, CompatibilityMatrix, Targets, WILDCARD};
pub use error::{CampaignError, GraphError, InvokeError};
pub use events::*;
pub use result::{ExecutionResult, ExecutionStatus, RunReport};
pub use schema::{FieldSpec, FieldType, ModuleSchema, SchemaRegistry};
pub use value::Value;
pub use workflow::{CampaignGraph, CampaignId, Connection, ModuleId, ModuleInstance, ANY_INPUT};

/// Result type for campaign operations
pub type Result<T> = std::result::Result<T, CampaignError>;
