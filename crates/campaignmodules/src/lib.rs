//! Built-in marketing modules
//!
//! Schemas, compatibility rules and value transformers for the bundled
//! module types, plus the invokers that run them: over HTTP against the
//! module services, or as a local dry run.

mod catalog;
mod compatibility;
mod dry_run;
mod http;
pub mod schemas;
mod transforms;

pub use catalog::Catalog;
pub use compatibility::builtin_matrix;
pub use dry_run::DryRunInvoker;
pub use http::{HttpInvokerConfig, HttpModuleInvoker};
pub use schemas::builtin_schemas;
pub use transforms::{builtin_transformers, register_defaults};
