use thiserror::Error;

#[derive(Error, Debug)]
pub enum CampaignError {
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("Run cancelled after {completed}/{total} modules")]
    Cancelled { completed: usize, total: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Problems with the graph definition itself. A run never starts when one
/// of these is found.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("Connection from '{0}' loops back onto itself")]
    SelfLoop(String),

    #[error("Connection references unknown module: {0}")]
    UnknownModule(String),

    #[error("Duplicate module id: {0}")]
    DuplicateModule(String),

    #[error("Unknown module type: {0}")]
    UnknownModuleType(String),

    #[error("Module type '{module_type}' has no {direction} field '{field}'")]
    UnknownField {
        module_type: String,
        direction: &'static str,
        field: String,
    },

    #[error("Incompatible connection: {source_key} cannot feed {target_key}")]
    Incompatible {
        source_key: String,
        target_key: String,
    },
}

/// Failures inside a module invocation. These never escape the invoker;
/// their display text becomes the `error` of an `ExecutionResult`.
#[derive(Error, Debug, Clone)]
pub enum InvokeError {
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("{module_type} returned HTTP {status}: {detail}")]
    Status {
        module_type: String,
        status: u16,
        detail: String,
    },

    #[error("malformed response from {module_type}: {message}")]
    MalformedResponse {
        module_type: String,
        message: String,
    },

    #[error("{module_type} reported status '{status}': {message}")]
    Rejected {
        module_type: String,
        status: String,
        message: String,
    },

    #[error("no invoker registered for module type {0}")]
    Unrouted(String),

    #[error("invocation of {module_type} aborted: {message}")]
    Aborted {
        module_type: String,
        message: String,
    },
}
