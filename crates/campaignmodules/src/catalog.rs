use crate::compatibility::builtin_matrix;
use crate::schemas::builtin_schemas;
use campaigncore::{CompatibilityMatrix, Result, SchemaRegistry};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Module schemas plus the compatibility matrix between their fields.
///
/// On disk this is a JSON object `{ "schemas": [...], "compatibility": {...} }`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    pub schemas: SchemaRegistry,
    #[serde(default)]
    pub compatibility: CompatibilityMatrix,
}

impl Catalog {
    /// The marketing modules shipped with the engine
    pub fn builtin() -> Self {
        Self {
            schemas: builtin_schemas(),
            compatibility: builtin_matrix(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let catalog = Self::from_json(&std::fs::read_to_string(path)?)?;
        tracing::info!(
            "Loaded catalog from {}: {} module types, {} compatibility entries",
            path.display(),
            catalog.schemas.len(),
            catalog.compatibility.len()
        );
        Ok(catalog)
    }

    /// Catalog file when given, built-in catalog otherwise
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_path(path),
            None => Ok(Self::builtin()),
        }
    }
}
