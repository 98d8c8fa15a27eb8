//! Reference-data lookup
//!
//! Resolves a (name, source) pair to a full creature record. The engine only
//! uses it when adding combatants by reference, and must keep working when
//! the lookup is offline: an unresolved reference becomes a stub record that
//! normalizes to conservative defaults.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Lookup errors
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("failed to read catalog: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("catalog must be a JSON array of creature records")]
    NotAnArray,

    #[error("reference service unavailable: {0}")]
    Unavailable(String),
}

/// Resolves creature references to full records
#[async_trait]
pub trait ReferenceLookup: Send + Sync {
    async fn resolve(&self, name: &str, source: &str) -> Result<Option<Value>, LookupError>;
}

/// Lookup used when no reference data is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct Offline;

#[async_trait]
impl ReferenceLookup for Offline {
    async fn resolve(&self, _name: &str, _source: &str) -> Result<Option<Value>, LookupError> {
        Ok(None)
    }
}

fn catalog_key(name: &str, source: &str) -> (String, String) {
    (name.trim().to_lowercase(), source.trim().to_lowercase())
}

/// In-memory catalog of creature records keyed by (name, source)
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    entries: HashMap<(String, String), Value>,
}

impl StaticCatalog {
    /// Build a catalog; records without a name or source are skipped
    pub fn from_records(records: Vec<Value>) -> Self {
        let mut entries = HashMap::new();
        for record in records {
            let name = record.get("name").and_then(Value::as_str);
            let source = record.get("source").and_then(Value::as_str);
            match (name, source) {
                (Some(name), Some(source)) => {
                    entries.insert(catalog_key(name, source), record.clone());
                }
                _ => debug!("Skipping catalog record without name/source"),
            }
        }
        Self { entries }
    }

    /// Load a catalog from a JSON array file
    pub fn load(path: &Path) -> Result<Self, LookupError> {
        let text = std::fs::read_to_string(path)?;
        let Value::Array(records) = serde_json::from_str::<Value>(&text)? else {
            return Err(LookupError::NotAnArray);
        };

        let catalog = Self::from_records(records);
        info!(
            "Loaded {} reference records from {}",
            catalog.len(),
            path.display()
        );
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl ReferenceLookup for StaticCatalog {
    async fn resolve(&self, name: &str, source: &str) -> Result<Option<Value>, LookupError> {
        Ok(self.entries.get(&catalog_key(name, source)).cloned())
    }
}

/// Resolve a reference, falling back to a bare `{name, source}` record
pub async fn resolve_or_stub(lookup: &dyn ReferenceLookup, name: &str, source: &str) -> Value {
    match lookup.resolve(name, source).await {
        Ok(Some(record)) => record,
        Ok(None) => {
            debug!("No reference record for '{}' ({})", name, source);
            json!({"name": name, "source": source})
        }
        Err(e) => {
            warn!("Reference lookup failed for '{}' ({}): {}", name, source, e);
            json!({"name": name, "source": source})
        }
    }
}
