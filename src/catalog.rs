//! Stream catalog
//!
//! Discovery produces a single `vaccinations` stream whose JSON schema is
//! derived from the projector's field table, so the advertised schema always
//! matches the emitted records. A catalog file may be supplied instead to
//! deselect streams.

use crate::projector::{FieldKind, FIELD_MAP, WINDOW_START_FIELD, YEAR_MONTH_FIELD};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::path::Path;
use tracing::{debug, warn};

/// Stream id of the immunization records
pub const VACCINATIONS_STREAM: &str = "vaccinations";

/// Streams this extractor can sync
pub const KNOWN_STREAMS: [&str; 1] = [VACCINATIONS_STREAM];

/// Catalog errors
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// Catalog document is not valid
    #[error("invalid catalog: {0}")]
    InvalidCatalog(String),
}

/// Metadata entry attached to a breadcrumb
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataEntry {
    /// Path the metadata applies to; empty for the stream itself
    #[serde(default)]
    pub breadcrumb: Vec<String>,
    /// Metadata values
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// One stream of the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Stream id
    pub tap_stream_id: String,
    /// Stream name
    pub stream: String,
    /// JSON schema of the records
    pub schema: Value,
    /// Fields identifying a record
    #[serde(default)]
    pub key_properties: Vec<String>,
    /// Breadcrumb metadata
    #[serde(default)]
    pub metadata: Vec<MetadataEntry>,
}

impl CatalogEntry {
    /// Whether the stream-level metadata marks the entry as selected
    pub fn is_selected(&self) -> bool {
        self.metadata
            .iter()
            .filter(|entry| entry.breadcrumb.is_empty())
            .any(|entry| entry.metadata.get("selected").and_then(Value::as_bool) == Some(true))
    }
}

/// Catalog of streams
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    /// Stream entries
    pub streams: Vec<CatalogEntry>,
}

impl Catalog {
    /// Catalog advertising every stream this extractor supports, all selected
    pub fn discover() -> Self {
        let mut root = Map::new();
        root.insert("selected".to_string(), Value::Bool(true));
        root.insert("inclusion".to_string(), json!("available"));
        root.insert("forced-replication-method".to_string(), json!("INCREMENTAL"));
        root.insert("table-key-properties".to_string(), json!(["document_id"]));
        root.insert(
            "valid-replication-keys".to_string(),
            json!(["vacina_dataAplicacao"]),
        );

        Self {
            streams: vec![CatalogEntry {
                tap_stream_id: VACCINATIONS_STREAM.to_string(),
                stream: VACCINATIONS_STREAM.to_string(),
                schema: vaccinations_schema(),
                key_properties: vec!["document_id".to_string()],
                metadata: vec![MetadataEntry {
                    breadcrumb: Vec::new(),
                    metadata: root,
                }],
            }],
        }
    }

    /// Parse a catalog document
    pub fn from_json(contents: &str) -> Result<Self, CatalogError> {
        serde_json::from_str(contents).map_err(|e| CatalogError::InvalidCatalog(e.to_string()))
    }

    /// Load a catalog file
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| CatalogError::IoError(format!("{}: {e}", path.display())))?;
        let catalog = Self::from_json(&contents)?;
        debug!(path = %path.display(), streams = catalog.streams.len(), "Catalog loaded");
        Ok(catalog)
    }

    /// Selected entries this extractor knows how to sync, in catalog order
    pub fn selected_streams(&self) -> Vec<&CatalogEntry> {
        self.streams
            .iter()
            .filter(|entry| entry.is_selected())
            .filter(|entry| {
                let known = KNOWN_STREAMS.contains(&entry.tap_stream_id.as_str());
                if !known {
                    warn!(stream = %entry.tap_stream_id, "Skipping unknown stream");
                }
                known
            })
            .collect()
    }

    /// Pretty-printed catalog JSON
    pub fn to_json_pretty(&self) -> Result<String, CatalogError> {
        serde_json::to_string_pretty(self).map_err(|e| CatalogError::InvalidCatalog(e.to_string()))
    }
}

/// JSON schema of a vaccination record, in output field order
pub fn vaccinations_schema() -> Value {
    let mut properties = Map::new();
    for mapping in FIELD_MAP.iter() {
        properties.insert(mapping.output.to_string(), field_schema(mapping.kind));
    }
    properties.insert(YEAR_MONTH_FIELD.to_string(), field_schema(FieldKind::Date));
    properties.insert(WINDOW_START_FIELD.to_string(), field_schema(FieldKind::Date));

    json!({
        "type": "object",
        "additionalProperties": false,
        "properties": properties,
    })
}

fn field_schema(kind: FieldKind) -> Value {
    match kind {
        FieldKind::String => json!({"type": ["null", "string"]}),
        FieldKind::Integer => json!({"type": ["null", "integer", "string"]}),
        FieldKind::Date => json!({"type": ["null", "string"], "format": "date"}),
        FieldKind::DateTime => json!({"type": ["null", "string"], "format": "date-time"}),
    }
}
