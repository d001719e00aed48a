//! Record projection
//!
//! Maps one raw search hit to an output record with a fixed field set and
//! order. The mapping is a single declarative table, shared with the catalog so
//! the discovered schema and the emitted records cannot drift apart.

use crate::window::format_date;
use crate::{OutputRecord, RawHit};
use chrono::NaiveDate;
use serde_json::Value;
use tracing::debug;

/// JSON type hint for a projected field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Free text or code
    String,
    /// Whole number
    Integer,
    /// `YYYY-MM-DD` style date string
    Date,
    /// ISO-8601 timestamp string
    DateTime,
}

/// One entry of the hit-to-record mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMapping {
    /// Field name in the index document
    pub source: &'static str,
    /// Field name in the output record
    pub output: &'static str,
    /// Type hint used for the discovered schema
    pub kind: FieldKind,
}

const fn same(name: &'static str, kind: FieldKind) -> FieldMapping {
    FieldMapping {
        source: name,
        output: name,
        kind,
    }
}

const fn renamed(source: &'static str, output: &'static str, kind: FieldKind) -> FieldMapping {
    FieldMapping {
        source,
        output,
        kind,
    }
}

/// Number of fields copied from every hit
pub const FIELD_COUNT: usize = 37;

/// Hit fields in output order
///
/// Names follow the upstream index verbatim, including its spelling of
/// `estalecimento_noFantasia`. Only the two `@`-prefixed metadata fields are
/// renamed.
pub const FIELD_MAP: [FieldMapping; FIELD_COUNT] = [
    same("document_id", FieldKind::String),
    same("paciente_id", FieldKind::String),
    same("paciente_idade", FieldKind::Integer),
    same("paciente_dataNascimento", FieldKind::Date),
    same("paciente_enumSexoBiologico", FieldKind::String),
    same("paciente_racaCor_codigo", FieldKind::String),
    same("paciente_racaCor_valor", FieldKind::String),
    same("paciente_endereco_coIbgeMunicipio", FieldKind::String),
    same("paciente_endereco_coPais", FieldKind::String),
    same("paciente_endereco_nmMunicipio", FieldKind::String),
    same("paciente_endereco_nmPais", FieldKind::String),
    same("paciente_endereco_uf", FieldKind::String),
    same("paciente_endereco_cep", FieldKind::String),
    same("paciente_nacionalidade_enumNacionalidade", FieldKind::String),
    same("estabelecimento_valor", FieldKind::String),
    same("estabelecimento_razaoSocial", FieldKind::String),
    same("estalecimento_noFantasia", FieldKind::String),
    same("estabelecimento_municipio_codigo", FieldKind::String),
    same("estabelecimento_municipio_nome", FieldKind::String),
    same("estabelecimento_uf", FieldKind::String),
    same("vacina_grupoAtendimento_codigo", FieldKind::String),
    same("vacina_grupoAtendimento_nome", FieldKind::String),
    same("vacina_categoria_codigo", FieldKind::String),
    same("vacina_categoria_nome", FieldKind::String),
    same("vacina_lote", FieldKind::String),
    same("vacina_fabricante_nome", FieldKind::String),
    same("vacina_fabricante_referencia", FieldKind::String),
    same("vacina_dataAplicacao", FieldKind::Date),
    same("vacina_descricao_dose", FieldKind::String),
    same("vacina_codigo", FieldKind::String),
    same("vacina_nome", FieldKind::String),
    same("sistema_origem", FieldKind::String),
    same("id_sistema_origem", FieldKind::String),
    same("data_importacao_rnds", FieldKind::DateTime),
    same("redshift", FieldKind::String),
    renamed("@timestamp", "timestamp", FieldKind::DateTime),
    renamed("@version", "version", FieldKind::String),
];

/// Context field carrying the period marker in month-scoped runs
pub const YEAR_MONTH_FIELD: &str = "year_month";

/// Context field carrying the window start in continuous runs
pub const WINDOW_START_FIELD: &str = "window_start";

/// Extraction context injected into every record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordContext {
    /// Period marker of a month-scoped run
    pub period_marker: Option<String>,
    /// Start of the window the hit was read from
    pub window_start: Option<NaiveDate>,
}

impl RecordContext {
    /// Context for a month-scoped run
    pub fn period(period_marker: impl Into<String>) -> Self {
        Self {
            period_marker: Some(period_marker.into()),
            window_start: None,
        }
    }

    /// Context for a continuous run
    pub fn window(window_start: NaiveDate) -> Self {
        Self {
            period_marker: None,
            window_start: Some(window_start),
        }
    }
}

/// Projection errors
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ProjectionError {
    /// A mapped field is absent from the hit
    #[error("hit {document_id} is missing field '{field}'")]
    MissingField {
        /// Source field name
        field: &'static str,
        /// `document_id` of the offending hit, or `<unknown>`
        document_id: String,
    },
}

/// Project a raw hit into an output record
///
/// Every field of [`FIELD_MAP`] must be present (a JSON `null` counts as
/// present). Fields the table does not name are dropped.
pub fn project(hit: &RawHit, context: &RecordContext) -> Result<OutputRecord, ProjectionError> {
    let mut record = OutputRecord::with_capacity(FIELD_COUNT + 2);

    for mapping in FIELD_MAP.iter() {
        let value = hit
            .get(mapping.source)
            .ok_or_else(|| ProjectionError::MissingField {
                field: mapping.source,
                document_id: document_id(hit),
            })?;
        record.insert(mapping.output.to_string(), value.clone());
    }

    if hit.len() > FIELD_COUNT {
        let extra: Vec<&str> = hit
            .keys()
            .map(String::as_str)
            .filter(|key| !FIELD_MAP.iter().any(|m| m.source == *key))
            .collect();
        debug!(document_id = %document_id(hit), ?extra, "Ignoring unmapped hit fields");
    }

    if let Some(marker) = &context.period_marker {
        record.insert(YEAR_MONTH_FIELD.to_string(), Value::String(marker.clone()));
    }
    if let Some(start) = context.window_start {
        record.insert(WINDOW_START_FIELD.to_string(), Value::String(format_date(start)));
    }

    Ok(record)
}

/// Output field names in emission order, context fields last
pub fn output_fields() -> impl Iterator<Item = &'static str> {
    FIELD_MAP
        .iter()
        .map(|m| m.output)
        .chain([YEAR_MONTH_FIELD, WINDOW_START_FIELD])
}

fn document_id(hit: &RawHit) -> String {
    match hit.get("document_id") {
        Some(Value::String(id)) => id.clone(),
        Some(other) => other.to_string(),
        None => "<unknown>".to_string(),
    }
}
