//! Message output channel
//!
//! The extraction loop only knows the sink traits defined here. The concrete
//! writer, [`singer::SingerWriter`], serializes schema, record and state
//! messages as JSON lines.

use crate::state::TapState;
use crate::OutputRecord;
use serde_json::Value;

/// JSON-lines message writer
pub mod singer;

pub use singer::SingerWriter;

/// Output writer errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// Buffer flush error
    #[error("flush error: {0}")]
    FlushError(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Generic output writer trait
pub trait OutputWriter {
    /// Flush any buffered data
    fn flush(&mut self) -> OutputResult<()>;
}

/// Receives projected records
pub trait RecordSink {
    /// Write a batch of records for `stream`, preserving order
    fn write_records(&mut self, stream: &str, records: &[OutputRecord]) -> OutputResult<()>;
}

/// Receives state documents holding bookmarks
pub trait StateSink {
    /// Write the full state document
    fn write_state(&mut self, state: &TapState) -> OutputResult<()>;
}

/// Receives stream schemas, once per stream before its records
pub trait SchemaSink {
    /// Write the schema of `stream`
    fn write_schema(
        &mut self,
        stream: &str,
        schema: &Value,
        key_properties: &[String],
    ) -> OutputResult<()>;
}
