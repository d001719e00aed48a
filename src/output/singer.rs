//! JSON-lines message writer
//!
//! Every message is one JSON object on its own line:
//!
//! ```text
//! {"type":"SCHEMA","stream":"vaccinations","schema":{..},"key_properties":["document_id"]}
//! {"type":"RECORD","stream":"vaccinations","record":{..}}
//! {"type":"STATE","value":{"currently_syncing":null,"bookmarks":{..}}}
//! ```

use super::{OutputError, OutputResult, OutputWriter, RecordSink, SchemaSink, StateSink};
use crate::metrics;
use crate::state::TapState;
use crate::OutputRecord;
use serde::Serialize;
use serde_json::Value;
use std::io::{BufWriter, Stdout, Write};
use tracing::debug;

const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
enum Message<'a> {
    Schema {
        stream: &'a str,
        schema: &'a Value,
        key_properties: &'a [String],
    },
    Record {
        stream: &'a str,
        record: &'a OutputRecord,
    },
    State {
        value: &'a TapState,
    },
}

/// Writes messages as JSON lines
///
/// Output is buffered and flushed after every STATE message, so a persisted
/// bookmark never runs ahead of the records it covers.
pub struct SingerWriter<W: Write> {
    writer: BufWriter<W>,
    records_written: u64,
}

impl SingerWriter<Stdout> {
    /// Writer on standard output
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> SingerWriter<W> {
    /// Create a writer over `inner`
    pub fn new(inner: W) -> Self {
        Self {
            writer: BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, inner),
            records_written: 0,
        }
    }

    /// Number of RECORD messages written so far
    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    /// Flush and return the underlying writer
    pub fn into_inner(self) -> OutputResult<W> {
        self.writer
            .into_inner()
            .map_err(|e| OutputError::FlushError(format!("Failed to flush: {}", e.error())))
    }

    fn write_message(&mut self, message: &Message<'_>) -> OutputResult<()> {
        serde_json::to_writer(&mut self.writer, message)
            .map_err(|e| OutputError::SerializationError(e.to_string()))?;
        self.writer
            .write_all(b"\n")
            .map_err(|e| OutputError::IoError(format!("Failed to write message: {e}")))
    }
}

impl<W: Write> RecordSink for SingerWriter<W> {
    fn write_records(&mut self, stream: &str, records: &[OutputRecord]) -> OutputResult<()> {
        for record in records {
            self.write_message(&Message::Record { stream, record })?;
        }
        self.records_written += records.len() as u64;
        metrics::record_records_emitted(stream, records.len() as u64);
        Ok(())
    }
}

impl<W: Write> StateSink for SingerWriter<W> {
    fn write_state(&mut self, state: &TapState) -> OutputResult<()> {
        self.write_message(&Message::State { value: state })?;
        self.flush()?;
        debug!(records_written = self.records_written, "State message written");
        Ok(())
    }
}

impl<W: Write> SchemaSink for SingerWriter<W> {
    fn write_schema(
        &mut self,
        stream: &str,
        schema: &Value,
        key_properties: &[String],
    ) -> OutputResult<()> {
        self.write_message(&Message::Schema {
            stream,
            schema,
            key_properties,
        })
    }
}

impl<W: Write> OutputWriter for SingerWriter<W> {
    fn flush(&mut self) -> OutputResult<()> {
        self.writer
            .flush()
            .map_err(|e| OutputError::FlushError(format!("Failed to flush: {e}")))
    }
}
