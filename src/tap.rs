//! Sync runner
//!
//! For every selected stream: write its schema, run the extraction loop from
//! the stored bookmark, then record the new bookmark in the state document and
//! emit it. A final state message clears `currently_syncing`.

use crate::bookmark::BOOKMARK_KEY;
use crate::catalog::Catalog;
use crate::config::{ConfigError, TapConfig};
use crate::extractor::{ExtractError, Extractor, SyncOutcome};
use crate::fetcher::HitSource;
use crate::output::{OutputError, RecordSink, SchemaSink, StateSink};
use crate::state::{StateError, TapState};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Sync errors
#[derive(Debug, thiserror::Error)]
pub enum TapError {
    /// Configuration could not be turned into a plan
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Extraction failed
    #[error(transparent)]
    Extract(#[from] ExtractError),

    /// Writing to the output channel failed
    #[error(transparent)]
    Output(#[from] OutputError),

    /// Persisting the state file failed
    #[error(transparent)]
    State(#[from] StateError),
}

/// Outcome of one synced stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamOutcome {
    /// Stream id
    pub stream: String,
    /// Extraction outcome
    pub outcome: SyncOutcome,
}

/// Sync every selected stream of `catalog`
///
/// # Arguments
/// * `config` - Validated configuration
/// * `source` - Hit source shared by all streams
/// * `catalog` - Streams to sync
/// * `state` - State document, updated in place
/// * `out` - Output channel for schema, record and state messages
/// * `state_output` - Optional file the state is also saved to after each stream
///
/// # Errors
/// The first failing stream ends the sync. When the failure carries a
/// checkpoint bookmark it is written to `state` and emitted before returning.
pub async fn do_sync<O>(
    config: &TapConfig,
    source: Arc<dyn HitSource>,
    catalog: &Catalog,
    state: &mut TapState,
    out: &mut O,
    state_output: Option<&Path>,
) -> Result<Vec<StreamOutcome>, TapError>
where
    O: RecordSink + StateSink + SchemaSink + ?Sized,
{
    let selected = catalog.selected_streams();
    if selected.is_empty() {
        warn!("No streams selected, nothing to sync");
    }

    let mut outcomes = Vec::with_capacity(selected.len());

    for entry in selected {
        let stream = entry.tap_stream_id.as_str();
        info!(stream, source = %source.describe(), "Syncing stream");

        out.write_schema(stream, &entry.schema, &entry.key_properties)?;

        let extractor = Extractor::new(
            Box::new(Arc::clone(&source)),
            config.continuation_policy()?,
            config.extraction_plan(stream),
        );

        let bookmark = state.get_bookmark(stream, BOOKMARK_KEY).map(str::to_string);
        state.set_currently_syncing(Some(stream));

        let outcome = match extractor.run(bookmark.as_deref(), &mut *out).await {
            Ok(outcome) => outcome,
            Err(e) => {
                if let Some(value) = e.checkpoint().and_then(|checkpoint| checkpoint.encode()) {
                    warn!(stream, bookmark = %value, "Saving checkpoint of failed window");
                    state.write_bookmark(stream, BOOKMARK_KEY, value);
                    emit_state(state, &mut *out, state_output)?;
                }
                return Err(e.into());
            }
        };

        if let Some(value) = outcome.bookmark.encode() {
            state.write_bookmark(stream, BOOKMARK_KEY, value);
        }
        emit_state(state, &mut *out, state_output)?;

        info!(
            stream,
            records = outcome.records,
            windows = outcome.windows,
            bookmark = %outcome.bookmark,
            "Stream synced"
        );
        outcomes.push(StreamOutcome {
            stream: stream.to_string(),
            outcome,
        });
    }

    state.set_currently_syncing(None);
    emit_state(state, &mut *out, state_output)?;
    info!(streams = outcomes.len(), "Sync completed");

    Ok(outcomes)
}

fn emit_state<O>(state: &TapState, out: &mut O, state_output: Option<&Path>) -> Result<(), TapError>
where
    O: StateSink + ?Sized,
{
    out.write_state(state)?;
    if let Some(path) = state_output {
        state.save(path)?;
    }
    Ok(())
}
