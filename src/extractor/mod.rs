//! Incremental extraction engine
//!
//! The extraction loop walks regions (outer, optional) and days (inner),
//! scanning one day window at a time and handing every projected record to a
//! [`crate::output::RecordSink`]. It starts from a decoded bookmark and ends
//! with the bookmark a later run resumes from.
//!
//! # Components
//!
//! - [`executor`] - The loop itself, [`Extractor`]
//! - [`policy`] - Continuation policies: [`MonthBound`] and [`WallClockBound`]
//! - [`config`] - Defaults and backoff calculation
//!
//! # Error Handling
//!
//! - Malformed bookmarks fail before any query is issued
//! - A day outside the policy's scope is a normal stop, not an error
//! - A failure inside a window is logged and surfaced as
//!   [`ExtractError::WindowFailed`]; under [`FailurePolicy::Checkpoint`] it
//!   carries the bookmark of the failed window so it can still be persisted
//! - A bookmarked region missing from the region list is an error

/// Extraction defaults
pub mod config;
/// Extraction loop
pub mod executor;
/// Continuation policies
pub mod policy;

pub use executor::{Cursor, ExtractionPlan, Extractor, StopReason, SyncOutcome};
pub use policy::{Clock, ContinuationPolicy, FixedClock, MonthBound, SystemClock, WallClockBound};

use crate::bookmark::Bookmark;
use crate::fetcher::FetcherError;
use crate::output::OutputError;
use crate::projector::ProjectionError;
use crate::region::RegionError;
use crate::window::WindowError;
use chrono::NaiveDate;

/// What happens to the bookmark when a window fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Surface the error and write no bookmark
    #[default]
    Abort,
    /// Surface the error along with the bookmark of the failed window, so the
    /// next run retries that window
    Checkpoint,
}

impl std::str::FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "abort" => Ok(FailurePolicy::Abort),
            "checkpoint" => Ok(FailurePolicy::Checkpoint),
            _ => Err(format!(
                "Invalid failure policy: {s}. Valid options: abort, checkpoint"
            )),
        }
    }
}

/// Failure inside a single window
#[derive(Debug, thiserror::Error)]
pub enum ScanFailure {
    /// The index request or scroll failed
    #[error(transparent)]
    Fetch(#[from] FetcherError),

    /// A hit did not match the record contract
    #[error(transparent)]
    Projection(#[from] ProjectionError),

    /// The record sink rejected a record
    #[error(transparent)]
    Output(#[from] OutputError),
}

/// Extraction errors
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// The persisted bookmark holds an unparseable date
    #[error("malformed bookmark date '{value}': {source}")]
    MalformedBookmark {
        /// Raw date text
        value: String,
        /// Parse failure
        #[source]
        source: WindowError,
    },

    /// Window arithmetic failed
    #[error(transparent)]
    Window(#[from] WindowError),

    /// Bookmark and region list disagree
    #[error(transparent)]
    Region(#[from] RegionError),

    /// A window failed part-way
    #[error("extraction failed for region {} on {date}: {source}", .region.as_deref().unwrap_or("*"))]
    WindowFailed {
        /// Region being extracted
        region: Option<String>,
        /// Start of the failed window
        date: NaiveDate,
        /// Bookmark to persist, set under [`FailurePolicy::Checkpoint`]
        checkpoint: Option<Bookmark>,
        /// Underlying failure
        #[source]
        source: ScanFailure,
    },
}

impl ExtractError {
    /// Bookmark that should still be persisted despite the failure
    pub fn checkpoint(&self) -> Option<&Bookmark> {
        match self {
            ExtractError::WindowFailed { checkpoint, .. } => checkpoint.as_ref(),
            _ => None,
        }
    }
}
