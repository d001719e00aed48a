//! # OpenDataSUS Extractor Library
//!
//! Incremental, resumable extraction of immunization records from the
//! OpenDataSUS Elasticsearch index. Records are read one calendar day at a
//! time (optionally one region at a time), projected into a fixed record
//! shape and written as JSON-lines messages together with a bookmark that lets
//! the next run continue exactly where this one stopped.
//!
//! ## Quick Start
//!
//! ```no_run
//! use opendatasus_extractor::catalog::Catalog;
//! use opendatasus_extractor::config::TapConfig;
//! use opendatasus_extractor::fetcher::{HitSource, OpenDataSusFetcher};
//! use opendatasus_extractor::output::SingerWriter;
//! use opendatasus_extractor::state::TapState;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = TapConfig::from_json(r#"{"year_month": "2021-01-01", "state_abbrev": "SC"}"#)?;
//! let source: Arc<dyn HitSource> = Arc::new(OpenDataSusFetcher::new(config.index.clone())?);
//! let mut state = TapState::default();
//! let mut out = SingerWriter::stdout();
//!
//! opendatasus_extractor::tap::do_sync(
//!     &config,
//!     source,
//!     &Catalog::discover(),
//!     &mut state,
//!     &mut out,
//!     None,
//! )
//! .await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`window`] - Day windows and month boundaries
//! - [`bookmark`] - `region|date` resumption markers
//! - [`region`] - Ordered region lists and resumption within them
//! - [`fetcher`] - Paginated scans of the remote index
//! - [`projector`] - Hit-to-record field mapping
//! - [`extractor`] - The extraction loop and its continuation policies
//! - [`output`], [`state`], [`catalog`], [`config`], [`tap`] - Running end to end

#![warn(missing_docs)]
#![warn(clippy::all)]

use serde_json::{Map, Value};

/// Resumption markers
pub mod bookmark;

/// Stream catalog and discovery
pub mod catalog;

/// CLI command implementations
pub mod cli;

/// Configuration file handling
pub mod config;

/// Extraction loop
pub mod extractor;

/// Remote index access
pub mod fetcher;

/// Observability metrics
pub mod metrics;

/// Message output channel
pub mod output;

/// Hit-to-record projection
pub mod projector;

/// Region partitioning
pub mod region;

/// State document persistence
pub mod state;

/// Sync runner
pub mod tap;

/// Date windows
pub mod window;

pub use bookmark::Bookmark;
pub use extractor::{Extractor, SyncOutcome};

/// Raw document returned by the index for one immunization event
pub type RawHit = Map<String, Value>;

/// Projected record with a fixed field order
pub type OutputRecord = Map<String, Value>;
