//! CLI error types and conversions

use crate::catalog::CatalogError;
use crate::config::ConfigError;
use crate::fetcher::FetcherError;
use crate::output::OutputError;
use crate::state::StateError;
use crate::tap::TapError;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration error
    #[error("configuration error: {0}")]
    ConfigError(#[from] ConfigError),

    /// State file error
    #[error("state error: {0}")]
    StateError(#[from] StateError),

    /// Catalog error
    #[error("catalog error: {0}")]
    CatalogError(#[from] CatalogError),

    /// Fetcher error
    #[error("fetcher error: {0}")]
    FetcherError(#[from] FetcherError),

    /// Output error
    #[error("output error: {0}")]
    OutputError(#[from] OutputError),

    /// Sync error
    #[error("sync error: {0}")]
    SyncError(#[from] TapError),

    /// Metrics exporter could not be started
    #[error("metrics error: {0}")]
    MetricsError(String),
}
