//! Scan driver for the remote search index
//!
//! A [`HitSource`] turns one day window (optionally filtered by region) into a
//! lazy, paginated stream of raw hits. The production implementation,
//! [`opendatasus::OpenDataSusFetcher`], speaks the Elasticsearch scroll API.

use crate::RawHit;
use async_trait::async_trait;
use chrono::NaiveDate;
use futures_util::Stream;
use std::pin::Pin;

/// Index endpoint and credentials
pub mod index_config;
/// OpenDataSUS hit source
pub mod opendatasus;
/// Search request bodies
pub mod query;
/// Scroll pagination
pub mod scroll;
/// HTTP client for the search API
pub mod search_http;

pub use index_config::{IndexAuth, IndexConfig};
pub use opendatasus::OpenDataSusFetcher;

/// Fetcher errors
#[derive(Debug, thiserror::Error)]
pub enum FetcherError {
    /// HTTP request error
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Response parse error
    #[error("parse error: {0}")]
    ParseError(String),

    /// Error reported by the index
    #[error("index error: {0}")]
    IndexError(String),

    /// Credentials were rejected
    #[error("authentication failed: {0}")]
    AuthError(String),

    /// Rate limit exceeded
    #[error("rate limit exceeded")]
    RateLimitExceeded,

    /// Network error
    #[error("network error: {0}")]
    NetworkError(String),

    /// Scroll did not terminate within the page limit
    #[error("scroll exceeded {0} pages")]
    PageLimitExceeded(usize),

    /// Invalid client configuration
    #[error("configuration error: {0}")]
    ConfigError(String),
}

/// Result type for fetcher operations
pub type FetcherResult<T> = Result<T, FetcherError>;

/// Stream of raw hits for one window
pub type HitStream = Pin<Box<dyn Stream<Item = FetcherResult<RawHit>> + Send>>;

/// Source of raw hits, one day window at a time
#[async_trait]
pub trait HitSource: Send + Sync {
    /// Scan every hit in `[from_date, to_date)`
    ///
    /// # Arguments
    /// * `region` - Exact-match region filter; `None` scans all regions
    /// * `from_date` - Inclusive lower bound on the application date
    /// * `to_date` - Exclusive upper bound on the application date
    ///
    /// # Returns
    /// A finite stream consumed once. Pages are fetched as the stream is
    /// polled; no request is retried at this level.
    async fn scan(
        &self,
        region: Option<&str>,
        from_date: NaiveDate,
        to_date: NaiveDate,
    ) -> FetcherResult<HitStream>;

    /// Human-readable description of the source, used in logs
    fn describe(&self) -> String;
}

#[async_trait]
impl<T: HitSource + ?Sized> HitSource for std::sync::Arc<T> {
    async fn scan(
        &self,
        region: Option<&str>,
        from_date: NaiveDate,
        to_date: NaiveDate,
    ) -> FetcherResult<HitStream> {
        (**self).scan(region, from_date, to_date).await
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
