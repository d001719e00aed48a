//! OpenDataSUS immunization index fetcher
//!
//! Issues one scroll per day window against the Elasticsearch index behind the
//! public OpenDataSUS API, filtered by establishment region and vaccination
//! date.

use crate::fetcher::index_config::IndexConfig;
use crate::fetcher::query::{clear_scroll, scroll_continuation, window_query};
use crate::fetcher::scroll::{scroll_hits, ScrollTransport, SearchPage, SearchResponse};
use crate::fetcher::search_http::SearchHttpClient;
use crate::fetcher::{FetcherResult, HitSource, HitStream};
use crate::window::format_date;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Scroll transport over HTTP
pub struct HttpScrollTransport {
    http: SearchHttpClient,
    search_path: String,
    keep_alive: String,
}

impl HttpScrollTransport {
    /// Create a transport for the configured index
    pub fn new(http: SearchHttpClient, config: &IndexConfig) -> Self {
        Self {
            http,
            search_path: config.search_path(),
            keep_alive: config.scroll_keep_alive.clone(),
        }
    }
}

#[async_trait]
impl ScrollTransport for HttpScrollTransport {
    async fn open(&self, body: &Value) -> FetcherResult<SearchPage> {
        let query = [("scroll", self.keep_alive.clone())];
        let response: SearchResponse = self.http.post_json(&self.search_path, &query, body).await?;
        response.into_page()
    }

    async fn next_page(&self, scroll_id: &str) -> FetcherResult<SearchPage> {
        let body = scroll_continuation(scroll_id, &self.keep_alive);
        // The cursor moves even if the response is lost, so never retry
        let response: SearchResponse = self
            .http
            .post_json_once("/_search/scroll", &[], &body)
            .await?;
        response.into_page()
    }

    async fn clear(&self, scroll_id: &str) -> FetcherResult<()> {
        self.http
            .delete_json("/_search/scroll", &clear_scroll(scroll_id))
            .await
    }
}

/// Fetcher for the OpenDataSUS immunization index
pub struct OpenDataSusFetcher {
    config: IndexConfig,
    transport: Arc<dyn ScrollTransport>,
}

impl OpenDataSusFetcher {
    /// Create a fetcher talking HTTP to the configured index
    pub fn new(config: IndexConfig) -> FetcherResult<Self> {
        let http = SearchHttpClient::from_config(&config)?;
        let transport = Arc::new(HttpScrollTransport::new(http, &config));
        Ok(Self { config, transport })
    }

    /// Create a fetcher over a custom transport
    pub fn with_transport(config: IndexConfig, transport: Arc<dyn ScrollTransport>) -> Self {
        Self { config, transport }
    }
}

#[async_trait]
impl HitSource for OpenDataSusFetcher {
    async fn scan(
        &self,
        region: Option<&str>,
        from_date: NaiveDate,
        to_date: NaiveDate,
    ) -> FetcherResult<HitStream> {
        let body = window_query(
            &self.config.region_field,
            &self.config.date_field,
            region,
            from_date,
            to_date,
            self.config.page_size,
        );

        debug!(
            region = region.unwrap_or("*"),
            from = %format_date(from_date),
            to = %format_date(to_date),
            index = %self.config.index,
            "Opening scroll for window"
        );

        Ok(scroll_hits(Arc::clone(&self.transport), body))
    }

    fn describe(&self) -> String {
        format!("{}/{}", self.config.base_url(), self.config.index)
    }
}
