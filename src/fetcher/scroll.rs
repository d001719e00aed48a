//! Scroll pagination
//!
//! Turns the index's scroll API into one lazy stream of hits:
//! - the first page is requested when the stream is first polled
//! - each following page is requested only after the previous one is drained
//! - an empty page ends the stream and clears the scroll context
//!
//! Includes safety mechanisms:
//! - Maximum page limit to prevent a scroll that never ends
//! - Shard failures reported by the index are surfaced as errors
//!
//! A stream dropped before completion leaves its scroll context to expire on
//! the server after the keep-alive period.

use crate::fetcher::{FetcherError, FetcherResult, HitStream};
use crate::metrics;
use crate::RawHit;
use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Maximum number of pages read from one scroll
pub const MAX_PAGES: usize = 100_000;

/// One page of a scroll
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchPage {
    /// Scroll id for the next page, if the index opened a scroll context
    pub scroll_id: Option<String>,
    /// Document sources on this page
    pub hits: Vec<RawHit>,
}

/// Transport used to walk a scroll
#[async_trait]
pub trait ScrollTransport: Send + Sync {
    /// Run the initial search and open a scroll context
    async fn open(&self, body: &Value) -> FetcherResult<SearchPage>;

    /// Fetch the page after `scroll_id`
    async fn next_page(&self, scroll_id: &str) -> FetcherResult<SearchPage>;

    /// Release the scroll context
    async fn clear(&self, scroll_id: &str) -> FetcherResult<()>;
}

/// Search response as returned by the index
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(rename = "_scroll_id")]
    scroll_id: Option<String>,
    #[serde(rename = "_shards")]
    shards: Option<ShardSummary>,
    hits: HitsEnvelope,
}

#[derive(Debug, Deserialize)]
struct ShardSummary {
    #[serde(default)]
    total: u64,
    #[serde(default)]
    failed: u64,
}

#[derive(Debug, Deserialize)]
struct HitsEnvelope {
    #[serde(default)]
    hits: Vec<HitEnvelope>,
}

#[derive(Debug, Deserialize)]
struct HitEnvelope {
    #[serde(rename = "_source", default)]
    source: RawHit,
}

impl SearchResponse {
    /// Convert into a page, rejecting responses with failed shards
    pub fn into_page(self) -> FetcherResult<SearchPage> {
        if let Some(shards) = &self.shards {
            if shards.failed > 0 {
                return Err(FetcherError::IndexError(format!(
                    "scroll request failed on {} of {} shards",
                    shards.failed, shards.total
                )));
            }
        }

        Ok(SearchPage {
            scroll_id: self.scroll_id,
            hits: self.hits.hits.into_iter().map(|hit| hit.source).collect(),
        })
    }
}

enum ScrollState {
    Start(Value),
    Open { scroll_id: String, pages: usize },
    Done,
}

/// Lazily walk a scroll as one stream of hits
pub fn scroll_hits(transport: Arc<dyn ScrollTransport>, body: Value) -> HitStream {
    let pages = stream::unfold(ScrollState::Start(body), move |state| {
        let transport = Arc::clone(&transport);
        async move {
            let (result, pages_read) = match state {
                ScrollState::Done => return None,
                ScrollState::Start(body) => (transport.open(&body).await, 0),
                ScrollState::Open { scroll_id, pages } => {
                    if pages >= MAX_PAGES {
                        release(transport.as_ref(), &scroll_id).await;
                        return Some((
                            Err(FetcherError::PageLimitExceeded(MAX_PAGES)),
                            ScrollState::Done,
                        ));
                    }
                    match transport.next_page(&scroll_id).await {
                        Ok(page) => {
                            let page = SearchPage {
                                scroll_id: page.scroll_id.or(Some(scroll_id)),
                                hits: page.hits,
                            };
                            (Ok(page), pages)
                        }
                        Err(e) => {
                            release(transport.as_ref(), &scroll_id).await;
                            (Err(e), pages)
                        }
                    }
                }
            };

            let page = match result {
                Ok(page) => page,
                Err(e) => return Some((Err(e), ScrollState::Done)),
            };

            let page_number = pages_read + 1;
            metrics::record_scan_page();

            if page.hits.is_empty() {
                debug!(page = page_number, "Empty page received, scroll complete");
                if let Some(scroll_id) = &page.scroll_id {
                    release(transport.as_ref(), scroll_id).await;
                }
                return None;
            }

            debug!(page = page_number, hits = page.hits.len(), "Received scroll page");

            let next = match page.scroll_id {
                Some(scroll_id) => ScrollState::Open {
                    scroll_id,
                    pages: page_number,
                },
                None => ScrollState::Done,
            };
            Some((Ok(page.hits), next))
        }
    });

    Box::pin(pages.flat_map(|page| {
        let items: Vec<FetcherResult<RawHit>> = match page {
            Ok(hits) => hits.into_iter().map(Ok).collect(),
            Err(e) => vec![Err(e)],
        };
        stream::iter(items)
    }))
}

async fn release(transport: &dyn ScrollTransport, scroll_id: &str) {
    if let Err(e) = transport.clear(scroll_id).await {
        warn!(error = %e, "Failed to clear scroll context");
    }
}
