//! HTTP client for the search index
//!
//! Wraps a shared [`reqwest::Client`] with:
//! - credentials (basic or bearer) applied to every request
//! - retry with exponential backoff for transient failures
//! - mapping of HTTP status codes to [`FetcherError`] variants
//!
//! Only idempotent requests may be retried. A scroll continuation advances the
//! server-side cursor even when its response is lost, so it goes through
//! [`SearchHttpClient::post_json_once`].

use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::extractor::config::calculate_backoff;
use crate::fetcher::index_config::{IndexAuth, IndexConfig};
use crate::fetcher::{FetcherError, FetcherResult};
use crate::metrics;

/// HTTP client bound to one search index
pub struct SearchHttpClient {
    client: Arc<Client>,
    base_url: String,
    auth: IndexAuth,
    max_retries: u32,
}

impl SearchHttpClient {
    /// Build a client from index configuration
    pub fn from_config(config: &IndexConfig) -> FetcherResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| FetcherError::ConfigError(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self::new(
            Arc::new(client),
            config.base_url(),
            config.auth.clone(),
            config.max_retries,
        ))
    }

    /// Create a client around an existing [`reqwest::Client`]
    pub fn new(
        client: Arc<Client>,
        base_url: impl Into<String>,
        auth: IndexAuth,
        max_retries: u32,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            auth,
            max_retries,
        }
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST a JSON body and deserialize the JSON response
    ///
    /// # Arguments
    /// * `path` - Path relative to the base URL (e.g. "/desc-imunizacao/_search")
    /// * `query` - Query string parameters
    /// * `body` - JSON request body
    pub async fn post_json<T>(
        &self,
        path: &str,
        query: &[(&str, String)],
        body: &Value,
    ) -> FetcherResult<T>
    where
        T: DeserializeOwned,
    {
        self.send_with_retry(Method::POST, path, query, body, self.max_retries)
            .await
    }

    /// POST a JSON body exactly once, without retrying
    pub async fn post_json_once<T>(
        &self,
        path: &str,
        query: &[(&str, String)],
        body: &Value,
    ) -> FetcherResult<T>
    where
        T: DeserializeOwned,
    {
        self.send_with_retry(Method::POST, path, query, body, 0).await
    }

    /// DELETE with a JSON body, ignoring the response payload
    pub async fn delete_json(&self, path: &str, body: &Value) -> FetcherResult<()> {
        let _: Value = self
            .send_with_retry(Method::DELETE, path, &[], body, self.max_retries)
            .await?;
        Ok(())
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.auth {
            IndexAuth::None => builder,
            IndexAuth::Basic { username, password } => builder.basic_auth(username, Some(password)),
            IndexAuth::Bearer(token) => builder.bearer_auth(token),
        }
    }

    /// Send a request, retrying network errors, 429 and 5xx responses
    async fn send_with_retry<T>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: &Value,
        max_retries: u32,
    ) -> FetcherResult<T>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let mut last_error = None;

        for attempt in 0..=max_retries {
            if attempt > 0 {
                let backoff = calculate_backoff(attempt - 1);
                metrics::record_http_retry(path);
                debug!(attempt, backoff_ms = backoff.as_millis() as u64, "Retrying after backoff");
                tokio::time::sleep(backoff).await;
            }

            debug!(%method, url = %url, attempt = attempt + 1, "Sending index request");

            let response = match self
                .request(method.clone(), &url)
                .query(query)
                .json(body)
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(e) => {
                    warn!(
                        "Network error on attempt {}/{}: {}",
                        attempt + 1,
                        max_retries + 1,
                        e
                    );
                    last_error = Some(FetcherError::NetworkError(e.to_string()));
                    continue;
                }
            };

            let status = response.status();
            metrics::record_http_request(path, status.as_u16());

            if status == StatusCode::TOO_MANY_REQUESTS {
                warn!(
                    "Rate limit error (429) on attempt {}/{}",
                    attempt + 1,
                    max_retries + 1
                );
                last_error = Some(FetcherError::RateLimitExceeded);
                continue;
            }

            if status.is_server_error() {
                warn!(
                    "Server error {} on attempt {}/{}",
                    status,
                    attempt + 1,
                    max_retries + 1
                );
                last_error = Some(FetcherError::HttpError(format!("Server error: {status}")));
                continue;
            }

            if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                return Err(FetcherError::AuthError(format!("{status}: {error_text}")));
            }

            if status.is_client_error() {
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                return Err(FetcherError::IndexError(format!(
                    "Client error {status}: {error_text}"
                )));
            }

            return response.json::<T>().await.map_err(|e| {
                FetcherError::ParseError(format!("Failed to deserialize response: {e}"))
            });
        }

        Err(last_error
            .unwrap_or_else(|| FetcherError::NetworkError("All retries exhausted".to_string())))
    }
}
