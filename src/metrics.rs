//! Extraction metrics
//!
//! Counters are recorded through the `metrics` facade and cost nothing when no
//! recorder is installed. [`init_metrics`] installs a Prometheus exporter with
//! a scrape endpoint for long continuous runs.

use metrics::{counter, describe_counter, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::Lazy;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Global metrics registry initialization flag
static METRICS_INITIALIZED: Lazy<Arc<RwLock<bool>>> = Lazy::new(|| Arc::new(RwLock::new(false)));

/// Initialize metrics system with Prometheus exporter
///
/// Idempotent: later calls are no-ops.
///
/// # Arguments
/// * `addr` - Socket address to bind the scrape endpoint (e.g., "0.0.0.0:9090")
pub async fn init_metrics(addr: SocketAddr) -> Result<(), Box<dyn std::error::Error>> {
    let mut initialized = METRICS_INITIALIZED.write().await;
    if *initialized {
        debug!("Metrics already initialized, skipping");
        return Ok(());
    }

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    describe_counter!(
        "http_requests_total",
        Unit::Count,
        "Total number of HTTP requests made to the search index"
    );
    describe_counter!(
        "http_retries_total",
        Unit::Count,
        "Total number of index request retries"
    );
    describe_counter!(
        "scan_pages_total",
        Unit::Count,
        "Total number of scroll pages read"
    );
    describe_counter!(
        "windows_scanned_total",
        Unit::Count,
        "Total number of day windows fully scanned"
    );
    describe_counter!(
        "records_emitted_total",
        Unit::Count,
        "Total number of records written to the output channel"
    );
    describe_counter!(
        "extraction_failures_total",
        Unit::Count,
        "Total number of windows that ended the run with an error"
    );

    *initialized = true;
    info!("Metrics system initialized on {}", addr);
    Ok(())
}

/// Check if metrics system is initialized
pub async fn is_initialized() -> bool {
    *METRICS_INITIALIZED.read().await
}

/// Record a completed HTTP request
pub fn record_http_request(endpoint: &str, status_code: u16) {
    counter!(
        "http_requests_total",
        "endpoint" => endpoint.to_string(),
        "status" => status_code.to_string(),
    )
    .increment(1);
}

/// Record a retry of an index request
pub fn record_http_retry(endpoint: &str) {
    counter!("http_retries_total", "endpoint" => endpoint.to_string()).increment(1);
}

/// Record one scroll page read
pub fn record_scan_page() {
    counter!("scan_pages_total").increment(1);
}

/// Record a fully scanned window and the records it produced
pub fn record_window(stream: &str, records: u64) {
    counter!("windows_scanned_total", "stream" => stream.to_string()).increment(1);
    debug!(stream, records, "Window recorded");
}

/// Record records written to the output channel
pub fn record_records_emitted(stream: &str, count: u64) {
    counter!("records_emitted_total", "stream" => stream.to_string()).increment(count);
}

/// Record a window failure that ended the run
pub fn record_extraction_failure(stream: &str) {
    counter!("extraction_failures_total", "stream" => stream.to_string()).increment(1);
}
