//! Extraction defaults and backoff calculation

use std::time::Duration;

/// Fixed historical start date for continuous runs and for each new region.
/// Immunization records in the index begin in January 2021.
pub const DEFAULT_HISTORICAL_START: &str = "2021-01-01";

/// Default number of retries for a failed index request.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds.
pub const INITIAL_BACKOFF_MS: u64 = 1000;

/// Maximum backoff delay in milliseconds.
pub const MAX_BACKOFF_MS: u64 = 30_000;

/// Calculate exponential backoff delay
pub fn calculate_backoff(retry_count: u32) -> Duration {
    let delay_ms = INITIAL_BACKOFF_MS.saturating_mul(2u64.saturating_pow(retry_count));
    Duration::from_millis(delay_ms.min(MAX_BACKOFF_MS))
}
