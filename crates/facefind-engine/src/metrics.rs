//! Pipeline metrics.

use metrics::counter;

/// Metric name constants for consistency.
pub mod names {
    /// Assets indexed, by outcome.
    pub const ASSETS_TOTAL: &str = "facefind_assets_total";

    /// Retry attempts against the face index.
    pub const RETRIES_TOTAL: &str = "facefind_retries_total";

    /// Similarity searches, by outcome.
    pub const SEARCHES_TOTAL: &str = "facefind_searches_total";
}

/// Record one asset's indexing outcome.
pub fn record_asset(status: &'static str) {
    counter!(names::ASSETS_TOTAL, "status" => status).increment(1);
}

/// Record a retry attempt.
pub fn record_retry(operation: &'static str) {
    counter!(names::RETRIES_TOTAL, "operation" => operation).increment(1);
}

/// Record a completed search.
pub fn record_search(outcome: &'static str) {
    counter!(names::SEARCHES_TOTAL, "outcome" => outcome).increment(1);
}
