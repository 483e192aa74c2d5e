//! Engine configuration.

use std::time::Duration;

use crate::backoff::RetryConfig;

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Assets indexed concurrently per window
    pub window_size: usize,
    /// Pause between windows, to stay under the index service's rate limit
    pub window_pause: Duration,
    /// Retry policy for rate-limited index calls
    pub retry: RetryConfig,
    /// Timeout for a single asset's indexing call
    pub asset_timeout: Duration,
    /// Frames extracted per video
    pub frame_count: u32,
    /// Minimum similarity for a match, in percent
    pub similarity_threshold: f32,
    /// Maximum raw hits requested per search
    pub max_results: u32,
    /// Work directory for temporary files
    pub work_dir: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window_size: 10,
            window_pause: Duration::from_millis(1000),
            retry: RetryConfig::default(),
            asset_timeout: Duration::from_secs(30),
            frame_count: 10,
            similarity_threshold: 70.0,
            max_results: 50,
            work_dir: "/tmp/facefind".to_string(),
        }
    }
}

impl EngineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            window_size: std::env::var("FACEFIND_WINDOW_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            window_pause: Duration::from_millis(
                std::env::var("FACEFIND_WINDOW_PAUSE_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(1000),
            ),
            retry: RetryConfig::from_env(),
            asset_timeout: Duration::from_secs(
                std::env::var("FACEFIND_ASSET_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            frame_count: std::env::var("FACEFIND_FRAME_COUNT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            similarity_threshold: std::env::var("FACEFIND_SIMILARITY_THRESHOLD")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(70.0),
            max_results: std::env::var("FACEFIND_MAX_RESULTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(50),
            work_dir: std::env::var("FACEFIND_WORK_DIR")
                .unwrap_or_else(|_| "/tmp/facefind".to_string()),
        }
    }
}
