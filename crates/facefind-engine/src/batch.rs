//! Batch indexer: windowed concurrency with retry on rate limits.
//!
//! Assets are indexed in fixed-size windows with a pause between windows.
//! A rate-limited asset is retried with jittered exponential backoff; any
//! other error fails just that asset. A batch never fails as a whole:
//! every input asset lands in either `successful` or `failed`.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info, warn};

use facefind_index::FaceIndex;
use facefind_models::{frame_external_id, is_indexable, keys, sanitize_filename};
use facefind_storage::{
    list_collection_frames, list_collection_images, list_collection_videos, load_manifest,
    store_manifest, ObjectStore,
};

use crate::backoff::backoff_delay;
use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::metrics::{record_asset, record_retry};

/// One asset to index, with its precomputed external identifier.
#[derive(Debug, Clone)]
pub struct AssetJob {
    pub asset_key: String,
    pub external_id: String,
}

impl AssetJob {
    pub fn new(asset_key: impl Into<String>, external_id: impl Into<String>) -> Self {
        Self {
            asset_key: asset_key.into(),
            external_id: external_id.into(),
        }
    }
}

/// One asset that could not be indexed.
#[derive(Debug, Clone)]
pub struct FailedAsset {
    pub asset_key: String,
    pub error: String,
}

/// Outcome of a batch. Partial failure is expected, not fatal.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub successful: Vec<String>,
    pub failed: Vec<FailedAsset>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.successful.len() + self.failed.len()
    }

    pub fn merge(&mut self, other: BatchReport) {
        self.successful.extend(other.successful);
        self.failed.extend(other.failed);
    }
}

/// Windowed, retrying pipeline that feeds assets into a face collection.
pub struct BatchIndexer {
    store: Arc<dyn ObjectStore>,
    index: Arc<dyn FaceIndex>,
    config: EngineConfig,
}

impl BatchIndexer {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        index: Arc<dyn FaceIndex>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            index,
            config,
        }
    }

    /// Index a batch of assets into `collection_id`.
    ///
    /// Creates the collection when absent, then processes the jobs in
    /// windows of `window_size` with `window_pause` between windows. After
    /// the batch, successful external ids are merged into the collection's
    /// manifest so search can map hits back to original keys.
    pub async fn index_batch(
        &self,
        collection_id: &str,
        jobs: Vec<AssetJob>,
    ) -> EngineResult<BatchReport> {
        if jobs.is_empty() {
            return Ok(BatchReport::default());
        }

        self.index.ensure_collection(collection_id).await?;

        let mut report = BatchReport::default();
        for (window_no, window) in jobs.chunks(self.config.window_size).enumerate() {
            if window_no > 0 {
                tokio::time::sleep(self.config.window_pause).await;
            }

            debug!(
                "Indexing window {} ({} asset(s)) into {}",
                window_no + 1,
                window.len(),
                collection_id
            );

            let results = join_all(
                window
                    .iter()
                    .map(|job| self.index_one(collection_id, job)),
            )
            .await;

            for (asset_key, outcome) in results {
                match outcome {
                    Ok(()) => report.successful.push(asset_key),
                    Err(error) => report.failed.push(FailedAsset { asset_key, error }),
                }
            }
        }

        self.record_manifest(collection_id, &jobs, &report).await;

        info!(
            collection_id = %collection_id,
            successful = report.successful.len(),
            failed = report.failed.len(),
            "Batch indexing complete"
        );
        Ok(report)
    }

    /// Index every image and already-extracted video frame stored under a
    /// collection. Used as the lazy-rebuild path when a search finds the
    /// collection missing.
    pub async fn index_all_outstanding(&self, collection_id: &str) -> EngineResult<BatchReport> {
        let mut jobs = Vec::new();

        for obj in list_collection_images(self.store.as_ref(), collection_id).await? {
            if !is_indexable(&obj.key) {
                continue;
            }
            let external_id = sanitize_filename(keys::filename_of(&obj.key));
            jobs.push(AssetJob::new(obj.key, external_id));
        }

        let videos = list_collection_videos(self.store.as_ref(), collection_id).await?;
        let videos_prefix = keys::videos_prefix(collection_id);
        for frame in list_collection_frames(self.store.as_ref(), collection_id).await? {
            let video_id = frame
                .key
                .strip_prefix(&videos_prefix)
                .and_then(|rest| rest.split_once('/'))
                .map(|(video_id, _)| video_id);
            let filename = video_id
                .and_then(|id| videos.iter().find(|v| v.video_id == id))
                .map(|v| v.filename.as_str());
            let number = keys::frame_number_of(&frame.key);

            match (filename, number) {
                (Some(filename), Some(n)) => {
                    jobs.push(AssetJob::new(frame.key, frame_external_id(filename, n)));
                }
                _ => warn!("Skipping unmappable frame {}", frame.key),
            }
        }

        info!(
            "Rebuilding collection {} from {} stored asset(s)",
            collection_id,
            jobs.len()
        );
        self.index_batch(collection_id, jobs).await
    }

    /// Index one asset, retrying rate limits up to the configured budget.
    /// Returns the asset key with the outcome so completion order does not
    /// matter to the caller.
    async fn index_one(&self, collection_id: &str, job: &AssetJob) -> (String, Result<(), String>) {
        let key = job.asset_key.clone();

        match self.store.exists(&job.asset_key).await {
            Ok(true) => {}
            Ok(false) => {
                record_asset("missing");
                return (key, Err("Asset not found in storage".to_string()));
            }
            Err(e) => return (key, Err(e.to_string())),
        }

        let retry = &self.config.retry;
        for attempt in 0..=retry.max_retries {
            let call = self
                .index
                .index_asset(collection_id, &job.asset_key, &job.external_id);

            match tokio::time::timeout(self.config.asset_timeout, call).await {
                Ok(Ok(face_ids)) => {
                    debug!(
                        "Indexed {} as {} ({} face(s))",
                        job.asset_key,
                        job.external_id,
                        face_ids.len()
                    );
                    record_asset("success");
                    return (key, Ok(()));
                }
                Ok(Err(e)) if e.is_retryable() && attempt < retry.max_retries => {
                    let delay = backoff_delay(retry, attempt);
                    warn!(
                        asset_key = %job.asset_key,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        "Index call rate limited, retrying"
                    );
                    record_retry("index_asset");
                    tokio::time::sleep(delay).await;
                }
                Ok(Err(e)) => {
                    record_asset("failed");
                    return (key, Err(e.to_string()));
                }
                Err(_) => {
                    record_asset("timeout");
                    return (
                        key,
                        Err(format!(
                            "Indexing timed out after {}s",
                            self.config.asset_timeout.as_secs()
                        )),
                    );
                }
            }
        }

        record_asset("failed");
        (key, Err("Rate limit retries exhausted".to_string()))
    }

    /// Merge this batch's successful mappings into the stored manifest.
    /// Best-effort: a manifest write failure degrades image-hit resolution
    /// to the heuristic fallback, it does not fail the batch.
    async fn record_manifest(&self, collection_id: &str, jobs: &[AssetJob], report: &BatchReport) {
        if report.successful.is_empty() {
            return;
        }
        let succeeded: HashSet<&str> = report.successful.iter().map(String::as_str).collect();

        let mut manifest = match load_manifest(self.store.as_ref(), collection_id).await {
            Ok(m) => m,
            Err(e) => {
                warn!("Could not load manifest for {}: {}", collection_id, e);
                return;
            }
        };
        for job in jobs {
            if succeeded.contains(job.asset_key.as_str()) {
                manifest.insert(job.external_id.clone(), job.asset_key.clone());
            }
        }
        if let Err(e) = store_manifest(self.store.as_ref(), collection_id, &manifest).await {
            warn!("Could not store manifest for {}: {}", collection_id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeIndex;
    use facefind_storage::MemoryStore;
    use std::time::Duration;

    fn test_config() -> EngineConfig {
        EngineConfig {
            window_size: 10,
            window_pause: Duration::from_millis(500),
            asset_timeout: Duration::from_secs(5),
            ..EngineConfig::default()
        }
    }

    async fn seed_images(store: &MemoryStore, collection: &str, count: u32) -> Vec<AssetJob> {
        let mut jobs = Vec::new();
        for i in 1..=count {
            let filename = format!("photo_{}.jpg", i);
            let key = keys::image_key(collection, &filename);
            store
                .put_bytes(&key, vec![0], "image/jpeg")
                .await
                .unwrap();
            jobs.push(AssetJob::new(key, sanitize_filename(&filename)));
        }
        jobs
    }

    #[tokio::test(start_paused = true)]
    async fn test_partial_failure_with_retry_budget() {
        let store = Arc::new(MemoryStore::new());
        let jobs = seed_images(&store, "ev1", 12).await;
        let limited_key = jobs[11].asset_key.clone();

        let index = Arc::new(FakeIndex::new().with_rate_limited(&limited_key));
        let indexer = BatchIndexer::new(store, index.clone(), test_config());

        let report = indexer.index_batch("ev1", jobs).await.unwrap();

        assert_eq!(report.successful.len(), 11);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.total(), 12);
        assert_eq!(report.failed[0].asset_key, limited_key);
        // One initial attempt plus max_retries retries
        assert_eq!(
            index.attempts_for(&limited_key),
            test_config().retry.max_retries + 1
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_asset_fails_without_index_call() {
        let store = Arc::new(MemoryStore::new());
        let index = Arc::new(FakeIndex::new());
        let indexer = BatchIndexer::new(store, index.clone(), test_config());

        let jobs = vec![AssetJob::new("events/ev1/images/ghost.jpg", "ghost.jpg")];
        let report = indexer.index_batch("ev1", jobs).await.unwrap();

        assert_eq!(report.failed.len(), 1);
        assert_eq!(index.attempts_for("events/ev1/images/ghost.jpg"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_call_becomes_failed_entry() {
        let store = Arc::new(MemoryStore::new());
        let jobs = seed_images(&store, "ev1", 2).await;
        let stalled_key = jobs[0].asset_key.clone();

        let index = Arc::new(FakeIndex::new().with_stalled(&stalled_key));
        let indexer = BatchIndexer::new(store, index.clone(), test_config());

        let report = indexer.index_batch("ev1", jobs).await.unwrap();

        assert_eq!(report.successful.len(), 1);
        assert_eq!(report.failed.len(), 1);
        assert!(report.failed[0].error.contains("timed out"));
        assert_eq!(index.attempts_for(&stalled_key), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_manifest_records_successful_mappings() {
        let store = Arc::new(MemoryStore::new());
        store
            .put_bytes(
                &keys::image_key("ev1", "birthday party.jpg"),
                vec![0],
                "image/jpeg",
            )
            .await
            .unwrap();
        let jobs = vec![AssetJob::new(
            keys::image_key("ev1", "birthday party.jpg"),
            sanitize_filename("birthday party.jpg"),
        )];

        let index = Arc::new(FakeIndex::new());
        let indexer = BatchIndexer::new(store.clone(), index, test_config());
        indexer.index_batch("ev1", jobs).await.unwrap();

        let manifest = load_manifest(store.as_ref(), "ev1").await.unwrap();
        assert_eq!(
            manifest.resolve("birthday_party.jpg"),
            Some("events/ev1/images/birthday party.jpg")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_index_all_outstanding_covers_images_and_frames() {
        let store = Arc::new(MemoryStore::new());
        store
            .put_bytes(&keys::image_key("ev1", "a.jpg"), vec![0], "image/jpeg")
            .await
            .unwrap();
        store
            .put_bytes(&keys::image_key("ev1", "skip.webp"), vec![0], "image/webp")
            .await
            .unwrap();
        store
            .put_bytes(
                &keys::video_key("ev1", "v1", "party video.mp4"),
                vec![0],
                "video/mp4",
            )
            .await
            .unwrap();
        for n in 1..=3 {
            store
                .put_bytes(&keys::frame_key("ev1", "v1", n), vec![0], "image/jpeg")
                .await
                .unwrap();
        }

        let index = Arc::new(FakeIndex::new());
        let indexer = BatchIndexer::new(store, index.clone(), test_config());
        let report = indexer.index_all_outstanding("ev1").await.unwrap();

        // One image plus three frames; the webp is not indexable
        assert_eq!(report.successful.len(), 4);
        let external_ids = index.indexed_external_ids("ev1");
        assert!(external_ids.contains(&"a.jpg".to_string()));
        assert!(external_ids.contains(&frame_external_id("party video.mp4", 3)));
    }
}
