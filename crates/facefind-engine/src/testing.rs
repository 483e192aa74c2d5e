//! In-memory face index fake for engine tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use facefind_index::{FaceIndex, IndexError, IndexResult};
use facefind_models::RawHit;

/// Scriptable [`FaceIndex`] that records every call.
#[derive(Default)]
pub struct FakeIndex {
    collections: Mutex<HashSet<String>>,
    indexed: Mutex<Vec<(String, String, String)>>,
    hits: Mutex<HashMap<String, Vec<RawHit>>>,
    rate_limited: Mutex<HashSet<String>>,
    stalled: Mutex<HashSet<String>>,
    attempts: Mutex<HashMap<String, u32>>,
}

impl FakeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-create a collection.
    pub fn with_collection(self, collection_id: &str) -> Self {
        self.collections
            .lock()
            .unwrap()
            .insert(collection_id.to_string());
        self
    }

    /// Script the raw hits a search of `collection_id` returns.
    pub fn with_hits(self, collection_id: &str, hits: Vec<RawHit>) -> Self {
        self.hits
            .lock()
            .unwrap()
            .insert(collection_id.to_string(), hits);
        self
    }

    /// Make every indexing call for `asset_key` fail with a rate limit.
    pub fn with_rate_limited(self, asset_key: &str) -> Self {
        self.rate_limited
            .lock()
            .unwrap()
            .insert(asset_key.to_string());
        self
    }

    /// Make every indexing call for `asset_key` hang forever.
    pub fn with_stalled(self, asset_key: &str) -> Self {
        self.stalled.lock().unwrap().insert(asset_key.to_string());
        self
    }

    /// Indexing attempts observed for one asset.
    pub fn attempts_for(&self, asset_key: &str) -> u32 {
        self.attempts
            .lock()
            .unwrap()
            .get(asset_key)
            .copied()
            .unwrap_or(0)
    }

    /// External ids successfully indexed into a collection.
    pub fn indexed_external_ids(&self, collection_id: &str) -> Vec<String> {
        self.indexed
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _, _)| c == collection_id)
            .map(|(_, _, ext)| ext.clone())
            .collect()
    }

    pub fn has_collection(&self, collection_id: &str) -> bool {
        self.collections.lock().unwrap().contains(collection_id)
    }
}

#[async_trait]
impl FaceIndex for FakeIndex {
    async fn ensure_collection(&self, collection_id: &str) -> IndexResult<()> {
        self.collections
            .lock()
            .unwrap()
            .insert(collection_id.to_string());
        Ok(())
    }

    async fn index_asset(
        &self,
        collection_id: &str,
        asset_key: &str,
        external_id: &str,
    ) -> IndexResult<Vec<String>> {
        let stalled = {
            *self
                .attempts
                .lock()
                .unwrap()
                .entry(asset_key.to_string())
                .or_insert(0) += 1;
            self.stalled.lock().unwrap().contains(asset_key)
        };
        if stalled {
            std::future::pending::<()>().await;
        }

        if self.rate_limited.lock().unwrap().contains(asset_key) {
            return Err(IndexError::RateLimited);
        }
        if !self.collections.lock().unwrap().contains(collection_id) {
            return Err(IndexError::CollectionNotFound(collection_id.to_string()));
        }

        self.indexed.lock().unwrap().push((
            collection_id.to_string(),
            asset_key.to_string(),
            external_id.to_string(),
        ));
        Ok(vec![format!("face-{}", external_id)])
    }

    async fn search_similar(
        &self,
        collection_id: &str,
        _query_asset_key: &str,
        max_results: u32,
        _threshold: f32,
    ) -> IndexResult<Vec<RawHit>> {
        if !self.collections.lock().unwrap().contains(collection_id) {
            return Err(IndexError::CollectionNotFound(collection_id.to_string()));
        }
        let mut hits = self
            .hits
            .lock()
            .unwrap()
            .get(collection_id)
            .cloned()
            .unwrap_or_default();
        hits.truncate(max_results as usize);
        Ok(hits)
    }

    async fn delete_faces(&self, _collection_id: &str, _face_ids: &[String]) -> IndexResult<()> {
        Ok(())
    }
}
