//! Match aggregation: raw hits in, deduplicated per-asset matches out.
//!
//! A search returns one raw hit per matching face entry, so a single video
//! can contribute dozens of frame hits. The aggregator collapses hits to
//! one match per asset (best similarity wins), reconstructs video metadata
//! from the collection's storage layout, applies the confidence threshold,
//! and sorts the result.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use facefind_index::{FaceIndex, IndexError};
use facefind_models::{keys, parse_frame_external_id, sanitize_filename, Match, RawHit};
use facefind_storage::{count_frames, list_collection_videos, load_manifest, ObjectStore, VideoAssets};

use crate::batch::BatchIndexer;
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::metrics::record_search;

/// Turns a query face into a deduplicated, sorted match list.
pub struct MatchAggregator {
    store: Arc<dyn ObjectStore>,
    index: Arc<dyn FaceIndex>,
    indexer: BatchIndexer,
    config: EngineConfig,
}

impl MatchAggregator {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        index: Arc<dyn FaceIndex>,
        config: EngineConfig,
    ) -> Self {
        let indexer = BatchIndexer::new(store.clone(), index.clone(), config.clone());
        Self {
            store,
            index,
            indexer,
            config,
        }
    }

    /// Search `collection_id` for faces similar to the query asset and
    /// aggregate the hits into per-asset matches.
    pub async fn find_matches(
        &self,
        collection_id: &str,
        query_asset_key: &str,
    ) -> EngineResult<Vec<Match>> {
        let hits = self.search_with_rebuild(collection_id, query_asset_key).await?;
        debug!(
            "Aggregating {} raw hit(s) for collection {}",
            hits.len(),
            collection_id
        );

        let matches = self.aggregate(collection_id, hits).await?;
        record_search(if matches.is_empty() { "no_matches" } else { "matched" });
        info!(
            collection_id = %collection_id,
            matches = matches.len(),
            "Search complete"
        );
        Ok(matches)
    }

    /// Run the search, lazily rebuilding the collection from stored assets
    /// when it does not exist yet.
    async fn search_with_rebuild(
        &self,
        collection_id: &str,
        query_asset_key: &str,
    ) -> EngineResult<Vec<RawHit>> {
        let first = self
            .index
            .search_similar(
                collection_id,
                query_asset_key,
                self.config.max_results,
                self.config.similarity_threshold,
            )
            .await;

        match first {
            Ok(hits) => Ok(hits),
            Err(IndexError::CollectionNotFound(_)) => {
                info!(
                    "Collection {} not indexed yet, rebuilding from storage",
                    collection_id
                );
                let report = self.indexer.index_all_outstanding(collection_id).await?;
                if report.successful.is_empty() {
                    record_search("no_content");
                    return Err(EngineError::NoIndexableContent(collection_id.to_string()));
                }
                Ok(self
                    .index
                    .search_similar(
                        collection_id,
                        query_asset_key,
                        self.config.max_results,
                        self.config.similarity_threshold,
                    )
                    .await?)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Collapse raw hits into one best-similarity match per asset, filter
    /// by the confidence threshold, sort descending (stable on ties).
    async fn aggregate(&self, collection_id: &str, hits: Vec<RawHit>) -> EngineResult<Vec<Match>> {
        let manifest = match load_manifest(self.store.as_ref(), collection_id).await {
            Ok(m) => m,
            Err(e) => {
                warn!("Manifest unavailable for {}: {}", collection_id, e);
                Default::default()
            }
        };

        // Video listing fetched once, on the first frame hit.
        let mut videos: Option<Vec<VideoAssets>> = None;

        let mut matches: Vec<Match> = Vec::new();
        let mut position: HashMap<String, usize> = HashMap::new();

        for hit in hits {
            let candidate = match parse_frame_external_id(&hit.external_id) {
                Some((video_stem, _frame_number)) => {
                    match self
                        .resolve_video(collection_id, &video_stem, hit.similarity, &mut videos)
                        .await
                    {
                        Some(m) => m,
                        // Reconstruction failure drops this hit, not the search
                        None => continue,
                    }
                }
                None => {
                    let asset_key = manifest
                        .resolve(&hit.external_id)
                        .map(str::to_string)
                        .unwrap_or_else(|| keys::image_key(collection_id, &hit.external_id));
                    Match::Image {
                        asset_key,
                        similarity: hit.similarity,
                    }
                }
            };

            match position.get(candidate.asset_key()) {
                Some(&i) => {
                    if candidate.similarity() > matches[i].similarity() {
                        match &mut matches[i] {
                            Match::Image { similarity, .. } | Match::Video { similarity, .. } => {
                                *similarity = candidate.similarity()
                            }
                        }
                    }
                }
                None => {
                    position.insert(candidate.asset_key().to_string(), matches.len());
                    matches.push(candidate);
                }
            }
        }

        matches.retain(|m| m.similarity() >= self.config.similarity_threshold);
        matches.sort_by(|a, b| b.similarity().total_cmp(&a.similarity()));
        Ok(matches)
    }

    /// Map a frame hit back to its parent video by comparing sanitized
    /// filenames against the collection's video listing.
    async fn resolve_video(
        &self,
        collection_id: &str,
        video_stem: &str,
        similarity: f32,
        videos: &mut Option<Vec<VideoAssets>>,
    ) -> Option<Match> {
        if videos.is_none() {
            match list_collection_videos(self.store.as_ref(), collection_id).await {
                Ok(listed) => *videos = Some(listed),
                Err(e) => {
                    warn!("Video listing failed for {}: {}", collection_id, e);
                    return None;
                }
            }
        }

        let video = videos
            .as_ref()
            .unwrap()
            .iter()
            .find(|v| sanitize_filename(&v.filename) == video_stem)?
            .clone();

        let frame_count = match count_frames(self.store.as_ref(), collection_id, &video.video_id)
            .await
        {
            Ok(n) => n,
            Err(e) => {
                warn!("Frame count failed for video {}: {}", video.video_id, e);
                return None;
            }
        };

        Some(Match::Video {
            thumbnail_key: keys::thumbnail_key_for(&video.video_key),
            video_key: video.video_key,
            display_name: video.filename,
            frame_count,
            similarity,
        })
    }
}
