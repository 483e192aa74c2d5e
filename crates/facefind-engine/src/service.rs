//! Service facade over the pipeline.
//!
//! The transport layer hands in already-received local files and user
//! context; everything below the facade works in terms of collection ids
//! and storage keys.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use facefind_index::FaceIndex;
use facefind_models::{
    content_type_for, dedupe_matches, is_indexable, keys, sanitize_filename, validate_upload,
    AssetKind, AttendeeRecord, CollectionMatch, Match, UserStatistics,
};
use facefind_records::{AttendeeStore, MatchUpdate};
use facefind_storage::{delete_collection_assets, ObjectStore};

use crate::aggregate::MatchAggregator;
use crate::batch::{AssetJob, BatchIndexer, BatchReport, FailedAsset};
use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::video::VideoFramePreparer;

/// One file received from the transport layer.
#[derive(Debug, Clone)]
pub struct Upload {
    /// Display filename the user uploaded under.
    pub filename: String,
    /// Local path the transport spooled the file to.
    pub path: PathBuf,
}

/// Entry point tying the pipeline together.
pub struct FaceFindService {
    store: Arc<dyn ObjectStore>,
    index: Arc<dyn FaceIndex>,
    records: Arc<dyn AttendeeStore>,
    indexer: BatchIndexer,
    preparer: VideoFramePreparer,
    aggregator: MatchAggregator,
}

impl FaceFindService {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        index: Arc<dyn FaceIndex>,
        records: Arc<dyn AttendeeStore>,
        config: EngineConfig,
    ) -> Self {
        let indexer = BatchIndexer::new(store.clone(), index.clone(), config.clone());
        let preparer = VideoFramePreparer::new(store.clone(), index.clone(), config.clone());
        let aggregator = MatchAggregator::new(store.clone(), index.clone(), config);
        Self {
            store,
            index,
            records,
            indexer,
            preparer,
            aggregator,
        }
    }

    /// Validate, store and index a set of uploaded files.
    ///
    /// Photos are uploaded and batch-indexed; videos go through the frame
    /// preparer. Per-file failures land in the report, they never abort the
    /// rest of the upload.
    pub async fn upload_and_index(
        &self,
        user_id: &str,
        collection_id: &str,
        uploads: Vec<Upload>,
    ) -> EngineResult<BatchReport> {
        let mut report = BatchReport::default();
        let mut image_jobs = Vec::new();

        for upload in uploads {
            let size = match tokio::fs::metadata(&upload.path).await {
                Ok(meta) => meta.len(),
                Err(e) => {
                    report.failed.push(FailedAsset {
                        asset_key: upload.filename,
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            let kind = match validate_upload(&upload.filename, size) {
                Ok(kind) => kind,
                Err(e) => {
                    report.failed.push(FailedAsset {
                        asset_key: upload.filename,
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            match kind {
                AssetKind::Image => {
                    let key = keys::image_key(collection_id, &upload.filename);
                    if let Err(e) = self
                        .store
                        .upload_file(&upload.path, &key, content_type_for(&upload.filename))
                        .await
                    {
                        report.failed.push(FailedAsset {
                            asset_key: key,
                            error: e.to_string(),
                        });
                        continue;
                    }
                    if is_indexable(&key) {
                        image_jobs.push(AssetJob::new(key, sanitize_filename(&upload.filename)));
                    } else {
                        // Stored and listable, just not searchable
                        report.successful.push(key);
                    }
                }
                AssetKind::Video => {
                    let video_id = Uuid::new_v4().to_string();
                    match self
                        .preparer
                        .process_video(collection_id, &video_id, &upload.filename, &upload.path)
                        .await
                    {
                        Ok(ingest) => report.successful.push(ingest.video_key),
                        Err(e) => report.failed.push(FailedAsset {
                            asset_key: upload.filename,
                            error: e.to_string(),
                        }),
                    }
                }
            }
        }

        if !image_jobs.is_empty() {
            report.merge(self.indexer.index_batch(collection_id, image_jobs).await?);
        }

        if !report.successful.is_empty() {
            if let Err(e) = self.records.mark_uploaded(user_id, collection_id).await {
                warn!(
                    "Could not record contribution for {} in {}: {}",
                    user_id, collection_id, e
                );
            }
        }

        info!(
            user_id = %user_id,
            collection_id = %collection_id,
            successful = report.successful.len(),
            failed = report.failed.len(),
            "Upload processed"
        );
        Ok(report)
    }

    /// Search a collection with a query selfie and persist the result.
    ///
    /// Persistence is full-replace per (user, collection). A store failure
    /// is logged and the matches are still returned: showing results is
    /// worth more than recording them.
    pub async fn find_matches(
        &self,
        user_id: &str,
        collection_id: &str,
        selfie_key: &str,
        display_name: &str,
        cover_key: Option<String>,
    ) -> EngineResult<Vec<Match>> {
        let found = self
            .aggregator
            .find_matches(collection_id, selfie_key)
            .await?;

        let matches: Vec<Match> = dedupe_matches(
            found
                .into_iter()
                .map(|matched| CollectionMatch {
                    collection_id: collection_id.to_string(),
                    matched,
                })
                .collect(),
        )
        .into_iter()
        .map(|c| c.matched)
        .collect();

        let mut matched_images = Vec::new();
        let mut matched_videos = Vec::new();
        for m in &matches {
            if m.is_video() {
                matched_videos.push(m.asset_key().to_string());
            } else {
                matched_images.push(m.asset_key().to_string());
            }
        }

        let update = MatchUpdate {
            user_id: user_id.to_string(),
            collection_id: collection_id.to_string(),
            selfie_key: selfie_key.to_string(),
            display_name: display_name.to_string(),
            cover_key,
            matched_images,
            matched_videos,
        };
        if let Err(e) = self.records.replace_matches(update).await {
            warn!(
                "Match persistence failed for {} in {}, returning results anyway: {}",
                user_id, collection_id, e
            );
        }

        Ok(matches)
    }

    /// Current persisted match state for one (user, collection) pair.
    pub async fn get_matches(
        &self,
        user_id: &str,
        collection_id: &str,
    ) -> EngineResult<Option<AttendeeRecord>> {
        Ok(self.records.get(user_id, collection_id).await?)
    }

    /// Statistics across all of a user's collections.
    pub async fn get_statistics(&self, user_id: &str) -> EngineResult<UserStatistics> {
        Ok(self.records.statistics(user_id).await?)
    }

    /// Delete every stored asset of a collection. Returns the number of
    /// objects deleted.
    pub async fn clear_collection(&self, collection_id: &str) -> EngineResult<u32> {
        Ok(delete_collection_assets(self.store.as_ref(), collection_id).await?)
    }

    /// Remove face entries from a collection's index.
    pub async fn remove_faces(
        &self,
        collection_id: &str,
        face_ids: &[String],
    ) -> EngineResult<()> {
        Ok(self.index.delete_faces(collection_id, face_ids).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeIndex;
    use async_trait::async_trait;
    use facefind_models::{frame_external_id, RawHit};
    use facefind_records::{MemoryAttendeeStore, StoreError, StoreResult};
    use facefind_storage::MemoryStore;
    use std::io::Write;

    fn service(
        store: Arc<MemoryStore>,
        index: Arc<FakeIndex>,
        records: Arc<dyn AttendeeStore>,
    ) -> FaceFindService {
        FaceFindService::new(store, index, records, EngineConfig::default())
    }

    async fn seed_video(store: &MemoryStore, collection: &str, video_id: &str, filename: &str, frames: u32) {
        store
            .put_bytes(
                &keys::video_key(collection, video_id, filename),
                vec![0],
                "video/mp4",
            )
            .await
            .unwrap();
        for n in 1..=frames {
            store
                .put_bytes(
                    &keys::frame_key(collection, video_id, n),
                    vec![0],
                    "image/jpeg",
                )
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_find_matches_partitions_and_persists() {
        let store = Arc::new(MemoryStore::new());
        store
            .put_bytes(&keys::image_key("ev1", "a.jpg"), vec![0], "image/jpeg")
            .await
            .unwrap();
        seed_video(&store, "ev1", "v1", "party.mp4", 5).await;

        let index = Arc::new(FakeIndex::new().with_collection("ev1").with_hits(
            "ev1",
            vec![
                RawHit {
                    external_id: "a.jpg".to_string(),
                    similarity: 90.0,
                },
                RawHit {
                    external_id: frame_external_id("party.mp4", 2),
                    similarity: 85.0,
                },
            ],
        ));
        let records = Arc::new(MemoryAttendeeStore::new());

        let svc = service(store, index, records.clone());
        let matches = svc
            .find_matches("user-1", "ev1", "selfies/u1.jpg", "Party", None)
            .await
            .unwrap();

        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].similarity(), 90.0);

        let record = records.get("user-1", "ev1").await.unwrap().unwrap();
        assert_eq!(record.matched_images, vec!["events/ev1/images/a.jpg"]);
        assert_eq!(record.matched_videos, vec!["events/ev1/videos/v1/party.mp4"]);
        assert_eq!(record.selfie_key, "selfies/u1.jpg");
    }

    struct FailingStore;

    #[async_trait]
    impl AttendeeStore for FailingStore {
        async fn replace_matches(&self, _update: MatchUpdate) -> StoreResult<AttendeeRecord> {
            Err(StoreError::request_failed("write refused"))
        }
        async fn get(&self, _u: &str, _c: &str) -> StoreResult<Option<AttendeeRecord>> {
            Ok(None)
        }
        async fn list_for_user(&self, _u: &str) -> StoreResult<Vec<AttendeeRecord>> {
            Ok(Vec::new())
        }
        async fn mark_uploaded(&self, _u: &str, _c: &str) -> StoreResult<()> {
            Err(StoreError::request_failed("write refused"))
        }
    }

    #[tokio::test]
    async fn test_store_failure_still_returns_matches() {
        let store = Arc::new(MemoryStore::new());
        store
            .put_bytes(&keys::image_key("ev1", "a.jpg"), vec![0], "image/jpeg")
            .await
            .unwrap();

        let index = Arc::new(FakeIndex::new().with_collection("ev1").with_hits(
            "ev1",
            vec![RawHit {
                external_id: "a.jpg".to_string(),
                similarity: 95.0,
            }],
        ));

        let svc = service(store, index, Arc::new(FailingStore));
        let matches = svc
            .find_matches("user-1", "ev1", "selfies/u1.jpg", "Party", None)
            .await
            .unwrap();

        assert_eq!(matches.len(), 1);
    }

    #[tokio::test]
    async fn test_upload_and_index_validates_and_marks_contribution() {
        let dir = tempfile::tempdir().unwrap();
        let mut uploads = Vec::new();
        for name in ["one.jpg", "two.png", "notes.pdf"] {
            let path = dir.path().join(name);
            let mut f = std::fs::File::create(&path).unwrap();
            f.write_all(b"data").unwrap();
            uploads.push(Upload {
                filename: name.to_string(),
                path,
            });
        }

        let store = Arc::new(MemoryStore::new());
        let index = Arc::new(FakeIndex::new());
        let records = Arc::new(MemoryAttendeeStore::new());

        let svc = service(store.clone(), index, records.clone());
        let report = svc
            .upload_and_index("user-1", "ev1", uploads)
            .await
            .unwrap();

        assert_eq!(report.successful.len(), 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].asset_key, "notes.pdf");
        assert!(store
            .get_bytes("events/ev1/images/one.jpg")
            .await
            .is_ok());

        let record = records.get("user-1", "ev1").await.unwrap().unwrap();
        assert!(record.has_uploads);
    }

    #[tokio::test]
    async fn test_clear_collection_removes_all_assets() {
        let store = Arc::new(MemoryStore::new());
        store
            .put_bytes(&keys::image_key("ev1", "a.jpg"), vec![0], "image/jpeg")
            .await
            .unwrap();
        seed_video(&store, "ev1", "v1", "party.mp4", 2).await;

        let svc = service(
            store.clone(),
            Arc::new(FakeIndex::new()),
            Arc::new(MemoryAttendeeStore::new()),
        );
        let deleted = svc.clear_collection("ev1").await.unwrap();

        assert_eq!(deleted, 4);
        assert!(store.is_empty());
    }
}
