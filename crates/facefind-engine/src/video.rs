//! Video ingestion: thumbnail, frame extraction, frame indexing.

use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use facefind_index::FaceIndex;
use facefind_media::{extract_frames, generate_thumbnail};
use facefind_models::{content_type_for, frame_external_id, keys};
use facefind_storage::ObjectStore;

use crate::batch::{AssetJob, BatchIndexer};
use crate::config::EngineConfig;
use crate::error::EngineResult;

/// Outcome of ingesting one video.
#[derive(Debug, Clone)]
pub struct VideoIngest {
    pub video_id: String,
    pub video_key: String,
    pub thumbnail_key: String,
    pub frames_extracted: u32,
    pub frames_indexed: u32,
    /// True when fewer frames than requested made it into the index. The
    /// video itself is still usable: it plays and appears in listings, it
    /// just matches on fewer (possibly zero) frames.
    pub degraded: bool,
}

/// Prepares a video for face search: uploads the original and a thumbnail,
/// extracts evenly spaced frames, and feeds the frames through the batch
/// indexer under video-aware external identifiers.
pub struct VideoFramePreparer {
    store: Arc<dyn ObjectStore>,
    indexer: BatchIndexer,
    config: EngineConfig,
}

impl VideoFramePreparer {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        index: Arc<dyn FaceIndex>,
        config: EngineConfig,
    ) -> Self {
        let indexer = BatchIndexer::new(store.clone(), index, config.clone());
        Self {
            store,
            indexer,
            config,
        }
    }

    /// Ingest one local video file into a collection.
    ///
    /// The video file and thumbnail must both upload for the video to count
    /// as processed; frame extraction and indexing failures degrade the
    /// result instead of failing it.
    pub async fn process_video(
        &self,
        collection_id: &str,
        video_id: &str,
        display_name: &str,
        local_path: &Path,
    ) -> EngineResult<VideoIngest> {
        let video_key = keys::video_key(collection_id, video_id, display_name);
        self.store
            .upload_file(local_path, &video_key, content_type_for(display_name))
            .await?;

        tokio::fs::create_dir_all(&self.config.work_dir).await?;
        let work_dir = tempfile::tempdir_in(&self.config.work_dir)?;

        let thumbnail_path = work_dir.path().join("thumbnail.jpg");
        generate_thumbnail(local_path, &thumbnail_path).await?;
        let thumbnail_key = keys::thumbnail_key(collection_id, video_id);
        self.store
            .upload_file(&thumbnail_path, &thumbnail_key, "image/jpeg")
            .await?;

        let frames = match extract_frames(
            local_path,
            work_dir.path().join("frames"),
            self.config.frame_count,
        )
        .await
        {
            Ok(frames) => frames,
            Err(e) => {
                warn!(
                    "Frame extraction failed for {}, video kept without frames: {}",
                    display_name, e
                );
                Vec::new()
            }
        };

        let mut jobs = Vec::new();
        for frame in &frames {
            let frame_key = keys::frame_key(collection_id, video_id, frame.number);
            match self
                .store
                .upload_file(&frame.path, &frame_key, "image/jpeg")
                .await
            {
                Ok(()) => jobs.push(AssetJob::new(
                    frame_key,
                    frame_external_id(display_name, frame.number),
                )),
                Err(e) => warn!("Skipping frame {} of {}: {}", frame.number, display_name, e),
            }
        }

        let frames_extracted = frames.len() as u32;
        let report = self.indexer.index_batch(collection_id, jobs).await?;
        let frames_indexed = report.successful.len() as u32;
        let degraded = frames_indexed < self.config.frame_count;

        info!(
            collection_id = %collection_id,
            video_id = %video_id,
            frames_extracted,
            frames_indexed,
            degraded,
            "Video ingested"
        );

        Ok(VideoIngest {
            video_id: video_id.to_string(),
            video_key,
            thumbnail_key,
            frames_extracted,
            frames_indexed,
            degraded,
        })
    }
}
