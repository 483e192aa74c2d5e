//! Collection-scoped storage operations.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use facefind_models::keys;

use crate::error::StorageResult;
use crate::store::{ObjectInfo, ObjectStore};

/// Storage-side view of one ingested video.
#[derive(Debug, Clone)]
pub struct VideoAssets {
    /// Stable video id (directory name under the videos prefix).
    pub video_id: String,
    /// Key of the original video file.
    pub video_key: String,
    /// Display filename the video was uploaded under.
    pub filename: String,
}

/// Side index mapping external identifiers back to original asset keys.
///
/// Sanitization is lossy, so the original key is recorded at index time
/// instead of being reconstructed heuristically at search time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExternalIdManifest {
    pub entries: HashMap<String, String>,
}

impl ExternalIdManifest {
    /// Record a mapping. Logs when a sanitization collision would remap an
    /// external id to a different asset; the newer mapping wins.
    pub fn insert(&mut self, external_id: impl Into<String>, asset_key: impl Into<String>) {
        let external_id = external_id.into();
        let asset_key = asset_key.into();
        if let Some(previous) = self.entries.get(&external_id) {
            if previous != &asset_key {
                warn!(
                    external_id = %external_id,
                    previous = %previous,
                    replacement = %asset_key,
                    "External id collision, newer asset wins"
                );
            }
        }
        self.entries.insert(external_id, asset_key);
    }

    /// Resolve an external id to its original asset key.
    pub fn resolve(&self, external_id: &str) -> Option<&str> {
        self.entries.get(external_id).map(String::as_str)
    }

    /// Merge another manifest's entries on top of this one.
    pub fn merge(&mut self, other: ExternalIdManifest) {
        for (external_id, asset_key) in other.entries {
            self.insert(external_id, asset_key);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// List a collection's photos.
pub async fn list_collection_images(
    store: &dyn ObjectStore,
    collection_id: &str,
) -> StorageResult<Vec<ObjectInfo>> {
    store.list(&keys::images_prefix(collection_id)).await
}

/// Enumerate a collection's videos from the storage layout.
///
/// Each video directory holds the original file under its display
/// filename, alongside `thumbnail.jpg` and `frames/`; the original file is
/// the entry that is neither.
pub async fn list_collection_videos(
    store: &dyn ObjectStore,
    collection_id: &str,
) -> StorageResult<Vec<VideoAssets>> {
    let prefix = keys::videos_prefix(collection_id);
    let objects = store.list(&prefix).await?;

    let mut videos = Vec::new();
    for obj in objects {
        let Some(rest) = obj.key.strip_prefix(&prefix) else {
            continue;
        };
        let Some((video_id, entry)) = rest.split_once('/') else {
            continue;
        };
        if entry == "thumbnail.jpg" || entry.contains('/') || entry.is_empty() {
            continue;
        }
        videos.push(VideoAssets {
            video_id: video_id.to_string(),
            video_key: obj.key.clone(),
            filename: entry.to_string(),
        });
    }

    Ok(videos)
}

/// List every extracted frame in a collection, across all videos.
pub async fn list_collection_frames(
    store: &dyn ObjectStore,
    collection_id: &str,
) -> StorageResult<Vec<ObjectInfo>> {
    let objects = store.list(&keys::videos_prefix(collection_id)).await?;
    Ok(objects
        .into_iter()
        .filter(|o| o.key.contains("/frames/"))
        .collect())
}

/// Count the indexable frames extracted from one video.
pub async fn count_frames(
    store: &dyn ObjectStore,
    collection_id: &str,
    video_id: &str,
) -> StorageResult<u32> {
    let frames = store
        .list(&keys::frames_prefix(collection_id, video_id))
        .await?;
    Ok(frames.len() as u32)
}

/// Load a collection's external-id manifest, empty when absent.
pub async fn load_manifest(
    store: &dyn ObjectStore,
    collection_id: &str,
) -> StorageResult<ExternalIdManifest> {
    match store.get_bytes(&keys::manifest_key(collection_id)).await {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.is_not_found() => Ok(ExternalIdManifest::default()),
        Err(e) => Err(e),
    }
}

/// Persist a collection's external-id manifest.
pub async fn store_manifest(
    store: &dyn ObjectStore,
    collection_id: &str,
    manifest: &ExternalIdManifest,
) -> StorageResult<()> {
    let json = serde_json::to_vec(manifest)?;
    store
        .put_bytes(&keys::manifest_key(collection_id), json, "application/json")
        .await
}

/// Delete every stored asset for a collection.
pub async fn delete_collection_assets(
    store: &dyn ObjectStore,
    collection_id: &str,
) -> StorageResult<u32> {
    let prefix = format!("events/{}/", collection_id);
    let objects = store.list(&prefix).await?;

    if objects.is_empty() {
        info!("No files found to delete for collection {}", collection_id);
        return Ok(0);
    }

    let keys: Vec<_> = objects.into_iter().map(|o| o.key).collect();
    store.delete(&keys).await
}
