//! Rekognition face index client.

use async_trait::async_trait;
use aws_sdk_rekognition::types::{Image, S3Object};
use aws_sdk_rekognition::Client;
use tracing::{debug, info};

use facefind_models::{is_indexable, RawHit};

use crate::error::{IndexError, IndexResult};

/// Configuration for the face index client.
#[derive(Debug, Clone)]
pub struct IndexConfig {
    /// Bucket the indexed assets live in.
    pub bucket_name: String,
    /// Similarity threshold for the duplicate pre-check, in percent.
    pub dedup_threshold: f32,
    /// Whether to run the duplicate pre-check before indexing.
    pub dedup_precheck: bool,
}

impl IndexConfig {
    /// Create config from environment variables.
    pub fn from_env() -> IndexResult<Self> {
        Ok(Self {
            bucket_name: std::env::var("FACEFIND_S3_BUCKET")
                .map_err(|_| IndexError::service_error("FACEFIND_S3_BUCKET not set"))?,
            dedup_threshold: std::env::var("FACEFIND_DEDUP_THRESHOLD")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(95.0),
            dedup_precheck: std::env::var("FACEFIND_DEDUP_PRECHECK")
                .map(|v| v.to_lowercase() != "false")
                .unwrap_or(true),
        })
    }
}

/// Remote face index capability.
///
/// One implementation wraps Rekognition; tests use an in-memory fake.
#[async_trait]
pub trait FaceIndex: Send + Sync {
    /// Create the collection if it does not exist. Racing with another
    /// first-time creator is not an error.
    async fn ensure_collection(&self, collection_id: &str) -> IndexResult<()>;

    /// Index every detectable face in one stored asset, tagging the face
    /// entries with `external_id`. Returns the created face entry ids
    /// (empty when the asset was already indexed or carries no face).
    async fn index_asset(
        &self,
        collection_id: &str,
        asset_key: &str,
        external_id: &str,
    ) -> IndexResult<Vec<String>>;

    /// Search the collection for faces similar to the query asset.
    async fn search_similar(
        &self,
        collection_id: &str,
        query_asset_key: &str,
        max_results: u32,
        threshold: f32,
    ) -> IndexResult<Vec<RawHit>>;

    /// Delete face entries from a collection.
    async fn delete_faces(&self, collection_id: &str, face_ids: &[String]) -> IndexResult<()>;
}

/// Rekognition-backed [`FaceIndex`].
#[derive(Clone)]
pub struct RekognitionIndex {
    client: Client,
    config: IndexConfig,
}

impl RekognitionIndex {
    /// Create a new index client over an already-loaded AWS config.
    pub fn new(sdk_config: &aws_config::SdkConfig, config: IndexConfig) -> Self {
        Self {
            client: Client::new(sdk_config),
            config,
        }
    }

    /// Create from environment variables.
    pub async fn from_env() -> IndexResult<Self> {
        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .load()
            .await;
        Ok(Self::new(&sdk_config, IndexConfig::from_env()?))
    }

    fn s3_image(&self, key: &str) -> Image {
        Image::builder()
            .s3_object(
                S3Object::builder()
                    .bucket(&self.config.bucket_name)
                    .name(key)
                    .build(),
            )
            .build()
    }

    /// High-threshold self-search to detect an already-indexed asset, so
    /// idempotent batch re-runs do not duplicate face entries.
    async fn already_indexed(
        &self,
        collection_id: &str,
        asset_key: &str,
        external_id: &str,
    ) -> bool {
        let result = self
            .search_similar(collection_id, asset_key, 5, self.config.dedup_threshold)
            .await;

        match result {
            Ok(hits) => hits.iter().any(|h| h.external_id == external_id),
            Err(IndexError::CollectionNotFound(_)) => false,
            Err(e) => {
                // Pre-check is best-effort; fall through to indexing.
                debug!("Duplicate pre-check failed for {}: {}", asset_key, e);
                false
            }
        }
    }
}

#[async_trait]
impl FaceIndex for RekognitionIndex {
    async fn ensure_collection(&self, collection_id: &str) -> IndexResult<()> {
        match self
            .client
            .create_collection()
            .collection_id(collection_id)
            .send()
            .await
        {
            Ok(_) => {
                info!("Created face collection {}", collection_id);
                Ok(())
            }
            Err(e) => {
                let service_err = e.into_service_error();
                if service_err.is_resource_already_exists_exception() {
                    debug!("Face collection {} already exists", collection_id);
                    Ok(())
                } else if service_err.is_provisioned_throughput_exceeded_exception()
                    || service_err.is_throttling_exception()
                {
                    Err(IndexError::RateLimited)
                } else {
                    Err(IndexError::service_error(service_err.to_string()))
                }
            }
        }
    }

    async fn index_asset(
        &self,
        collection_id: &str,
        asset_key: &str,
        external_id: &str,
    ) -> IndexResult<Vec<String>> {
        if !is_indexable(asset_key) {
            return Err(IndexError::UnsupportedFormat(asset_key.to_string()));
        }

        if self.config.dedup_precheck
            && self
                .already_indexed(collection_id, asset_key, external_id)
                .await
        {
            debug!("Asset {} already indexed in {}", asset_key, collection_id);
            return Ok(Vec::new());
        }

        let response = self
            .client
            .index_faces()
            .collection_id(collection_id)
            .image(self.s3_image(asset_key))
            .external_image_id(external_id)
            .send()
            .await
            .map_err(|e| {
                let service_err = e.into_service_error();
                if service_err.is_resource_not_found_exception() {
                    IndexError::CollectionNotFound(collection_id.to_string())
                } else if service_err.is_invalid_s3_object_exception() {
                    IndexError::AssetNotFound(asset_key.to_string())
                } else if service_err.is_invalid_image_format_exception() {
                    IndexError::UnsupportedFormat(asset_key.to_string())
                } else if service_err.is_provisioned_throughput_exceeded_exception()
                    || service_err.is_throttling_exception()
                {
                    IndexError::RateLimited
                } else {
                    IndexError::service_error(service_err.to_string())
                }
            })?;

        let face_ids: Vec<String> = response
            .face_records()
            .iter()
            .filter_map(|r| r.face().and_then(|f| f.face_id()).map(String::from))
            .collect();

        debug!(
            "Indexed {} face(s) from {} as {}",
            face_ids.len(),
            asset_key,
            external_id
        );
        Ok(face_ids)
    }

    async fn search_similar(
        &self,
        collection_id: &str,
        query_asset_key: &str,
        max_results: u32,
        threshold: f32,
    ) -> IndexResult<Vec<RawHit>> {
        let response = self
            .client
            .search_faces_by_image()
            .collection_id(collection_id)
            .image(self.s3_image(query_asset_key))
            .max_faces(max_results as i32)
            .face_match_threshold(threshold)
            .send()
            .await
            .map_err(|e| {
                let service_err = e.into_service_error();
                if service_err.is_resource_not_found_exception() {
                    IndexError::CollectionNotFound(collection_id.to_string())
                } else if service_err.is_invalid_s3_object_exception() {
                    IndexError::AssetNotFound(query_asset_key.to_string())
                } else if service_err.is_invalid_image_format_exception() {
                    IndexError::UnsupportedFormat(query_asset_key.to_string())
                } else if service_err.is_provisioned_throughput_exceeded_exception()
                    || service_err.is_throttling_exception()
                {
                    IndexError::RateLimited
                } else {
                    IndexError::service_error(service_err.to_string())
                }
            })?;

        let hits: Vec<RawHit> = response
            .face_matches()
            .iter()
            .filter_map(|m| {
                let external_id = m.face().and_then(|f| f.external_image_id())?;
                Some(RawHit {
                    external_id: external_id.to_string(),
                    similarity: m.similarity().unwrap_or(0.0),
                })
            })
            .collect();

        debug!(
            "Search in {} returned {} raw hit(s)",
            collection_id,
            hits.len()
        );
        Ok(hits)
    }

    async fn delete_faces(&self, collection_id: &str, face_ids: &[String]) -> IndexResult<()> {
        if face_ids.is_empty() {
            return Ok(());
        }

        self.client
            .delete_faces()
            .collection_id(collection_id)
            .set_face_ids(Some(face_ids.to_vec()))
            .send()
            .await
            .map_err(|e| {
                let service_err = e.into_service_error();
                if service_err.is_resource_not_found_exception() {
                    IndexError::CollectionNotFound(collection_id.to_string())
                } else if service_err.is_provisioned_throughput_exceeded_exception()
                    || service_err.is_throttling_exception()
                {
                    IndexError::RateLimited
                } else {
                    IndexError::service_error(service_err.to_string())
                }
            })?;

        info!(
            "Deleted {} face entr(ies) from {}",
            face_ids.len(),
            collection_id
        );
        Ok(())
    }
}
