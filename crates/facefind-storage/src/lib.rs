//! S3 object storage for FaceFind collections.
//!
//! This crate provides:
//! - The [`ObjectStore`] trait the pipeline is written against
//! - An S3 implementation with config-from-env
//! - An in-memory implementation for tests and local development
//! - Collection-scoped operations (image/video/frame listing, the
//!   external-id manifest)

pub mod client;
pub mod error;
pub mod memory;
pub mod operations;
pub mod store;

pub use client::{S3Client, StorageConfig};
pub use error::{StorageError, StorageResult};
pub use memory::MemoryStore;
pub use operations::{
    count_frames, delete_collection_assets, list_collection_frames, list_collection_images,
    list_collection_videos, load_manifest, store_manifest, ExternalIdManifest, VideoAssets,
};
pub use store::{ObjectInfo, ObjectStore};
