//! Object store abstraction.
//!
//! The engine only depends on this trait; production wires in the S3
//! client, tests wire in [`crate::memory::MemoryStore`].

use std::path::Path;

use async_trait::async_trait;

use crate::error::StorageResult;

/// Information about a stored object.
#[derive(Debug, Clone)]
pub struct ObjectInfo {
    /// Object key
    pub key: String,
    /// Size in bytes
    pub size: u64,
}

/// Durable object storage addressed by path-like keys.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload raw bytes.
    async fn put_bytes(&self, key: &str, data: Vec<u8>, content_type: &str) -> StorageResult<()>;

    /// Download an object as bytes.
    async fn get_bytes(&self, key: &str) -> StorageResult<Vec<u8>>;

    /// Check whether an object exists.
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// List all objects under a prefix.
    async fn list(&self, prefix: &str) -> StorageResult<Vec<ObjectInfo>>;

    /// Delete objects. Returns the number of keys submitted for deletion.
    async fn delete(&self, keys: &[String]) -> StorageResult<u32>;

    /// Upload a local file.
    async fn upload_file(&self, path: &Path, key: &str, content_type: &str) -> StorageResult<()> {
        let data = tokio::fs::read(path).await?;
        self.put_bytes(key, data, content_type).await
    }

    /// Download an object to a local file, creating parent directories.
    async fn download_file(&self, key: &str, path: &Path) -> StorageResult<()> {
        let bytes = self.get_bytes(key).await?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, bytes).await?;
        Ok(())
    }
}
