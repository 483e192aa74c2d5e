//! In-memory object store.
//!
//! Backs unit tests and local development without an S3 endpoint.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{StorageError, StorageResult};
use crate::store::{ObjectInfo, ObjectStore};

/// In-memory [`ObjectStore`] keyed by full object key.
#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.lock().expect("store lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put_bytes(&self, key: &str, data: Vec<u8>, _content_type: &str) -> StorageResult<()> {
        self.objects
            .lock()
            .expect("store lock")
            .insert(key.to_string(), data);
        Ok(())
    }

    async fn get_bytes(&self, key: &str) -> StorageResult<Vec<u8>> {
        self.objects
            .lock()
            .expect("store lock")
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::not_found(key))
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        Ok(self.objects.lock().expect("store lock").contains_key(key))
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<ObjectInfo>> {
        Ok(self
            .objects
            .lock()
            .expect("store lock")
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| ObjectInfo {
                key: k.clone(),
                size: v.len() as u64,
            })
            .collect())
    }

    async fn delete(&self, keys: &[String]) -> StorageResult<u32> {
        let mut objects = self.objects.lock().expect("store lock");
        for key in keys {
            objects.remove(key);
        }
        Ok(keys.len() as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_list() {
        let store = MemoryStore::new();
        store
            .put_bytes("events/ev1/images/a.jpg", vec![1, 2, 3], "image/jpeg")
            .await
            .unwrap();
        store
            .put_bytes("events/ev1/images/b.jpg", vec![4], "image/jpeg")
            .await
            .unwrap();
        store
            .put_bytes("events/ev2/images/c.jpg", vec![5], "image/jpeg")
            .await
            .unwrap();

        assert_eq!(store.get_bytes("events/ev1/images/a.jpg").await.unwrap(), vec![1, 2, 3]);
        assert!(store.exists("events/ev1/images/b.jpg").await.unwrap());
        assert!(!store.exists("events/ev1/images/z.jpg").await.unwrap());

        let listed = store.list("events/ev1/").await.unwrap();
        assert_eq!(listed.len(), 2);
    }

    #[tokio::test]
    async fn test_delete() {
        let store = MemoryStore::new();
        store.put_bytes("k1", vec![1], "image/jpeg").await.unwrap();
        store.delete(&["k1".to_string()]).await.unwrap();
        assert!(!store.exists("k1").await.unwrap());
    }
}
