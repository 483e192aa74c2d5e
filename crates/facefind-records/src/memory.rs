//! In-memory attendee store for tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use facefind_models::AttendeeRecord;

use crate::error::StoreResult;
use crate::repo::{apply_update, AttendeeStore, MatchUpdate};

/// [`AttendeeStore`] backed by a process-local map.
#[derive(Default)]
pub struct MemoryAttendeeStore {
    records: Mutex<HashMap<(String, String), AttendeeRecord>>,
}

impl MemoryAttendeeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().unwrap().is_empty()
    }
}

#[async_trait]
impl AttendeeStore for MemoryAttendeeStore {
    async fn replace_matches(&self, update: MatchUpdate) -> StoreResult<AttendeeRecord> {
        let key = (update.user_id.clone(), update.collection_id.clone());
        let mut records = self.records.lock().unwrap();
        let record = apply_update(records.get(&key).cloned(), update);
        records.insert(key, record.clone());
        Ok(record)
    }

    async fn get(
        &self,
        user_id: &str,
        collection_id: &str,
    ) -> StoreResult<Option<AttendeeRecord>> {
        let records = self.records.lock().unwrap();
        Ok(records
            .get(&(user_id.to_string(), collection_id.to_string()))
            .cloned())
    }

    async fn list_for_user(&self, user_id: &str) -> StoreResult<Vec<AttendeeRecord>> {
        let records = self.records.lock().unwrap();
        let mut found: Vec<AttendeeRecord> = records
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.collection_id.cmp(&b.collection_id));
        Ok(found)
    }

    async fn mark_uploaded(&self, user_id: &str, collection_id: &str) -> StoreResult<()> {
        let key = (user_id.to_string(), collection_id.to_string());
        let mut records = self.records.lock().unwrap();
        match records.get_mut(&key) {
            Some(record) => {
                record.has_uploads = true;
                record.updated_at = Utc::now();
            }
            None => {
                let mut record = AttendeeRecord::new(user_id, collection_id, "");
                record.has_uploads = true;
                records.insert(key, record);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(collection_id: &str, images: &[&str]) -> MatchUpdate {
        MatchUpdate {
            user_id: "user-1".to_string(),
            collection_id: collection_id.to_string(),
            selfie_key: format!("events/{}/selfies/user-1.jpg", collection_id),
            display_name: collection_id.to_string(),
            cover_key: None,
            matched_images: images.iter().map(|s| s.to_string()).collect(),
            matched_videos: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_replace_overwrites_previous_matches() {
        let store = MemoryAttendeeStore::new();
        store
            .replace_matches(update("wedding", &["a.jpg", "b.jpg"]))
            .await
            .unwrap();
        let record = store
            .replace_matches(update("wedding", &["c.jpg"]))
            .await
            .unwrap();

        assert_eq!(record.matched_images, vec!["c.jpg"]);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_mark_uploaded_creates_stub_record() {
        let store = MemoryAttendeeStore::new();
        store.mark_uploaded("user-1", "gala").await.unwrap();

        let record = store.get("user-1", "gala").await.unwrap().unwrap();
        assert!(record.has_uploads);
        assert!(record.matched_images.is_empty());
    }

    #[tokio::test]
    async fn test_mark_uploaded_survives_replace() {
        let store = MemoryAttendeeStore::new();
        store.mark_uploaded("user-1", "gala").await.unwrap();
        let record = store
            .replace_matches(update("gala", &["a.jpg"]))
            .await
            .unwrap();
        assert!(record.has_uploads);
    }

    #[tokio::test]
    async fn test_list_for_user_filters_by_user() {
        let store = MemoryAttendeeStore::new();
        store.replace_matches(update("wedding", &[])).await.unwrap();
        store.replace_matches(update("gala", &[])).await.unwrap();
        store
            .replace_matches(MatchUpdate {
                user_id: "user-2".to_string(),
                ..update("wedding", &[])
            })
            .await
            .unwrap();

        let records = store.list_for_user("user-1").await.unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.user_id == "user-1"));
    }
}
