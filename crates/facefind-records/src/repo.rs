//! Attendee record store.
//!
//! One record per (user_id, collection_id) pair. A fresh search result is
//! authoritative: `replace_matches` overwrites the match lists wholesale,
//! never merges. Writes are last-writer-wins; concurrent searches for the
//! same pair race and the last replace wins.

use async_trait::async_trait;
use chrono::Utc;

use facefind_models::{compute_statistics, AttendeeRecord, UserStatistics};

use crate::error::StoreResult;

/// New match state for a (user, collection) pair.
#[derive(Debug, Clone)]
pub struct MatchUpdate {
    pub user_id: String,
    pub collection_id: String,
    /// Selfie used as the query face for this search.
    pub selfie_key: String,
    /// Display name for the collection.
    pub display_name: String,
    /// Cover image for the collection.
    pub cover_key: Option<String>,
    /// Matched photo keys, replacing any previous list.
    pub matched_images: Vec<String>,
    /// Matched video keys, replacing any previous list.
    pub matched_videos: Vec<String>,
}

/// Persistent store of attendee records.
#[async_trait]
pub trait AttendeeStore: Send + Sync {
    /// Replace the match state for a (user, collection) pair, creating the
    /// record when absent. `created_at` and the contribution flag survive
    /// replacement; everything else in the update overwrites.
    async fn replace_matches(&self, update: MatchUpdate) -> StoreResult<AttendeeRecord>;

    /// Fetch one record.
    async fn get(&self, user_id: &str, collection_id: &str)
        -> StoreResult<Option<AttendeeRecord>>;

    /// List all records for a user.
    async fn list_for_user(&self, user_id: &str) -> StoreResult<Vec<AttendeeRecord>>;

    /// Mark that the user has contributed uploads to this collection,
    /// creating a stub record on first contribution.
    async fn mark_uploaded(&self, user_id: &str, collection_id: &str) -> StoreResult<()>;

    /// Statistics folded over all of the user's records.
    async fn statistics(&self, user_id: &str) -> StoreResult<UserStatistics> {
        let records = self.list_for_user(user_id).await?;
        Ok(compute_statistics(&records))
    }
}

/// Apply a [`MatchUpdate`] over an optional existing record, producing the
/// record to persist. Shared by every store implementation so replace
/// semantics cannot drift between backends.
pub fn apply_update(existing: Option<AttendeeRecord>, update: MatchUpdate) -> AttendeeRecord {
    let now = Utc::now();
    let (created_at, has_uploads) = match &existing {
        Some(record) => (record.created_at, record.has_uploads),
        None => (now, false),
    };

    AttendeeRecord {
        user_id: update.user_id,
        collection_id: update.collection_id,
        selfie_key: update.selfie_key,
        display_name: update.display_name,
        cover_key: update.cover_key,
        matched_images: update.matched_images,
        matched_videos: update.matched_videos,
        has_uploads,
        created_at,
        updated_at: now,
    }
}
