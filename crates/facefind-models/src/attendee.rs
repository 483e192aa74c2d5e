//! Attendee records and derived user statistics.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Reserved sentinel collection id for records not tied to a real event.
/// Excluded from statistics.
pub const DEFAULT_COLLECTION_ID: &str = "default";

/// Persisted per-(user, collection) match state.
///
/// At most one record exists per (user_id, collection_id) pair. The match
/// lists are replaced wholesale on every successful search; stale entries
/// from deleted or re-indexed assets must not linger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AttendeeRecord {
    /// Attendee user id.
    pub user_id: String,

    /// Event collection id.
    pub collection_id: String,

    /// Storage key of the selfie used as the query face.
    pub selfie_key: String,

    /// Display name for the collection (event name).
    #[serde(default)]
    pub display_name: String,

    /// Cover image key for the collection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_key: Option<String>,

    /// Storage keys of matched photos, from the latest search.
    #[serde(default)]
    pub matched_images: Vec<String>,

    /// Storage keys of matched videos, from the latest search.
    #[serde(default)]
    pub matched_videos: Vec<String>,

    /// Whether the user has separately contributed (uploaded) assets to
    /// this collection.
    #[serde(default)]
    pub has_uploads: bool,

    /// Creation timestamp.
    pub created_at: DateTime<Utc>,

    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl AttendeeRecord {
    /// Create a fresh record for a (user, collection) pair.
    pub fn new(
        user_id: impl Into<String>,
        collection_id: impl Into<String>,
        selfie_key: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.into(),
            collection_id: collection_id.into(),
            selfie_key: selfie_key.into(),
            display_name: String::new(),
            cover_key: None,
            matched_images: Vec::new(),
            matched_videos: Vec::new(),
            has_uploads: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Aggregate view over all of a user's attendee records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct UserStatistics {
    /// Number of distinct events the user has matches in.
    pub total_events: u32,
    /// Total matched photos across all events.
    pub total_images: u32,
    /// Total matched videos across all events.
    pub total_videos: u32,
    /// Earliest record creation time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_date: Option<DateTime<Utc>>,
    /// Most recent record update time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_date: Option<DateTime<Utc>>,
}

/// Fold a user's records into statistics, excluding the default sentinel.
pub fn compute_statistics(records: &[AttendeeRecord]) -> UserStatistics {
    let mut events = HashSet::new();
    let mut total_images = 0u32;
    let mut total_videos = 0u32;
    let mut first_date: Option<DateTime<Utc>> = None;
    let mut latest_date: Option<DateTime<Utc>> = None;

    for record in records {
        if record.collection_id == DEFAULT_COLLECTION_ID {
            continue;
        }

        events.insert(record.collection_id.as_str());
        total_images += record.matched_images.len() as u32;
        total_videos += record.matched_videos.len() as u32;

        first_date = Some(match first_date {
            Some(d) => d.min(record.created_at),
            None => record.created_at,
        });
        latest_date = Some(match latest_date {
            Some(d) => d.max(record.updated_at),
            None => record.updated_at,
        });
    }

    UserStatistics {
        total_events: events.len() as u32,
        total_images,
        total_videos,
        first_date,
        latest_date,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(collection: &str, images: usize, videos: usize) -> AttendeeRecord {
        let mut r = AttendeeRecord::new("user-1", collection, "selfies/user-1.jpg");
        r.matched_images = (0..images).map(|i| format!("img-{}", i)).collect();
        r.matched_videos = (0..videos).map(|i| format!("vid-{}", i)).collect();
        r
    }

    #[test]
    fn test_statistics_excludes_default_sentinel() {
        let records = vec![
            record("wedding", 2, 1),
            record(DEFAULT_COLLECTION_ID, 0, 0),
            record("reunion", 3, 2),
        ];

        let stats = compute_statistics(&records);
        assert_eq!(stats.total_events, 2);
        assert_eq!(stats.total_images, 5);
        assert_eq!(stats.total_videos, 3);
    }

    #[test]
    fn test_statistics_date_range() {
        let mut early = record("a", 1, 0);
        early.created_at = Utc::now() - Duration::days(10);
        let mut late = record("b", 0, 1);
        late.updated_at = Utc::now() + Duration::days(1);

        let stats = compute_statistics(&[early.clone(), late.clone()]);
        assert_eq!(stats.first_date, Some(early.created_at));
        assert_eq!(stats.latest_date, Some(late.updated_at));
    }

    #[test]
    fn test_statistics_empty() {
        let stats = compute_statistics(&[]);
        assert_eq!(stats.total_events, 0);
        assert!(stats.first_date.is_none());
        assert!(stats.latest_date.is_none());
    }

    #[test]
    fn test_counts_distinct_collections_once() {
        // Two records for the same collection should count one event.
        let records = vec![record("wedding", 1, 0), record("wedding", 2, 0)];
        let stats = compute_statistics(&records);
        assert_eq!(stats.total_events, 1);
        assert_eq!(stats.total_images, 3);
    }
}
