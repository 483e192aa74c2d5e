//! Search result models.
//!
//! A raw hit is one face entry returned by the index service; matches are
//! the deduplicated per-asset results handed back to callers. `Match` is a
//! tagged union so image and video results never share a loosely typed
//! record shape.

use std::collections::HashSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One raw similarity hit from the face index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawHit {
    /// External identifier attached to the face entry at index time.
    pub external_id: String,
    /// Similarity to the query face, in percent.
    pub similarity: f32,
}

/// A deduplicated, per-asset search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Match {
    /// A single photo the query face appears in.
    Image {
        /// Storage key of the photo.
        asset_key: String,
        /// Similarity to the query face, in percent.
        similarity: f32,
    },
    /// A video the query face appears in, reconstructed from frame hits.
    Video {
        /// Storage key of the video file.
        video_key: String,
        /// Original display filename of the video.
        display_name: String,
        /// Storage key of the video thumbnail.
        thumbnail_key: String,
        /// Total number of indexable frames extracted from the video.
        frame_count: u32,
        /// Best similarity across all matching frames, in percent.
        similarity: f32,
    },
}

impl Match {
    /// Similarity to the query face, in percent.
    pub fn similarity(&self) -> f32 {
        match self {
            Match::Image { similarity, .. } => *similarity,
            Match::Video { similarity, .. } => *similarity,
        }
    }

    /// Storage key of the matched asset (photo or video file).
    pub fn asset_key(&self) -> &str {
        match self {
            Match::Image { asset_key, .. } => asset_key,
            Match::Video { video_key, .. } => video_key,
        }
    }

    pub fn is_video(&self) -> bool {
        matches!(self, Match::Video { .. })
    }
}

/// A match tagged with the collection it came from, for persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CollectionMatch {
    pub collection_id: String,
    pub matched: Match,
}

/// Drop matches whose `(collection_id, asset_key)` composite key repeats,
/// keeping first occurrence order.
pub fn dedupe_matches(matches: Vec<CollectionMatch>) -> Vec<CollectionMatch> {
    let mut seen = HashSet::new();
    matches
        .into_iter()
        .filter(|m| seen.insert((m.collection_id.clone(), m.matched.asset_key().to_string())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(collection: &str, key: &str, similarity: f32) -> CollectionMatch {
        CollectionMatch {
            collection_id: collection.to_string(),
            matched: Match::Image {
                asset_key: key.to_string(),
                similarity,
            },
        }
    }

    #[test]
    fn test_dedupe_keeps_first_occurrence() {
        let deduped = dedupe_matches(vec![
            image("ev1", "events/ev1/images/a.jpg", 91.0),
            image("ev1", "events/ev1/images/b.jpg", 85.0),
            image("ev1", "events/ev1/images/a.jpg", 99.0),
        ]);

        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].matched.similarity(), 91.0);
        assert_eq!(deduped[1].matched.asset_key(), "events/ev1/images/b.jpg");
    }

    #[test]
    fn test_dedupe_is_scoped_per_collection() {
        let deduped = dedupe_matches(vec![
            image("ev1", "events/ev1/images/a.jpg", 91.0),
            image("ev2", "events/ev1/images/a.jpg", 80.0),
        ]);
        assert_eq!(deduped.len(), 2);
    }

    #[test]
    fn test_match_serde_tag() {
        let m = Match::Video {
            video_key: "events/ev1/videos/v1/party.mp4".to_string(),
            display_name: "party.mp4".to_string(),
            thumbnail_key: "events/ev1/videos/v1/thumbnail.jpg".to_string(),
            frame_count: 10,
            similarity: 88.0,
        };
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["type"], "video");
        assert_eq!(json["frame_count"], 10);

        let back: Match = serde_json::from_value(json).unwrap();
        assert_eq!(back, m);
    }
}
