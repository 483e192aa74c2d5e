//! Shared data models for the FaceFind backend.
//!
//! This crate provides:
//! - The identifier codec (filename sanitization, frame external ids)
//! - The tagged `Match` type for search results
//! - Attendee records and derived user statistics
//! - Upload validation and asset classification
//! - Storage key layout for collections

pub mod asset;
pub mod attendee;
pub mod identifier;
pub mod keys;
pub mod matching;

// Re-export common types
pub use asset::{classify_asset, content_type_for, is_indexable, validate_upload, AssetKind, ValidationError};
pub use attendee::{compute_statistics, AttendeeRecord, UserStatistics, DEFAULT_COLLECTION_ID};
pub use identifier::{frame_external_id, parse_frame_external_id, sanitize_filename};
pub use matching::{dedupe_matches, CollectionMatch, Match, RawHit};
