//! Attendee record persistence for FaceFind.
//!
//! Stores one record per (user, collection) pair covering the query selfie,
//! the latest match lists and the contribution flag. The production backend
//! is DynamoDB; an in-memory store backs tests.

pub mod dynamo;
pub mod error;
pub mod memory;
pub mod repo;

pub use dynamo::{DynamoAttendeeStore, RecordsConfig};
pub use error::{StoreError, StoreResult};
pub use memory::MemoryAttendeeStore;
pub use repo::{apply_update, AttendeeStore, MatchUpdate};
