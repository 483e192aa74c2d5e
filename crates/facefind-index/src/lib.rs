//! Face index client for FaceFind.
//!
//! This crate provides:
//! - The [`FaceIndex`] trait the pipeline is written against
//! - A Rekognition implementation with idempotent collection creation and
//!   a duplicate pre-check for idempotent batch re-runs
//! - Error mapping into the pipeline taxonomy

pub mod client;
pub mod error;

pub use client::{FaceIndex, IndexConfig, RekognitionIndex};
pub use error::{IndexError, IndexResult};
