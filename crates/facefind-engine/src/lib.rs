//! FaceFind pipeline: face-index construction and match aggregation.
//!
//! Ties the storage, index, records and media crates into the three
//! operations the outside world calls: upload-and-index, find-matches, and
//! statistics. See [`service::FaceFindService`] for the entry point.

pub mod aggregate;
pub mod backoff;
pub mod batch;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod service;
pub mod video;

#[cfg(test)]
pub(crate) mod testing;

pub use aggregate::MatchAggregator;
pub use backoff::{backoff_delay, RetryConfig};
pub use batch::{AssetJob, BatchIndexer, BatchReport, FailedAsset};
pub use config::EngineConfig;
pub use error::{EngineError, EngineResult};
pub use logging::init_tracing;
pub use service::{FaceFindService, Upload};
pub use video::{VideoFramePreparer, VideoIngest};
