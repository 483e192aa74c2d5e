//! Video processing for FaceFind.
//!
//! Wraps the ffmpeg and ffprobe CLIs for the two things the pipeline needs
//! from a video: a thumbnail and a set of evenly spaced still frames that
//! the face index can ingest.

pub mod command;
pub mod error;
pub mod frames;
pub mod probe;
pub mod thumbnail;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use frames::{extract_frames, frame_timestamps, ExtractedFrame};
pub use probe::{get_duration, probe_video, VideoInfo};
pub use thumbnail::generate_thumbnail;
