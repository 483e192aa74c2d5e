//! Frame extraction from video files.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::probe::get_duration;

/// Timeout for a single frame extraction.
const FRAME_TIMEOUT_SECS: u64 = 60;

/// One extracted frame on disk, numbered from 1.
#[derive(Debug, Clone)]
pub struct ExtractedFrame {
    /// 1-based frame number
    pub number: u32,
    /// Path to the frame JPEG
    pub path: PathBuf,
    /// Timestamp the frame was taken at, in seconds
    pub timestamp: f64,
}

/// Timestamps for `count` evenly spaced frames over `duration` seconds,
/// avoiding the very start and end of the video.
pub fn frame_timestamps(duration: f64, count: u32) -> Vec<f64> {
    if duration <= 0.0 || count == 0 {
        return Vec::new();
    }
    (1..=count)
        .map(|i| duration * i as f64 / (count + 1) as f64)
        .collect()
}

/// Extract up to `count` frames from a video into `out_dir` as
/// `frame_1.jpg` .. `frame_{count}.jpg`.
///
/// A frame that fails to extract is skipped with a warning; the call only
/// fails when no frame could be produced at all.
pub async fn extract_frames(
    video_path: impl AsRef<Path>,
    out_dir: impl AsRef<Path>,
    count: u32,
) -> MediaResult<Vec<ExtractedFrame>> {
    let video_path = video_path.as_ref();
    let out_dir = out_dir.as_ref();

    if !video_path.exists() {
        return Err(MediaError::FileNotFound(video_path.to_path_buf()));
    }
    tokio::fs::create_dir_all(out_dir).await?;

    let duration = get_duration(video_path).await?;
    if duration <= 0.0 {
        return Err(MediaError::InvalidVideo(format!(
            "Zero-length video: {}",
            video_path.display()
        )));
    }

    let runner = FfmpegRunner::new().with_timeout(FRAME_TIMEOUT_SECS);
    let mut frames = Vec::new();

    for (idx, timestamp) in frame_timestamps(duration, count).into_iter().enumerate() {
        let number = idx as u32 + 1;
        let path = out_dir.join(format!("frame_{}.jpg", number));

        let cmd = FfmpegCommand::new(video_path, &path)
            .seek(timestamp)
            .single_frame()
            .jpeg_quality(2);

        match runner.run(&cmd).await {
            Ok(()) => frames.push(ExtractedFrame {
                number,
                path,
                timestamp,
            }),
            Err(e) => {
                warn!(
                    "Frame {} at {:.3}s failed for {}: {}",
                    number,
                    timestamp,
                    video_path.display(),
                    e
                );
            }
        }
    }

    if frames.is_empty() {
        return Err(MediaError::InvalidVideo(format!(
            "No frames extracted from {}",
            video_path.display()
        )));
    }

    info!(
        "Extracted {}/{} frame(s) from {}",
        frames.len(),
        count,
        video_path.display()
    );
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamps_evenly_spaced() {
        let ts = frame_timestamps(110.0, 10);
        assert_eq!(ts.len(), 10);
        assert!((ts[0] - 10.0).abs() < 0.001);
        assert!((ts[9] - 100.0).abs() < 0.001);

        // Constant gap between consecutive timestamps
        let gap = ts[1] - ts[0];
        for w in ts.windows(2) {
            assert!((w[1] - w[0] - gap).abs() < 0.001);
        }
    }

    #[test]
    fn test_timestamps_avoid_edges() {
        let ts = frame_timestamps(5.0, 3);
        assert!(ts.iter().all(|&t| t > 0.0 && t < 5.0));
    }

    #[test]
    fn test_timestamps_degenerate_inputs() {
        assert!(frame_timestamps(0.0, 10).is_empty());
        assert!(frame_timestamps(30.0, 0).is_empty());
    }
}
