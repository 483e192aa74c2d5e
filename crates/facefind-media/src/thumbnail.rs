//! Thumbnail generation.

use std::path::Path;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;
use crate::probe::get_duration;

const THUMBNAIL_SCALE_WIDTH: u32 = 480;
const THUMBNAIL_TIMESTAMP: f64 = 1.0;

/// Generate a thumbnail JPEG from a video file.
pub async fn generate_thumbnail(
    video_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
) -> MediaResult<()> {
    let video_path = video_path.as_ref();
    let output_path = output_path.as_ref();

    // Very short clips may not reach the default timestamp.
    let duration = get_duration(video_path).await?;
    let timestamp = if duration > THUMBNAIL_TIMESTAMP {
        THUMBNAIL_TIMESTAMP
    } else {
        duration / 2.0
    };

    let filter = format!("scale={}:-2", THUMBNAIL_SCALE_WIDTH);

    let cmd = FfmpegCommand::new(video_path, output_path)
        .seek(timestamp)
        .single_frame()
        .video_filter(&filter);

    FfmpegRunner::new().with_timeout(60).run(&cmd).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thumbnail_filter() {
        let filter = format!("scale={}:-2", THUMBNAIL_SCALE_WIDTH);
        assert!(filter.contains("480"));
    }
}
