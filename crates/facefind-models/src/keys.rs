//! Storage key layout for collections.
//!
//! All assets for a collection live under `events/{collection_id}/`:
//! images under `images/`, each video under `videos/{video_id}/` with its
//! original filename plus `thumbnail.jpg` and `frames/frame_{n}.jpg`, and
//! the external-id manifest under `index/external_ids.json`.

/// Prefix for a collection's photos.
pub fn images_prefix(collection_id: &str) -> String {
    format!("events/{}/images/", collection_id)
}

/// Key for an uploaded photo.
pub fn image_key(collection_id: &str, filename: &str) -> String {
    format!("events/{}/images/{}", collection_id, filename)
}

/// Prefix covering every video directory in a collection.
pub fn videos_prefix(collection_id: &str) -> String {
    format!("events/{}/videos/", collection_id)
}

/// Directory prefix for one video's assets.
pub fn video_dir(collection_id: &str, video_id: &str) -> String {
    format!("events/{}/videos/{}/", collection_id, video_id)
}

/// Key for the original video file, stored under its display filename.
pub fn video_key(collection_id: &str, video_id: &str, filename: &str) -> String {
    format!("events/{}/videos/{}/{}", collection_id, video_id, filename)
}

/// Key for a video's thumbnail, derived by convention from its directory.
pub fn thumbnail_key(collection_id: &str, video_id: &str) -> String {
    format!("events/{}/videos/{}/thumbnail.jpg", collection_id, video_id)
}

/// Thumbnail key for the video directory containing `video_file_key`.
pub fn thumbnail_key_for(video_file_key: &str) -> String {
    match video_file_key.rsplit_once('/') {
        Some((dir, _)) => format!("{}/thumbnail.jpg", dir),
        None => "thumbnail.jpg".to_string(),
    }
}

/// Prefix for one video's extracted frames.
pub fn frames_prefix(collection_id: &str, video_id: &str) -> String {
    format!("events/{}/videos/{}/frames/", collection_id, video_id)
}

/// Key for one extracted frame. Frame numbers start at 1.
pub fn frame_key(collection_id: &str, video_id: &str, frame_number: u32) -> String {
    format!(
        "events/{}/videos/{}/frames/frame_{}.jpg",
        collection_id, video_id, frame_number
    )
}

/// Key of the external-id manifest for a collection.
pub fn manifest_key(collection_id: &str) -> String {
    format!("events/{}/index/external_ids.json", collection_id)
}

/// Last path segment of a storage key.
pub fn filename_of(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

/// Frame number encoded in a frame key (`.../frames/frame_{n}.jpg`).
pub fn frame_number_of(key: &str) -> Option<u32> {
    let name = filename_of(key);
    name.strip_prefix("frame_")?
        .strip_suffix(".jpg")?
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        assert_eq!(images_prefix("ev1"), "events/ev1/images/");
        assert_eq!(image_key("ev1", "a.jpg"), "events/ev1/images/a.jpg");
        assert_eq!(
            frame_key("ev1", "v1", 3),
            "events/ev1/videos/v1/frames/frame_3.jpg"
        );
        assert_eq!(manifest_key("ev1"), "events/ev1/index/external_ids.json");
    }

    #[test]
    fn test_thumbnail_derivation() {
        assert_eq!(
            thumbnail_key_for("events/ev1/videos/v1/party.mp4"),
            "events/ev1/videos/v1/thumbnail.jpg"
        );
        assert_eq!(
            thumbnail_key_for("events/ev1/videos/v1/party.mp4"),
            thumbnail_key("ev1", "v1")
        );
    }

    #[test]
    fn test_frame_number_parsing() {
        assert_eq!(
            frame_number_of("events/ev1/videos/v1/frames/frame_7.jpg"),
            Some(7)
        );
        assert_eq!(frame_number_of("events/ev1/videos/v1/thumbnail.jpg"), None);
        assert_eq!(frame_number_of("events/ev1/videos/v1/frames/frame_x.jpg"), None);
    }

    #[test]
    fn test_filename_of() {
        assert_eq!(filename_of("events/ev1/images/a.jpg"), "a.jpg");
        assert_eq!(filename_of("bare.jpg"), "bare.jpg");
    }
}
