//! Upload validation and asset classification.
//!
//! Validation runs before any network call: bad file types and oversized
//! uploads are rejected locally. Raw camera formats are accepted into
//! storage by some clients but can never be forwarded to the face index.

use thiserror::Error;

/// Maximum accepted upload size (photos and videos alike).
pub const MAX_UPLOAD_BYTES: u64 = 500 * 1024 * 1024;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "webm", "mkv"];

/// Formats the index service cannot ingest directly (raw / non-normalized
/// camera output).
const RAW_EXTENSIONS: &[&str] = &["heic", "heif", "cr2", "nef", "arw", "dng", "raw"];

/// What kind of asset an upload is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Image,
    Video,
}

/// Errors raised by pre-flight upload validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),

    #[error("Raw camera format not supported: {0}")]
    RawFormat(String),

    #[error("File too large: {size} bytes (max {max})")]
    TooLarge { size: u64, max: u64 },

    #[error("Empty filename")]
    EmptyFilename,
}

fn extension_of(filename: &str) -> Option<String> {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
}

/// Classify a filename as image or video by extension.
pub fn classify_asset(filename: &str) -> Option<AssetKind> {
    let ext = extension_of(filename)?;
    if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        Some(AssetKind::Image)
    } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        Some(AssetKind::Video)
    } else {
        None
    }
}

/// True when the asset at `key` is in a format the face index accepts.
///
/// The index service only understands normalized JPEG/PNG; anything else
/// (including raw camera formats) must be rejected locally rather than
/// forwarded.
pub fn is_indexable(key: &str) -> bool {
    matches!(
        extension_of(key).as_deref(),
        Some("jpg") | Some("jpeg") | Some("png")
    )
}

/// Content type for a storage upload, by extension.
pub fn content_type_for(filename: &str) -> &'static str {
    match extension_of(filename).as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("mp4") => "video/mp4",
        Some("mov") => "video/quicktime",
        Some("webm") => "video/webm",
        Some("mkv") => "video/x-matroska",
        Some("json") => "application/json",
        _ => "application/octet-stream",
    }
}

/// Validate an upload before touching the network.
pub fn validate_upload(filename: &str, size: u64) -> Result<AssetKind, ValidationError> {
    if filename.trim().is_empty() {
        return Err(ValidationError::EmptyFilename);
    }

    if size > MAX_UPLOAD_BYTES {
        return Err(ValidationError::TooLarge {
            size,
            max: MAX_UPLOAD_BYTES,
        });
    }

    if let Some(ext) = extension_of(filename) {
        if RAW_EXTENSIONS.contains(&ext.as_str()) {
            return Err(ValidationError::RawFormat(ext));
        }
    }

    classify_asset(filename).ok_or_else(|| ValidationError::UnsupportedType(filename.to_string()))
}
