//! External identifier codec.
//!
//! The face index only accepts external identifiers drawn from
//! `[A-Za-z0-9_.\-:]`, so human filenames must be sanitized before they are
//! attached to face entries. Video frames get a `_frame_<n>` suffix so a
//! search hit on a frame can be traced back to its parent video.
//!
//! Sanitization is deterministic and idempotent: sanitizing an already
//! sanitized name returns it unchanged.

use std::sync::OnceLock;

use regex::Regex;

/// Characters the index service accepts in an external identifier.
fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-' | ':')
}

fn counter_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(.*?)\s*\((\d+)\)\s*$").expect("valid regex"))
}

fn frame_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(.+)_frame_(\d+)$").expect("valid regex"))
}

/// Replace disallowed characters with `_`, collapse runs of `_`, and trim
/// leading/trailing `_`.
fn sanitize_component(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_was_underscore = false;
    for c in s.chars() {
        let c = if is_allowed(c) { c } else { '_' };
        if c == '_' {
            if last_was_underscore {
                continue;
            }
            last_was_underscore = true;
        } else {
            last_was_underscore = false;
        }
        out.push(c);
    }
    out.trim_matches('_').to_string()
}

/// Sanitize a filename into a valid external identifier.
///
/// A trailing parenthesized duplicate counter (`photo (2).jpg`) is stripped
/// before sanitizing the stem and re-appended in sanitized form
/// (`photo_2.jpg`), so duplicate uploads keep distinct identifiers.
pub fn sanitize_filename(name: &str) -> String {
    let (stem, ext) = match name.rsplit_once('.') {
        Some((s, e)) if !e.is_empty() => (s, Some(e)),
        _ => (name, None),
    };

    let (stem, counter) = match counter_re().captures(stem) {
        Some(caps) => (
            caps.get(1).map(|m| m.as_str()).unwrap_or(""),
            Some(caps[2].to_string()),
        ),
        None => (stem, None),
    };

    let mut parts = Vec::new();
    let stem = sanitize_component(stem);
    if !stem.is_empty() {
        parts.push(stem);
    }
    if let Some(n) = counter {
        parts.push(n);
    }

    let mut out = parts.join("_");
    if out.is_empty() {
        out.push_str("untitled");
    }

    if let Some(ext) = ext {
        let ext = sanitize_component(ext);
        if !ext.is_empty() {
            out.push('.');
            out.push_str(&ext);
        }
    }

    out
}

/// Build the external identifier for frame `frame_number` of a video.
pub fn frame_external_id(video_name: &str, frame_number: u32) -> String {
    format!("{}_frame_{}", sanitize_filename(video_name), frame_number)
}

/// Decode a frame external identifier.
///
/// Returns the sanitized video name and the frame number when `id` carries
/// the trailing `_frame_<digits>` suffix, `None` for plain image ids.
pub fn parse_frame_external_id(id: &str) -> Option<(String, u32)> {
    let caps = frame_re().captures(id)?;
    let frame_number = caps[2].parse().ok()?;
    Some((caps[1].to_string(), frame_number))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_replaces_disallowed_chars() {
        assert_eq!(sanitize_filename("my photo!.jpg"), "my_photo.jpg");
        assert_eq!(sanitize_filename("café & friends.png"), "caf_friends.png");
        assert_eq!(sanitize_filename("a/b\\c.jpg"), "a_b_c.jpg");
    }

    #[test]
    fn test_sanitize_collapses_and_trims_underscores() {
        assert_eq!(sanitize_filename("__a    b__.jpg"), "a_b.jpg");
        assert_eq!(sanitize_filename("***.jpg"), "untitled.jpg");
    }

    #[test]
    fn test_sanitize_duplicate_counter() {
        assert_eq!(sanitize_filename("photo (2).jpg"), "photo_2.jpg");
        assert_eq!(sanitize_filename("IMG 0123 (17).jpeg"), "IMG_0123_17.jpeg");
        // No counter leaves the stem alone
        assert_eq!(sanitize_filename("photo.jpg"), "photo.jpg");
    }

    #[test]
    fn test_sanitize_output_alphabet() {
        let names = [
            "weird — name (3).JPG",
            "семейное фото.png",
            "party video.mp4",
            "a(1)b(2).mov",
        ];
        for name in names {
            let s = sanitize_filename(name);
            assert!(
                s.chars().all(is_allowed),
                "sanitized {:?} contains disallowed chars: {:?}",
                name,
                s
            );
        }
    }

    #[test]
    fn test_sanitize_idempotent() {
        let names = [
            "my photo (2).jpg",
            "party video.mp4",
            "___x___.png",
            "plain.jpg",
            "no-extension",
        ];
        for name in names {
            let once = sanitize_filename(name);
            assert_eq!(sanitize_filename(&once), once, "not idempotent for {:?}", name);
        }
    }

    #[test]
    fn test_frame_external_id_round_trip() {
        let id = frame_external_id("party video.mp4", 7);
        assert_eq!(id, "party_video.mp4_frame_7");

        let (stem, n) = parse_frame_external_id(&id).expect("frame id");
        assert_eq!(stem, sanitize_filename("party video.mp4"));
        assert_eq!(n, 7);
    }

    #[test]
    fn test_parse_frame_external_id_takes_last_suffix() {
        let (stem, n) = parse_frame_external_id("clip_frame_2_frame_31").expect("frame id");
        assert_eq!(stem, "clip_frame_2");
        assert_eq!(n, 31);
    }

    #[test]
    fn test_parse_frame_external_id_rejects_plain_images() {
        assert!(parse_frame_external_id("photo.jpg").is_none());
        assert!(parse_frame_external_id("frame_").is_none());
        assert!(parse_frame_external_id("_frame_3").is_none());
        assert!(parse_frame_external_id("clip_frame_x3").is_none());
    }
}
