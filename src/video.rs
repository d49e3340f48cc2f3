//! Video reference parsing.
//!
//! Turns a user-supplied YouTube URL into the canonical [`VideoId`] used for
//! transcript retrieval and cache keying.

use crate::error::{Result, VidbriefError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Marker of a long-form watch URL.
const WATCH_MARKER: &str = "youtube.com/watch?v=";
/// Marker of a short link.
const SHORT_MARKER: &str = "youtu.be/";

/// Canonical YouTube video identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(String);

impl VideoId {
    /// Validate a raw token as a video id.
    ///
    /// The token must be non-empty and free of URL artifacts.
    pub fn new(raw: &str) -> Result<Self> {
        if raw.is_empty() {
            return Err(VidbriefError::InvalidReference(
                "empty video id".to_string(),
            ));
        }
        if raw
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '?' | '&' | '#' | '=' | '/'))
        {
            return Err(VidbriefError::InvalidReference(format!(
                "malformed video id: {}",
                raw
            )));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Canonical watch URL for this video.
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.0)
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for VideoId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Extract the video id from a long-form watch URL or a short link.
///
/// Watch URLs take everything after `watch?v=` up to the next `&`; short
/// links take everything after `youtu.be/` up to the next `?`. Anything else
/// is rejected rather than guessed at.
pub fn parse_video_url(url: &str) -> Result<VideoId> {
    let url = url.trim();

    let raw = if let Some((_, tail)) = url.split_once(WATCH_MARKER) {
        tail.split('&').next()
    } else if let Some((_, tail)) = url.split_once(SHORT_MARKER) {
        tail.split('?').next()
    } else {
        return Err(VidbriefError::InvalidReference(url.to_string()));
    };

    let raw = raw.unwrap_or_default();
    VideoId::new(raw).map_err(|_| VidbriefError::InvalidReference(url.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_url() {
        let id = parse_video_url("https://www.youtube.com/watch?v=xyz789&list=PL1").unwrap();
        assert_eq!(id.as_str(), "xyz789");
    }

    #[test]
    fn test_short_url() {
        let id = parse_video_url("https://youtu.be/abc123?t=5").unwrap();
        assert_eq!(id.as_str(), "abc123");
    }

    #[test]
    fn test_trailing_parameters_do_not_change_id() {
        let expected = parse_video_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ").unwrap();
        for url in [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=120",
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ&list=PL1&index=3",
            "http://youtube.com/watch?v=dQw4w9WgXcQ",
            "https://m.youtube.com/watch?v=dQw4w9WgXcQ&feature=share",
            "  https://www.youtube.com/watch?v=dQw4w9WgXcQ  ",
            "https://youtu.be/dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ?si=abcdef",
            "youtu.be/dQw4w9WgXcQ?t=42",
        ] {
            assert_eq!(parse_video_url(url).unwrap(), expected, "url: {}", url);
        }
    }

    #[test]
    fn test_unrecognized_urls_rejected() {
        for url in [
            "",
            "not a url",
            "dQw4w9WgXcQ",
            "https://vimeo.com/12345",
            "https://www.youtube.com/embed/dQw4w9WgXcQ",
            "https://www.youtube.com/playlist?list=PL1",
        ] {
            assert!(
                matches!(parse_video_url(url), Err(VidbriefError::InvalidReference(_))),
                "url: {}",
                url
            );
        }
    }

    #[test]
    fn test_empty_id_rejected() {
        assert!(parse_video_url("https://www.youtube.com/watch?v=").is_err());
        assert!(parse_video_url("https://www.youtube.com/watch?v=&list=PL1").is_err());
        assert!(parse_video_url("https://youtu.be/?t=5").is_err());
    }

    #[test]
    fn test_later_parameters_ending_in_v_are_ignored() {
        let id = parse_video_url("https://www.youtube.com/watch?v=abc123&rev=2").unwrap();
        assert_eq!(id.as_str(), "abc123");
    }

    #[test]
    fn test_fragment_is_not_part_of_id() {
        assert!(parse_video_url("https://youtu.be/abc123#t=5").is_err());
    }

    #[test]
    fn test_video_id_display_and_watch_url() {
        let id = VideoId::new("abc123").unwrap();
        assert_eq!(id.to_string(), "abc123");
        assert_eq!(id.watch_url(), "https://www.youtube.com/watch?v=abc123");
    }
}
