//! Playback source classification
//!
//! A loaded URL is either a direct media file, played by a local element that
//! pushes time updates, or a YouTube video, played by an embedded player that
//! has to be polled for its position.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use url::Url;

/// Container types recognized from the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaType {
    Mp4,
    WebM,
    Ogg,
    QuickTime,
    Avi,
    Wmv,
}

impl MediaType {
    /// Map a file extension to a media type, `None` if unrecognized
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "mp4" => Some(MediaType::Mp4),
            "webm" => Some(MediaType::WebM),
            "ogg" => Some(MediaType::Ogg),
            "mov" => Some(MediaType::QuickTime),
            "avi" => Some(MediaType::Avi),
            "wmv" => Some(MediaType::Wmv),
            _ => None,
        }
    }

    /// Infer the media type of a URL, falling back to MP4
    pub fn from_url(url: &str) -> Self {
        file_extension(url)
            .and_then(|ext| Self::from_extension(&ext))
            .unwrap_or(MediaType::Mp4)
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            MediaType::Mp4 => "video/mp4",
            MediaType::WebM => "video/webm",
            MediaType::Ogg => "video/ogg",
            MediaType::QuickTime => "video/quicktime",
            MediaType::Avi => "video/x-msvideo",
            MediaType::Wmv => "video/x-ms-wmv",
        }
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mime_type())
    }
}

/// Which clock a source provides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlaybackKind {
    /// Push-based: the element emits time updates
    DirectMedia,
    /// Pull-based: the player must be polled
    Embedded,
}

impl std::fmt::Display for PlaybackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackKind::DirectMedia => write!(f, "direct media"),
            PlaybackKind::Embedded => write!(f, "embedded"),
        }
    }
}

/// A classified, non-empty video URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlaybackSource {
    DirectMedia {
        url: String,
        media_type: MediaType,
    },
    Embedded {
        url: String,
        video_id: Option<String>,
    },
}

impl PlaybackSource {
    /// Classify a URL by its shape. Returns `None` for an empty URL.
    pub fn classify(url: &str) -> Option<Self> {
        if url.is_empty() {
            return None;
        }

        let source = if is_youtube_url(url) {
            PlaybackSource::Embedded {
                url: url.to_string(),
                video_id: youtube_id(url),
            }
        } else {
            PlaybackSource::DirectMedia {
                url: url.to_string(),
                media_type: MediaType::from_url(url),
            }
        };
        Some(source)
    }

    pub fn kind(&self) -> PlaybackKind {
        match self {
            PlaybackSource::DirectMedia { .. } => PlaybackKind::DirectMedia,
            PlaybackSource::Embedded { .. } => PlaybackKind::Embedded,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            PlaybackSource::DirectMedia { url, .. } | PlaybackSource::Embedded { url, .. } => url,
        }
    }

    /// MIME type for direct media sources
    pub fn mime_type(&self) -> Option<&'static str> {
        match self {
            PlaybackSource::DirectMedia { media_type, .. } => Some(media_type.mime_type()),
            PlaybackSource::Embedded { .. } => None,
        }
    }

    /// Extracted video id for embedded sources
    pub fn video_id(&self) -> Option<&str> {
        match self {
            PlaybackSource::Embedded { video_id, .. } => video_id.as_deref(),
            PlaybackSource::DirectMedia { .. } => None,
        }
    }
}

fn youtube_url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(https?://)?(www\.)?(youtube\.com|youtu\.?be)/.+$")
            .expect("YouTube URL pattern is valid")
    })
}

fn youtube_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^.*((youtu.be/)|(v/)|(/u/\w/)|(embed/)|(watch\?))\??v?=?([^#&?]*).*")
            .expect("YouTube id pattern is valid")
    })
}

/// True if the URL points at youtube.com, youtu.be or a bare `youtube` host
pub fn is_youtube_url(url: &str) -> bool {
    youtube_url_regex().is_match(url)
}

/// Extract the 11 character video id from a YouTube URL
pub fn youtube_id(url: &str) -> Option<String> {
    youtube_id_regex()
        .captures(url)
        .and_then(|caps| caps.get(7))
        .map(|m| m.as_str())
        .filter(|id| id.chars().count() == 11)
        .map(str::to_string)
}

/// Extension of the last path segment. Query strings and fragments are
/// ignored when the URL parses; otherwise everything after the last `.` is
/// used.
fn file_extension(url: &str) -> Option<String> {
    let segment = Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed
                .path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .unwrap_or_else(|| url.to_string());

    segment.rsplit_once('.').map(|(_, ext)| ext.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_from_extension() {
        assert_eq!(MediaType::from_url("https://cdn.example.com/a.webm").mime_type(), "video/webm");
        assert_eq!(MediaType::from_url("clip.mov").mime_type(), "video/quicktime");
        assert_eq!(MediaType::from_url("clip.avi").mime_type(), "video/x-msvideo");
        assert_eq!(MediaType::from_url("clip.wmv").mime_type(), "video/x-ms-wmv");
        assert_eq!(MediaType::from_url("clip.ogg").mime_type(), "video/ogg");
        assert_eq!(MediaType::from_url("clip.MP4").mime_type(), "video/mp4");
    }

    #[test]
    fn test_mime_defaults_to_mp4() {
        assert_eq!(MediaType::from_url("https://example.com/stream"), MediaType::Mp4);
        assert_eq!(MediaType::from_url("https://example.com/a.mkv"), MediaType::Mp4);
        assert_eq!(MediaType::from_url("noextension"), MediaType::Mp4);
    }

    #[test]
    fn test_mime_ignores_query() {
        assert_eq!(
            MediaType::from_url("https://cdn.example.com/v/a.webm?token=abc.def"),
            MediaType::WebM
        );
    }

    #[test]
    fn test_youtube_classification() {
        assert!(is_youtube_url("https://youtu.be/abc123XYZ_1"));
        assert!(is_youtube_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ"));
        assert!(is_youtube_url("youtube.com/watch?v=dQw4w9WgXcQ"));
        assert!(is_youtube_url("http://youtu.be/x"));
        assert!(!is_youtube_url("https://vimeo.com/123"));
        assert!(!is_youtube_url("https://www.youtube.com/"));
        assert!(!is_youtube_url("https://example.com/youtube.com/video.mp4"));
    }

    #[test]
    fn test_youtube_host_variants() {
        assert!(is_youtube_url("https://youtube/watch?v=dQw4w9WgXcQ"));
        assert!(is_youtube_url("https://youtube.com/embed/dQw4w9WgXcQ"));
        assert!(!is_youtube_url("https://youtube.be/dQw4w9WgXcQ"));
        assert!(!is_youtube_url("https://youtu.com/dQw4w9WgXcQ"));
    }

    #[test]
    fn test_youtube_id_extraction() {
        assert_eq!(youtube_id("https://youtu.be/abc123XYZ_-"), Some("abc123XYZ_-".to_string()));
        assert_eq!(
            youtube_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=30"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            youtube_id("https://www.youtube.com/embed/dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(youtube_id("https://youtu.be/short"), None);
        assert_eq!(youtube_id("https://example.com/video.mp4"), None);
    }

    #[test]
    fn test_short_youtu_be_id_is_rejected() {
        // Ten characters: still embedded, but no usable id.
        let source = PlaybackSource::classify("https://youtu.be/abc123XYZ_").unwrap();
        assert_eq!(source.kind(), PlaybackKind::Embedded);
        assert_eq!(source.video_id(), None);
    }

    #[test]
    fn test_classify() {
        assert_eq!(PlaybackSource::classify(""), None);

        let direct = PlaybackSource::classify("https://example.com/movie.webm").unwrap();
        assert_eq!(direct.kind(), PlaybackKind::DirectMedia);
        assert_eq!(direct.mime_type(), Some("video/webm"));
        assert_eq!(direct.video_id(), None);

        let embedded = PlaybackSource::classify("https://youtu.be/abc123XYZ_0").unwrap();
        assert_eq!(embedded.kind(), PlaybackKind::Embedded);
        assert_eq!(embedded.video_id(), Some("abc123XYZ_0"));
        assert_eq!(embedded.mime_type(), None);
    }
}
