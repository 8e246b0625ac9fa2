//! Media records produced by a source.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::EpisodeRange;

/// Where a media source's content lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MediaSourceLocation {
    Online,
    Local,
}

/// Transport kind of a media source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MediaSourceKind {
    Web,
    Torrent,
}

/// How subtitles are delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubtitleKind {
    #[default]
    Embedded,
    External,
}

/// File size in bytes, if known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FileSize(pub Option<u64>);

impl FileSize {
    pub const UNSPECIFIED: Self = Self(None);
}

impl fmt::Display for FileSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(bytes) = self.0 else {
            return f.write_str("Unspecified");
        };
        let mut value = bytes as f64;
        for unit in ["B", "KB", "MB", "GB", "TB"] {
            if value < 1024.0 {
                return write!(f, "{value:.1}{unit}");
            }
            value /= 1024.0;
        }
        write!(f, "{value:.1}PB")
    }
}

/// Where a player should go to obtain the bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResourceLocation {
    /// A web page or URL that still has to go through video matching.
    WebVideo { uri: String },
}

impl ResourceLocation {
    pub fn web_video(uri: impl Into<String>) -> Self {
        Self::WebVideo { uri: uri.into() }
    }

    pub fn uri(&self) -> &str {
        match self {
            Self::WebVideo { uri } => uri,
        }
    }
}

/// Inferred, non-authoritative properties of a media record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaProperties {
    pub subject_name: String,
    pub episode_name: String,
    pub subtitle_language_ids: Vec<String>,
    pub resolution: String,
    /// Release group or channel name
    pub alliance: String,
    pub size: FileSize,
    pub subtitle_kind: SubtitleKind,
}

/// A playable episode as seen by a downstream player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Media {
    /// Deterministic identifier, unique per (subject, channel, episode) within one source
    pub media_id: String,
    pub media_source_id: String,
    pub original_url: String,
    pub download_location: ResourceLocation,
    pub original_title: String,
    pub properties: MediaProperties,
    pub episode_range: EpisodeRange,
    pub location: MediaSourceLocation,
    pub kind: MediaSourceKind,
}

/// How confidently a media record answers a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchKind {
    Exact,
    Fuzzy,
}

/// A media record paired with its match kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaMatch {
    pub media: Media,
    pub kind: MatchKind,
}

impl MediaMatch {
    pub fn fuzzy(media: Media) -> Self {
        Self {
            media,
            kind: MatchKind::Fuzzy,
        }
    }
}
