//! Service layer for the media source engine.
//!
//! This module contains the business logic for:
//! - Phase execution and media assembly (`SelectorMediaSourceEngine`)
//! - Selector-configured sources (`SelectorMediaSource`)
//! - Fixed-selector three-step sources (`ThreeStepSource`)
//! - Video URL matching and nested page resolution (`VideoMatcher`, `VideoResolver`)
//! - Subject and episode filtering (`MediaFilter`)

mod engine;
pub mod filters;
mod source;
mod three_step;
pub mod video;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use engine::SelectorMediaSourceEngine;
pub use filters::{FilterContext, MediaFilter};
pub use source::SelectorMediaSource;
pub use three_step::{SimpleSite, ThreeStepSite, ThreeStepSource};
pub use video::{VideoMatcher, VideoResolver, WebVideo, WebVideoMatch};

use crate::error::{AppError, Result};
use crate::models::{FetchRequest, MediaMatch};

/// Display metadata for a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaSourceInfo {
    pub display_name: String,
    pub description: String,
    pub website_url: String,
    pub icon_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionStatus {
    Success,
    Failed,
}

/// Anything that can answer a fetch request with media.
#[async_trait]
pub trait MediaSource: Send + Sync {
    fn id(&self) -> &str;

    fn info(&self) -> MediaSourceInfo;

    /// One request to the site root; reachable or not.
    async fn check_connection(&self) -> ConnectionStatus;

    /// Media for `request`, in discovery order.
    ///
    /// Ordinary scraping variance (no results, one subject failing) yields
    /// fewer records, never an error.
    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<MediaMatch>>;
}

/// The player that will consume resolved media.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Player {
    Vlc,
    AvKit,
    ExoPlayer,
    Other,
}

impl Player {
    /// Default player for the build target.
    pub fn current() -> Self {
        if cfg!(any(target_os = "macos", target_os = "ios")) {
            Self::AvKit
        } else if cfg!(target_os = "android") {
            Self::ExoPlayer
        } else {
            Self::Vlc
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vlc => "vlc",
            Self::AvKit => "avkit",
            Self::ExoPlayer => "exoplayer",
            Self::Other => "other",
        }
    }

    /// Whether an allow-list admits this player. An empty list admits any.
    pub fn is_allowed_by(&self, only_supports: &[String]) -> bool {
        only_supports.is_empty()
            || only_supports
                .iter()
                .any(|p| p.trim().eq_ignore_ascii_case(self.as_str()))
    }
}

impl FromStr for Player {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        [Self::Vlc, Self::AvKit, Self::ExoPlayer, Self::Other]
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AppError::config(format!("unknown player: {s}")))
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_allow_list() {
        let list = vec!["VLC".to_string(), "exoplayer".to_string()];
        assert!(Player::Vlc.is_allowed_by(&list));
        assert!(Player::ExoPlayer.is_allowed_by(&list));
        assert!(!Player::AvKit.is_allowed_by(&list));
        assert!(Player::AvKit.is_allowed_by(&[]));
    }

    #[test]
    fn test_player_from_str() {
        assert_eq!("AvKit".parse::<Player>().unwrap(), Player::AvKit);
        assert!("mpv".parse::<Player>().is_err());
        assert_eq!(Player::ExoPlayer.to_string(), "exoplayer");
    }
}
