//! Declarative site binding for a selector-driven media source.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::formats::{ChannelFormatId, SubjectFormatId};
use crate::utils::guess_base_url;

/// Placeholder substituted with the encoded search keyword.
pub const KEYWORD_PLACEHOLDER: &str = "{keyword}";

/// Built-in direct video pattern. A URL matched by its first branch is
/// rejected when another `http(s)://` follows the leading scheme.
pub const DEFAULT_MATCH_VIDEO_URL: &str =
    r"(^https?://.+(\.mp4|\.mkv|m3u8).*(\?.+)?)|(akamaized)|(bilivideo\.com)";

/// Everything needed to crawl one site: search, subject list, episode list
/// and video matching.
///
/// Treated as read-only once constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorSearchConfig {
    /// Search page URL template, must contain `{keyword}`
    pub search_url: String,

    /// Only search with the first word of the subject name
    #[serde(default = "defaults::yes")]
    pub search_use_only_first_word: bool,

    /// Replace punctuation in the subject name with spaces before searching
    #[serde(default = "defaults::yes")]
    pub search_remove_special: bool,

    /// How many of the request's subject names to try, in order
    #[serde(default = "defaults::subject_names_count")]
    pub search_use_subject_names_count: usize,

    /// Site root; guessed from `search_url` when empty
    #[serde(default)]
    pub raw_base_url: String,

    /// Minimum spacing between two searches
    #[serde(default = "defaults::request_interval")]
    pub request_interval_seconds: f64,

    #[serde(default)]
    pub subject_format_id: SubjectFormatId,

    #[serde(default)]
    pub subject_format_config: SubjectFormatConfig,

    #[serde(default)]
    pub subject_indexed_config: SubjectIndexedConfig,

    #[serde(default)]
    pub channel_format_id: ChannelFormatId,

    #[serde(default)]
    pub channel_format_config: ChannelFormatConfig,

    #[serde(default)]
    pub channel_grouped_config: ChannelGroupedConfig,

    #[serde(default = "defaults::resolution")]
    pub default_resolution: String,

    #[serde(default = "defaults::subtitle_language")]
    pub default_subtitle_language: String,

    /// Player identifiers able to play this source; empty means any
    #[serde(default)]
    pub only_supports_players: Vec<String>,

    #[serde(default = "defaults::yes")]
    pub filter_by_episode_sort: bool,

    #[serde(default = "defaults::yes")]
    pub filter_by_subject_name: bool,

    #[serde(default)]
    pub select_media: SelectMediaConfig,

    #[serde(default)]
    pub match_video: MatchVideoConfig,
}

impl SelectorSearchConfig {
    /// A config with the given search URL and every other field defaulted.
    pub fn new(search_url: impl Into<String>) -> Self {
        Self {
            search_url: search_url.into(),
            search_use_only_first_word: true,
            search_remove_special: true,
            search_use_subject_names_count: defaults::subject_names_count(),
            raw_base_url: String::new(),
            request_interval_seconds: defaults::request_interval(),
            subject_format_id: SubjectFormatId::default(),
            subject_format_config: SubjectFormatConfig::default(),
            subject_indexed_config: SubjectIndexedConfig::default(),
            channel_format_id: ChannelFormatId::default(),
            channel_format_config: ChannelFormatConfig::default(),
            channel_grouped_config: ChannelGroupedConfig::default(),
            default_resolution: defaults::resolution(),
            default_subtitle_language: defaults::subtitle_language(),
            only_supports_players: Vec::new(),
            filter_by_episode_sort: true,
            filter_by_subject_name: true,
            select_media: SelectMediaConfig::default(),
            match_video: MatchVideoConfig::default(),
        }
    }

    /// Site root used for connection probes.
    pub fn final_base_url(&self) -> String {
        if self.raw_base_url.trim().is_empty() {
            guess_base_url(&self.search_url)
        } else {
            self.raw_base_url.trim().to_string()
        }
    }

    pub fn request_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.request_interval_seconds).unwrap_or_default()
    }

    /// Reject configs that cannot drive a search at all.
    ///
    /// Selector gaps are not errors here; they only disable a phase.
    pub fn validate(&self) -> Result<()> {
        if self.search_url.trim().is_empty() {
            return Err(AppError::validation("search_url is empty"));
        }
        if !self.search_url.contains(KEYWORD_PLACEHOLDER) {
            return Err(AppError::validation(format!(
                "search_url must contain {KEYWORD_PLACEHOLDER}: {}",
                self.search_url
            )));
        }
        if !self.request_interval_seconds.is_finite() || self.request_interval_seconds < 0.0 {
            return Err(AppError::validation(
                "request_interval_seconds must be a non-negative number",
            ));
        }
        if self.search_use_subject_names_count == 0 {
            return Err(AppError::validation(
                "search_use_subject_names_count must be > 0",
            ));
        }
        if self.match_video.max_nested_hops > defaults::MAX_NESTED_HOPS_LIMIT {
            return Err(AppError::validation(format!(
                "match_video.max_nested_hops must be <= {}",
                defaults::MAX_NESTED_HOPS_LIMIT
            )));
        }
        Ok(())
    }
}

/// Selectors for the direct subject format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectFormatConfig {
    /// Selector for each subject container
    #[serde(default)]
    pub subject_selector: String,

    /// Selector for the name element inside a container
    #[serde(default)]
    pub name_selector: String,

    /// Selector for the link element inside a container
    #[serde(default)]
    pub url_selector: String,
}

impl SubjectFormatConfig {
    pub fn new(
        subject: impl Into<String>,
        name: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            subject_selector: subject.into(),
            name_selector: name.into(),
            url_selector: url.into(),
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.subject_selector.trim().is_empty()
            && !self.name_selector.trim().is_empty()
            && !self.url_selector.trim().is_empty()
    }
}

/// Selectors for the indexed subject format, where items carry their data
/// in attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectIndexedConfig {
    #[serde(default)]
    pub container_selector: String,

    #[serde(default)]
    pub item_selector: String,

    #[serde(default = "defaults::name_attr")]
    pub name_attr: String,

    #[serde(default = "defaults::url_attr")]
    pub url_attr: String,
}

impl Default for SubjectIndexedConfig {
    fn default() -> Self {
        Self {
            container_selector: String::new(),
            item_selector: String::new(),
            name_attr: defaults::name_attr(),
            url_attr: defaults::url_attr(),
        }
    }
}

impl SubjectIndexedConfig {
    pub fn is_valid(&self) -> bool {
        !self.container_selector.trim().is_empty()
            && !self.item_selector.trim().is_empty()
            && !self.url_attr.trim().is_empty()
    }
}

/// Selectors for the flat channel format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelFormatConfig {
    #[serde(default)]
    pub episode_selector: String,

    #[serde(default)]
    pub name_selector: String,

    #[serde(default)]
    pub url_selector: String,

    /// Optional per-episode channel label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_selector: Option<String>,
}

impl ChannelFormatConfig {
    pub fn new(
        episode: impl Into<String>,
        name: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            episode_selector: episode.into(),
            name_selector: name.into(),
            url_selector: url.into(),
            channel_selector: None,
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.episode_selector.trim().is_empty()
            && !self.name_selector.trim().is_empty()
            && !self.url_selector.trim().is_empty()
    }
}

/// Selectors for the grouped channel format: channel blocks each holding
/// their own episode list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelGroupedConfig {
    #[serde(default)]
    pub channel_selector: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_name_selector: Option<String>,

    #[serde(default)]
    pub episode_selector: String,

    #[serde(default)]
    pub episode_name_selector: String,

    #[serde(default)]
    pub episode_url_selector: String,
}

impl ChannelGroupedConfig {
    pub fn is_valid(&self) -> bool {
        !self.channel_selector.trim().is_empty()
            && !self.episode_selector.trim().is_empty()
            && !self.episode_name_selector.trim().is_empty()
            && !self.episode_url_selector.trim().is_empty()
    }
}

/// Which fields make a media id (and title) distinct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectMediaConfig {
    #[serde(default = "defaults::yes")]
    pub distinguish_subject_name: bool,

    #[serde(default = "defaults::yes")]
    pub distinguish_channel_name: bool,

    #[serde(default = "defaults::yes")]
    pub distinguish_episode_name: bool,

    #[serde(default = "defaults::yes")]
    pub distinguish_episode_sort: bool,
}

impl Default for SelectMediaConfig {
    fn default() -> Self {
        Self {
            distinguish_subject_name: true,
            distinguish_channel_name: true,
            distinguish_episode_name: true,
            distinguish_episode_sort: true,
        }
    }
}

/// Headers attached to the final video request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoHeaders {
    #[serde(default)]
    pub referer: String,

    #[serde(default = "defaults::video_user_agent")]
    pub user_agent: String,
}

impl Default for VideoHeaders {
    fn default() -> Self {
        Self {
            referer: String::new(),
            user_agent: defaults::video_user_agent(),
        }
    }
}

/// Two-regex video resolution settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchVideoConfig {
    #[serde(default = "defaults::yes")]
    pub enable_nested_url: bool,

    /// URLs matching this are intermediate pages to load
    #[serde(default = "defaults::match_nested_url")]
    pub match_nested_url: String,

    /// URLs matching this are playable; a `v` group narrows the match
    #[serde(default = "defaults::match_video_url")]
    pub match_video_url: String,

    #[serde(default = "defaults::cookies")]
    pub cookies: String,

    #[serde(default)]
    pub add_headers_to_video: VideoHeaders,

    /// Maximum nested pages followed after the play page
    #[serde(default = "defaults::max_nested_hops")]
    pub max_nested_hops: usize,
}

impl Default for MatchVideoConfig {
    fn default() -> Self {
        Self {
            enable_nested_url: true,
            match_nested_url: defaults::match_nested_url(),
            match_video_url: defaults::match_video_url(),
            cookies: defaults::cookies(),
            add_headers_to_video: VideoHeaders::default(),
            max_nested_hops: defaults::max_nested_hops(),
        }
    }
}

pub(crate) mod defaults {
    pub const MAX_NESTED_HOPS_LIMIT: usize = 8;

    pub fn yes() -> bool {
        true
    }
    pub fn subject_names_count() -> usize {
        1
    }
    pub fn request_interval() -> f64 {
        3.0
    }
    pub fn resolution() -> String {
        "1080P".into()
    }
    pub fn subtitle_language() -> String {
        "CHS".into()
    }
    pub fn name_attr() -> String {
        "title".into()
    }
    pub fn url_attr() -> String {
        "href".into()
    }
    pub fn video_user_agent() -> String {
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/58.0.3029.110 Safari/537.3".into()
    }
    pub fn match_nested_url() -> String {
        r"^.+(m3u8|vip|xigua\.php).+\?".into()
    }
    pub fn match_video_url() -> String {
        super::DEFAULT_MATCH_VIDEO_URL.into()
    }
    pub fn cookies() -> String {
        "quality=1080".into()
    }
    pub fn max_nested_hops() -> usize {
        2
    }
}
