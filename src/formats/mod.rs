//! Site layout formats and the registry that resolves them.
//!
//! Formats are closed sets: a config names one by id, the id is checked when
//! the config is loaded, and extraction dispatches through the enum.

pub mod channel;
pub mod query;
pub mod subject;

use std::fmt;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};

pub use channel::ChannelFormat;
pub use subject::SubjectFormat;

use crate::error::AppError;
use crate::models::SelectorSearchConfig;

/// Identifier of a subject format as written in config files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SubjectFormatId {
    #[default]
    #[serde(rename = "subject_format_a")]
    Direct,
    #[serde(rename = "subject_format_indexed")]
    Indexed,
}

impl SubjectFormatId {
    pub const ALL: [Self; 2] = [Self::Direct, Self::Indexed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "subject_format_a",
            Self::Indexed => "subject_format_indexed",
        }
    }
}

impl FromStr for SubjectFormatId {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| AppError::config(format!("unknown subject format: {s}")))
    }
}

impl fmt::Display for SubjectFormatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier of a channel format as written in config files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ChannelFormatId {
    #[default]
    #[serde(rename = "channel_format_no_channel")]
    Flat,
    #[serde(rename = "channel_format_index_grouped")]
    Grouped,
}

impl ChannelFormatId {
    pub const ALL: [Self; 2] = [Self::Flat, Self::Grouped];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Flat => "channel_format_no_channel",
            Self::Grouped => "channel_format_index_grouped",
        }
    }
}

impl FromStr for ChannelFormatId {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| AppError::config(format!("unknown channel format: {s}")))
    }
}

impl fmt::Display for ChannelFormatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<SubjectFormatId> for SubjectFormat {
    fn from(id: SubjectFormatId) -> Self {
        match id {
            SubjectFormatId::Direct => Self::Direct,
            SubjectFormatId::Indexed => Self::Indexed,
        }
    }
}

impl From<ChannelFormatId> for ChannelFormat {
    fn from(id: ChannelFormatId) -> Self {
        match id {
            ChannelFormatId::Flat => Self::Flat,
            ChannelFormatId::Grouped => Self::Grouped,
        }
    }
}

/// Subject format configured for `config`.
pub fn subject_format(config: &SelectorSearchConfig) -> SubjectFormat {
    config.subject_format_id.into()
}

/// Channel format configured for `config`.
pub fn channel_format(config: &SelectorSearchConfig) -> ChannelFormat {
    config.channel_format_id.into()
}

/// Every known subject format id.
pub fn list_subject_formats() -> &'static [SubjectFormatId] {
    &SubjectFormatId::ALL
}

/// Every known channel format id.
pub fn list_channel_formats() -> &'static [ChannelFormatId] {
    &ChannelFormatId::ALL
}

/// Non-fatal problems with `config`: phases its formats cannot run and
/// video patterns that do not compile.
pub fn check(config: &SelectorSearchConfig) -> Vec<String> {
    let mut issues = Vec::new();

    if !subject_format(config).is_valid_config(config) {
        issues.push(format!(
            "{}: subject selectors missing or unparsable, subject phase disabled",
            config.subject_format_id
        ));
    }
    if !channel_format(config).is_valid_config(config) {
        issues.push(format!(
            "{}: episode selectors missing or unparsable, episode phase disabled",
            config.channel_format_id
        ));
    }

    let video = &config.match_video;
    if let Err(e) = Regex::new(&video.match_video_url) {
        issues.push(format!("match_video_url does not compile: {e}"));
    }
    if video.enable_nested_url {
        if let Err(e) = Regex::new(&video.match_nested_url) {
            issues.push(format!("match_nested_url does not compile: {e}"));
        }
    }
    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChannelFormatConfig, SubjectFormatConfig};

    fn complete_config() -> SelectorSearchConfig {
        let mut config = SelectorSearchConfig::new("https://x.test/s/{keyword}");
        config.subject_format_config = SubjectFormatConfig::new(".item", ".t", "a");
        config.channel_format_config = ChannelFormatConfig::new(".ep", "a", "a");
        config
    }

    #[test]
    fn test_ids_round_trip_through_strings() {
        for id in list_subject_formats() {
            assert_eq!(id.as_str().parse::<SubjectFormatId>().unwrap(), *id);
        }
        for id in list_channel_formats() {
            assert_eq!(id.to_string().parse::<ChannelFormatId>().unwrap(), *id);
        }
    }

    #[test]
    fn test_unknown_id_is_config_error() {
        assert!(matches!(
            "subject_format_z".parse::<SubjectFormatId>(),
            Err(AppError::Config(_))
        ));
        assert!("grouped".parse::<ChannelFormatId>().is_err());
    }

    #[test]
    fn test_registry_resolves_configured_formats() {
        let mut config = complete_config();
        assert_eq!(subject_format(&config), SubjectFormat::Direct);
        config.channel_format_id = ChannelFormatId::Grouped;
        assert_eq!(channel_format(&config), ChannelFormat::Grouped);
    }

    #[test]
    fn test_check_complete_config_is_clean() {
        assert!(check(&complete_config()).is_empty());
    }

    #[test]
    fn test_check_reports_gaps_and_bad_patterns() {
        let mut config = complete_config();
        config.channel_format_id = ChannelFormatId::Grouped;
        config.match_video.match_video_url = "(unclosed".into();

        let issues = check(&config);
        assert_eq!(issues.len(), 2);
        assert!(issues[0].starts_with("channel_format_index_grouped"));
        assert!(issues[1].contains("match_video_url"));
    }
}
