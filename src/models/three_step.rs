//! Config for sites crawled with fixed item selectors.

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::KEYWORD_PLACEHOLDER;

/// Selectors for one list of items (search results or episodes).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSelectors {
    pub item_selector: String,
    pub name_selector: String,

    #[serde(default = "defaults::url_selector")]
    pub url_selector: String,

    /// Episode lists only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_selector: Option<String>,
}

impl ItemSelectors {
    pub fn new(item: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            item_selector: item.into(),
            name_selector: name.into(),
            url_selector: defaults::url_selector(),
            channel_selector: None,
        }
    }
}

/// A site with a keyword search page and per-subject episode pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreeStepConfig {
    /// Site root, used for connection checks. Links resolve against the
    /// page they appear on.
    pub base_url: String,

    /// Search page template, must contain `{keyword}`
    pub search_url: String,

    #[serde(default = "defaults::subject")]
    pub subject: ItemSelectors,

    #[serde(default = "defaults::episode")]
    pub episode: ItemSelectors,

    #[serde(default = "defaults::subtitle_languages")]
    pub subtitle_languages: Vec<String>,

    #[serde(default = "defaults::resolution")]
    pub resolution: String,
}

impl ThreeStepConfig {
    pub fn new(base_url: impl Into<String>, search_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            search_url: search_url.into(),
            subject: defaults::subject(),
            episode: defaults::episode(),
            subtitle_languages: defaults::subtitle_languages(),
            resolution: defaults::resolution(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.base_url)?;
        if !self.search_url.contains(KEYWORD_PLACEHOLDER) {
            return Err(AppError::validation(format!(
                "search_url must contain {KEYWORD_PLACEHOLDER}: {}",
                self.search_url
            )));
        }
        Ok(())
    }
}

mod defaults {
    use super::ItemSelectors;

    pub fn url_selector() -> String {
        "a".into()
    }
    pub fn subject() -> ItemSelectors {
        ItemSelectors::new(".search-item", ".title")
    }
    pub fn episode() -> ItemSelectors {
        ItemSelectors::new(".episode-item", ".episode-title")
    }
    pub fn subtitle_languages() -> Vec<String> {
        vec!["CHS".into()]
    }
    pub fn resolution() -> String {
        "1080P".into()
    }
}
