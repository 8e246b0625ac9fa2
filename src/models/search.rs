//! Search inputs and intermediate crawl records.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::models::EpisodeSort;

/// Caller request: which subject (under any of its names) and which episode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchRequest {
    /// Candidate names in preference order
    pub subject_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode_sort: Option<EpisodeSort>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode_ep: Option<EpisodeSort>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode_name: Option<String>,
}

impl FetchRequest {
    pub fn new(subject_names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            subject_names: subject_names.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_episode(mut self, sort: EpisodeSort) -> Self {
        self.episode_sort = Some(sort);
        self
    }

    /// The query for one subject-name iteration.
    pub fn query_for(&self, subject_name: &str) -> SearchQuery {
        SearchQuery {
            subject_name: subject_name.to_string(),
            all_subject_names: self.subject_names.iter().cloned().collect(),
            episode_sort: self
                .episode_sort
                .clone()
                .unwrap_or(EpisodeSort::Normal(1)),
            episode_ep: self.episode_ep.clone(),
            episode_name: self.episode_name.clone(),
        }
    }
}

/// One search attempt for one subject name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub subject_name: String,
    pub all_subject_names: BTreeSet<String>,
    pub episode_sort: EpisodeSort,
    pub episode_ep: Option<EpisodeSort>,
    pub episode_name: Option<String>,
}

/// A catalog entry found on a search or category page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectStub {
    /// Unique within the page it was read from
    pub internal_id: String,
    pub name: String,
    /// Absolute URL of the subject page
    pub full_url: String,
    /// The href exactly as found in the markup
    pub partial_url: String,
}

/// One episode link read from a subject page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEpisode {
    pub channel: Option<String>,
    pub name: String,
    pub episode_sort_or_ep: Option<EpisodeSort>,
    /// Absolute URL of the play page
    pub play_url: String,
}
