// src/services/engine.rs

//! The three extraction phases and media assembly.
//!
//! Network phases (`search_subjects`, `search_episodes`) return [`Page`]s;
//! selection phases work on parsed documents and never touch the network.

use std::sync::Arc;

use scraper::Html;
use url::Url;

use crate::error::Result;
use crate::formats::{channel_format, subject_format};
use crate::models::{
    EpisodeRange, FileSize, Media, MediaProperties, MediaSourceKind, MediaSourceLocation, RawEpisode,
    ResourceLocation, SearchQuery, SelectorSearchConfig, SubjectStub, SubtitleKind,
};
use crate::services::video::{VideoMatcher, WebVideoMatch};
use crate::utils::directory_of;
use crate::utils::http::{DocumentFetcher, Page};
use crate::utils::text::{build_search_url, extract_resolution, guess_subtitle_languages, search_keyword};

/// Executes the search, subject and episode phases against one fetcher.
#[derive(Clone)]
pub struct SelectorMediaSourceEngine {
    fetcher: Arc<dyn DocumentFetcher>,
}

impl SelectorMediaSourceEngine {
    pub fn new(fetcher: Arc<dyn DocumentFetcher>) -> Self {
        Self { fetcher }
    }

    pub fn fetcher(&self) -> &dyn DocumentFetcher {
        self.fetcher.as_ref()
    }

    /// Phase 1: fetch the search page for `subject_name`.
    ///
    /// Returns the URL that was requested along with the page; a 404 is
    /// `Page::NotFound`, not an error.
    pub async fn search_subjects(
        &self,
        search_url: &str,
        subject_name: &str,
        use_only_first_word: bool,
        remove_special: bool,
    ) -> Result<(String, Page)> {
        let keyword = search_keyword(subject_name, remove_special, use_only_first_word);
        let final_url = build_search_url(search_url, &keyword);
        log::debug!("Searching '{}' at {}", keyword, final_url);
        let page = self.fetcher.fetch(&final_url).await?;
        Ok((final_url, page))
    }

    /// Phase 2: read subject stubs from a search page.
    ///
    /// `None` means the configured subject format cannot run; an empty list
    /// means the page had no usable entries.
    pub fn select_subjects(
        &self,
        document: &Html,
        page_url: &str,
        config: &SelectorSearchConfig,
    ) -> Option<Vec<SubjectStub>> {
        let format = subject_format(config);
        if !format.is_valid_config(config) {
            return None;
        }
        let Ok(base) = Url::parse(page_url) else {
            log::warn!("Cannot resolve links against {}", page_url);
            return Some(Vec::new());
        };
        Some(format.select(document, &base, config))
    }

    /// Phase 3 fetch: load a subject page.
    pub async fn search_episodes(&self, subject_url: &str) -> Result<Page> {
        self.fetcher.fetch(subject_url).await
    }

    /// Phase 3: read raw episodes from a subject page.
    ///
    /// Relative links resolve against the directory of `subject_url`.
    pub fn select_episodes(
        &self,
        document: &Html,
        subject_url: &str,
        config: &SelectorSearchConfig,
    ) -> Option<Vec<RawEpisode>> {
        let format = channel_format(config);
        if !format.is_valid_config(config) {
            return None;
        }
        let Some(base) = directory_of(subject_url) else {
            log::warn!("Cannot resolve links against {}", subject_url);
            return Some(Vec::new());
        };
        Some(format.select(document, &base, config))
    }

    /// Assemble media records. Episodes without a sort are dropped.
    pub fn select_media(
        &self,
        episodes: &[RawEpisode],
        config: &SelectorSearchConfig,
        query: &SearchQuery,
        media_source_id: &str,
        subject_name: &str,
    ) -> Vec<Media> {
        let media: Vec<Media> = episodes
            .iter()
            .filter_map(|episode| assemble(episode, config, media_source_id, subject_name))
            .collect();
        log::debug!(
            "'{}' ({}): {} of {} episodes usable",
            subject_name,
            query.subject_name,
            media.len(),
            episodes.len()
        );
        media
    }

    /// Classify a play URL under `config`'s video patterns.
    pub fn match_web_video(&self, url: &str, config: &SelectorSearchConfig) -> WebVideoMatch {
        VideoMatcher::new(&config.match_video).match_url(url)
    }
}

/// Parse and select in one synchronous step, so the non-`Send` document
/// never lives across an await point.
pub(crate) fn subjects_on_page(
    engine: &SelectorMediaSourceEngine,
    page_url: &str,
    body: &str,
    config: &SelectorSearchConfig,
) -> Option<Vec<SubjectStub>> {
    let document = Html::parse_document(body);
    engine.select_subjects(&document, page_url, config)
}

/// See [`subjects_on_page`].
pub(crate) fn episodes_on_page(
    engine: &SelectorMediaSourceEngine,
    subject_url: &str,
    body: &str,
    config: &SelectorSearchConfig,
) -> Option<Vec<RawEpisode>> {
    let document = Html::parse_document(body);
    engine.select_episodes(&document, subject_url, config)
}

fn assemble(
    episode: &RawEpisode,
    config: &SelectorSearchConfig,
    media_source_id: &str,
    subject_name: &str,
) -> Option<Media> {
    let sort = episode.episode_sort_or_ep.clone()?;
    let flags = &config.select_media;
    let channel = episode.channel.as_deref().filter(|c| !c.is_empty());

    let mut id_parts: Vec<String> = Vec::new();
    if flags.distinguish_subject_name {
        id_parts.push(subject_name.to_string());
    }
    if flags.distinguish_channel_name {
        id_parts.extend(channel.map(str::to_string));
    }
    if flags.distinguish_episode_name {
        id_parts.push(episode.name.clone());
    }
    if flags.distinguish_episode_sort {
        id_parts.push(sort.to_string());
    }
    if id_parts.is_empty() {
        id_parts.push(episode.play_url.clone());
    }

    let sort_label = sort.to_string();
    let mut title_parts: Vec<&str> = Vec::new();
    if flags.distinguish_subject_name {
        title_parts.push(subject_name);
    }
    if flags.distinguish_channel_name {
        title_parts.extend(channel);
    }
    // Episode names usually carry the sort already
    if flags.distinguish_episode_name {
        title_parts.push(&episode.name);
    } else if flags.distinguish_episode_sort {
        title_parts.push(&sort_label);
    }
    if title_parts.is_empty() {
        title_parts.push(&episode.name);
    }

    let mut subtitle_language_ids = guess_subtitle_languages(channel, &episode.name);
    if subtitle_language_ids.is_empty() {
        subtitle_language_ids.push(config.default_subtitle_language.clone());
    }
    let resolution = channel
        .and_then(extract_resolution)
        .or_else(|| extract_resolution(&episode.name))
        .unwrap_or_else(|| config.default_resolution.clone());

    Some(Media {
        media_id: format!("{}.{}", media_source_id, id_parts.join("-")),
        media_source_id: media_source_id.to_string(),
        original_url: episode.play_url.clone(),
        download_location: ResourceLocation::web_video(&episode.play_url),
        original_title: title_parts.join(" "),
        properties: MediaProperties {
            subject_name: subject_name.to_string(),
            episode_name: episode.name.clone(),
            subtitle_language_ids,
            resolution,
            alliance: channel.unwrap_or_default().to_string(),
            size: FileSize::UNSPECIFIED,
            subtitle_kind: SubtitleKind::Embedded,
        },
        episode_range: EpisodeRange::single(sort),
        location: MediaSourceLocation::Online,
        kind: MediaSourceKind::Web,
    })
}
