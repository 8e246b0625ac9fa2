// src/services/three_step.rs

//! Three-step sources: search, episode list, media, with retries.
//!
//! A [`ThreeStepSite`] knows how to build a search URL and read two kinds of
//! page; [`ThreeStepSource`] does the fetching, retrying and assembly.

use std::sync::Arc;

use async_trait::async_trait;
use scraper::{Html, Selector};
use url::Url;

use crate::error::Result;
use crate::formats::query::{compile, link_of, text_of};
use crate::models::{
    EpisodeRange, EpisodeSort, FetchRequest, FileSize, ItemSelectors, Media, MediaMatch, MediaProperties,
    MediaSourceKind, MediaSourceLocation, RawEpisode, ResourceLocation, SubjectStub, SubtitleKind,
    ThreeStepConfig,
};
use crate::services::filters::{FilterContext, MediaFilter};
use crate::services::{ConnectionStatus, MediaSource, MediaSourceInfo};
use crate::utils::absolute_url;
use crate::utils::http::{DocumentFetcher, Page};
use crate::utils::retry::RetryPolicy;
use crate::utils::text::{build_search_url, content_id, is_possibly_movie, strip_quality_tags};

/// Site-specific parsing for a three-step source.
pub trait ThreeStepSite: Send + Sync {
    fn base_url(&self) -> &str;

    /// Search page for `name`, or `None` if the site cannot search it.
    fn search_url(&self, name: &str) -> Option<String>;

    fn parse_search(&self, document: &Html, page_url: &Url) -> Vec<SubjectStub>;

    /// Episodes on a subject page. `episode_sort_or_ep` is left for the
    /// source to fill in.
    fn parse_episodes(&self, document: &Html, page_url: &Url) -> Vec<RawEpisode>;
}

/// A site described by [`ThreeStepConfig`] selectors.
#[derive(Debug, Clone)]
pub struct SimpleSite {
    config: ThreeStepConfig,
}

impl SimpleSite {
    pub fn new(config: ThreeStepConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ThreeStepConfig {
        &self.config
    }
}

struct Compiled {
    item: Selector,
    name: Selector,
    url: Selector,
    channel: Option<Selector>,
}

fn compile_items(selectors: &ItemSelectors) -> Option<Compiled> {
    Some(Compiled {
        item: compile(&selectors.item_selector)?,
        name: compile(&selectors.name_selector)?,
        url: compile(&selectors.url_selector)?,
        channel: selectors
            .channel_selector
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .and_then(compile),
    })
}

impl ThreeStepSite for SimpleSite {
    fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn search_url(&self, name: &str) -> Option<String> {
        let name = name.trim();
        (!name.is_empty()).then(|| build_search_url(&self.config.search_url, name))
    }

    fn parse_search(&self, document: &Html, page_url: &Url) -> Vec<SubjectStub> {
        let Some(sel) = compile_items(&self.config.subject) else {
            return Vec::new();
        };
        document
            .select(&sel.item)
            .enumerate()
            .filter_map(|(index, item)| {
                let name = text_of(&item, &sel.name)?;
                let partial_url = link_of(&item, &sel.url)?;
                let full_url = absolute_url(page_url, &partial_url)?;
                Some(SubjectStub {
                    internal_id: content_id("", index, &name, &partial_url),
                    name,
                    full_url,
                    partial_url,
                })
            })
            .collect()
    }

    fn parse_episodes(&self, document: &Html, page_url: &Url) -> Vec<RawEpisode> {
        let Some(sel) = compile_items(&self.config.episode) else {
            return Vec::new();
        };
        document
            .select(&sel.item)
            .filter_map(|item| {
                let name = text_of(&item, &sel.name)?;
                let play_url = absolute_url(page_url, &link_of(&item, &sel.url)?)?;
                let channel = sel.channel.as_ref().and_then(|c| text_of(&item, c));
                Some(RawEpisode {
                    channel,
                    name,
                    episode_sort_or_ep: None,
                    play_url,
                })
            })
            .collect()
    }
}

/// Sort from an episode title: the first number after dropping a `第` prefix,
/// a `集` suffix and any quality tag, otherwise the cleaned title as a special.
pub fn three_step_sort(name: &str) -> EpisodeSort {
    let clean = name.trim().trim_start_matches('第').trim_end_matches('集');
    strip_quality_tags(clean)
        .split(|c: char| !c.is_ascii_digit())
        .find(|digits| !digits.is_empty())
        .and_then(|digits| digits.parse::<u32>().ok())
        .map(EpisodeSort::Normal)
        .unwrap_or_else(|| EpisodeSort::Special(clean.to_string()))
}

/// Media source over a [`ThreeStepSite`], retrying the search and episode
/// fetches.
pub struct ThreeStepSource<S: ThreeStepSite> {
    id: String,
    site: S,
    fetcher: Arc<dyn DocumentFetcher>,
    retry: RetryPolicy,
    subtitle_languages: Vec<String>,
    resolution: String,
}

impl ThreeStepSource<SimpleSite> {
    pub fn from_config(
        id: impl Into<String>,
        config: ThreeStepConfig,
        fetcher: Arc<dyn DocumentFetcher>,
        retry: RetryPolicy,
    ) -> Result<Self> {
        let subtitle_languages = config.subtitle_languages.clone();
        let resolution = config.resolution.clone();
        Ok(Self {
            subtitle_languages,
            resolution,
            ..Self::new(id, SimpleSite::new(config)?, fetcher, retry)
        })
    }
}

impl<S: ThreeStepSite> ThreeStepSource<S> {
    pub fn new(id: impl Into<String>, site: S, fetcher: Arc<dyn DocumentFetcher>, retry: RetryPolicy) -> Self {
        Self {
            id: id.into(),
            site,
            fetcher,
            retry,
            subtitle_languages: vec!["CHS".to_string()],
            resolution: "1080P".to_string(),
        }
    }

    pub fn site(&self) -> &S {
        &self.site
    }

    async fn search_once(&self, name: &str) -> Result<Vec<SubjectStub>> {
        let Some(url) = self.site.search_url(name) else {
            return Ok(Vec::new());
        };
        let Page::Found { url, body } = self.fetcher.fetch(&url).await? else {
            return Ok(Vec::new());
        };
        Ok(self.parse(&url, &body, |doc, base| self.site.parse_search(doc, base)))
    }

    async fn episodes_once(&self, subject: &SubjectStub) -> Result<Vec<RawEpisode>> {
        let Page::Found { url, body } = self.fetcher.fetch(&subject.full_url).await? else {
            return Ok(Vec::new());
        };
        Ok(self.parse(&url, &body, |doc, base| self.site.parse_episodes(doc, base)))
    }

    fn parse<T>(&self, page_url: &str, body: &str, read: impl FnOnce(&Html, &Url) -> Vec<T>) -> Vec<T> {
        let Ok(base) = Url::parse(page_url) else {
            return Vec::new();
        };
        let document = Html::parse_document(body);
        read(&document, &base)
    }

    /// Search with retries; exhausted retries yield no subjects.
    pub async fn search(&self, name: &str) -> Vec<SubjectStub> {
        let label = format!("[{}] search '{}'", self.id, name);
        self.retry
            .run(&label, || self.search_once(name))
            .await
            .unwrap_or_default()
    }

    /// Episode list with retries; exhausted retries yield no episodes.
    pub async fn episodes(&self, subject: &SubjectStub) -> Vec<RawEpisode> {
        let label = format!("[{}] episodes of '{}'", self.id, subject.name);
        self.retry
            .run(&label, || self.episodes_once(subject))
            .await
            .unwrap_or_default()
    }

    pub fn create_media(&self, subject: &SubjectStub, episode: &RawEpisode) -> Media {
        let sort = three_step_sort(&episode.name);
        let channel = episode.channel.as_deref().filter(|c| !c.is_empty());
        let suffix = channel.map(|c| format!("-{c}")).unwrap_or_default();
        let range = if sort.is_special() && is_possibly_movie(&episode.name) {
            EpisodeRange::single(EpisodeSort::Normal(1))
        } else {
            EpisodeRange::single(sort.clone())
        };

        Media {
            media_id: format!("{}.{}-{}{}", self.id, subject.internal_id, sort, suffix),
            media_source_id: self.id.clone(),
            original_url: subject.full_url.clone(),
            download_location: ResourceLocation::web_video(&episode.play_url),
            original_title: format!("{} {} {}", subject.name, episode.name, channel.unwrap_or_default())
                .trim()
                .to_string(),
            properties: MediaProperties {
                subject_name: subject.name.clone(),
                episode_name: episode.name.clone(),
                subtitle_language_ids: self.subtitle_languages.clone(),
                resolution: self.resolution.clone(),
                alliance: self.id.clone(),
                size: FileSize::UNSPECIFIED,
                subtitle_kind: SubtitleKind::Embedded,
            },
            episode_range: range,
            location: MediaSourceLocation::Online,
            kind: MediaSourceKind::Web,
        }
    }
}

#[async_trait]
impl<S: ThreeStepSite> MediaSource for ThreeStepSource<S> {
    fn id(&self) -> &str {
        &self.id
    }

    fn info(&self) -> MediaSourceInfo {
        MediaSourceInfo {
            display_name: self.id.clone(),
            description: "Three-step web source".to_string(),
            website_url: self.site.base_url().to_string(),
            icon_url: String::new(),
        }
    }

    /// Only a success status counts as reachable here.
    async fn check_connection(&self) -> ConnectionStatus {
        match self.fetcher.probe(self.site.base_url()).await {
            Ok(status) if (200..300).contains(&status) => ConnectionStatus::Success,
            Ok(status) => {
                log::warn!("[{}] {} answered {}", self.id, self.site.base_url(), status);
                ConnectionStatus::Failed
            }
            Err(e) => {
                log::warn!("[{}] {} unreachable: {}", self.id, self.site.base_url(), e);
                ConnectionStatus::Failed
            }
        }
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<MediaMatch>> {
        let context = FilterContext::from_request(request);
        let mut matches = Vec::new();

        for name in &request.subject_names {
            for subject in self.search(name).await {
                let episodes = self.episodes(&subject).await;
                log::info!(
                    "[{}] '{}': {} episodes for {}",
                    self.id,
                    name,
                    episodes.len(),
                    subject.name
                );
                for episode in &episodes {
                    let media = self.create_media(&subject, episode);
                    if MediaFilter::EpisodeMatches.accepts(&(&media).into(), &context)
                        || is_possibly_movie(&media.original_title)
                    {
                        matches.push(MediaMatch::fuzzy(media));
                    }
                }
            }
        }
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::utils::http::testing::MockFetcher;

    const SEARCH: &str = r#"
        <div class="search-item"><h3 class="title">Frieren</h3><a href="/bangumi/7.html">go</a></div>
        <div class="search-item"><a href="/bangumi/8.html">untitled</a></div>
    "#;

    const EPISODES: &str = r#"
        <li class="episode-item"><span class="episode-title">第1集</span><a href="/play/7-1.html">p</a></li>
        <li class="episode-item"><span class="episode-title">第2集</span><a href="/play/7-2.html">p</a><em>线路二</em></li>
        <li class="episode-item"><span class="episode-title">简日 1080P</span><a href="/play/7-m.html">p</a></li>
    "#;

    fn site_config() -> ThreeStepConfig {
        let mut config = ThreeStepConfig::new("https://y.test", "https://y.test/search?q={keyword}");
        config.episode.channel_selector = Some("em".into());
        config
    }

    fn source(fetcher: Arc<MockFetcher>) -> ThreeStepSource<SimpleSite> {
        ThreeStepSource::from_config(
            "y",
            site_config(),
            fetcher,
            RetryPolicy::new(3, Duration::from_secs(1)),
        )
        .unwrap()
    }

    fn pages() -> MockFetcher {
        MockFetcher::new()
            .page("https://y.test/search?q=Frieren", SEARCH)
            .page("https://y.test/bangumi/7.html", EPISODES)
    }

    #[test]
    fn test_three_step_sort() {
        assert_eq!(three_step_sort("第12集"), EpisodeSort::Normal(12));
        assert_eq!(three_step_sort("EP 03 [1080P]"), EpisodeSort::Normal(3));
        assert_eq!(three_step_sort("剧场版"), EpisodeSort::Special("剧场版".into()));
        assert_eq!(
            three_step_sort("简日 1080P"),
            EpisodeSort::Special("简日 1080P".into())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_assembles_and_filters() {
        let source = source(Arc::new(pages()));
        let request = FetchRequest::new(["Frieren"]).with_episode(EpisodeSort::Normal(2));

        let matches = source.fetch(&request).await.unwrap();
        let titles: Vec<_> = matches.iter().map(|m| m.media.original_title.as_str()).collect();
        // Episode 2 by number, the movie-like release by its name
        assert_eq!(titles, vec!["Frieren 第2集 线路二", "Frieren 简日 1080P"]);

        let ep2 = &matches[0].media;
        assert!(ep2.media_id.starts_with("y.0_"));
        assert!(ep2.media_id.ends_with("-2-线路二"));
        assert_eq!(ep2.original_url, "https://y.test/bangumi/7.html");
        assert_eq!(ep2.download_location.uri(), "https://y.test/play/7-2.html");
        assert_eq!(ep2.properties.alliance, "y");

        let movie = &matches[1].media;
        assert_eq!(movie.episode_range, EpisodeRange::single(EpisodeSort::Normal(1)));
    }

    #[tokio::test]
    async fn test_links_resolve_against_their_page() {
        let config = ThreeStepConfig::new("https://www.y.test", "https://y.test/find/?q={keyword}");
        let fetcher = Arc::new(MockFetcher::new().page(
            "https://y.test/find/?q=Frieren",
            r#"<div class="search-item"><h3 class="title">Frieren</h3><a href="bangumi/7.html">go</a></div>"#,
        ));
        let source = ThreeStepSource::from_config("y", config, fetcher, RetryPolicy::default()).unwrap();

        let subjects = source.search("Frieren").await;
        assert_eq!(subjects[0].full_url, "https://y.test/find/bangumi/7.html");
        assert_eq!(subjects[0].partial_url, "bangumi/7.html");
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_transient_search_failures() {
        let fetcher = Arc::new(pages().failing("https://y.test/search?q=Frieren", 2));
        let source = source(fetcher.clone());

        let subjects = source.search("Frieren").await;
        assert_eq!(subjects.len(), 1);
        assert_eq!(fetcher.request_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_are_isolated() {
        let fetcher = Arc::new(
            pages()
                .page("https://y.test/search?q=Himmel", SEARCH)
                .failing("https://y.test/search?q=Frieren", 5),
        );
        let source = source(fetcher.clone());

        let matches = source
            .fetch(&FetchRequest::new(["Frieren", "Himmel"]))
            .await
            .unwrap();
        // Frieren: 3 failed attempts. Himmel: search + episode page.
        assert_eq!(fetcher.request_count(), 5);
        assert_eq!(matches.len(), 3);
    }

    #[tokio::test]
    async fn test_check_connection_needs_success_status() {
        let source = source(Arc::new(MockFetcher::new()));
        assert_eq!(source.check_connection().await, ConnectionStatus::Failed);

        let source = source_with_root();
        assert_eq!(source.check_connection().await, ConnectionStatus::Success);
    }

    fn source_with_root() -> ThreeStepSource<SimpleSite> {
        source(Arc::new(MockFetcher::new().page("https://y.test", "<html></html>")))
    }
}
