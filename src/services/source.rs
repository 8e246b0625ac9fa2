// src/services/source.rs

//! Selector-configured media source.
//!
//! Binds one engine to one [`SelectorSearchConfig`] and runs the full
//! search → subjects → episodes → media flow for a fetch request.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};

use crate::error::Result;
use crate::models::{FetchRequest, Media, MediaMatch, SearchQuery, SelectorSearchConfig, SubjectStub};
use crate::services::engine::{episodes_on_page, subjects_on_page};
use crate::services::filters::{FilterContext, apply_filters, episode_filters, subject_filters};
use crate::services::{
    ConnectionStatus, MediaSource, MediaSourceInfo, Player, SelectorMediaSourceEngine, VideoResolver,
};
use crate::utils::http::{DocumentFetcher, Page};
use crate::utils::rate_limit::RateLimiter;

const DEFAULT_MAX_CONCURRENT: usize = 4;

/// A media source driven entirely by a selector config.
pub struct SelectorMediaSource {
    id: String,
    config: SelectorSearchConfig,
    engine: SelectorMediaSourceEngine,
    limiter: RateLimiter,
    player: Player,
    max_concurrent: usize,
}

impl SelectorMediaSource {
    /// Create a source; fails if the config cannot drive a search at all.
    pub fn new(
        id: impl Into<String>,
        config: SelectorSearchConfig,
        fetcher: Arc<dyn DocumentFetcher>,
    ) -> Result<Self> {
        config.validate()?;
        for issue in crate::formats::check(&config) {
            log::warn!("{}", issue);
        }
        Ok(Self {
            id: id.into(),
            limiter: RateLimiter::new(config.request_interval()),
            config,
            engine: SelectorMediaSourceEngine::new(fetcher),
            player: Player::current(),
            max_concurrent: DEFAULT_MAX_CONCURRENT,
        })
    }

    pub fn with_player(mut self, player: Player) -> Self {
        self.player = player;
        self
    }

    /// Bound on subject pages fetched at once within one search.
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    pub fn config(&self) -> &SelectorSearchConfig {
        &self.config
    }

    pub fn engine(&self) -> &SelectorMediaSourceEngine {
        &self.engine
    }

    pub fn supports_player(&self) -> bool {
        self.player.is_allowed_by(&self.config.only_supports_players)
    }

    pub fn video_resolver(&self) -> VideoResolver {
        VideoResolver::new(&self.config.match_video)
    }

    /// Run all phases for one subject name.
    ///
    /// Waits for the rate limiter before the search request. A failed search
    /// is an error; a failed subject page only drops that subject.
    pub async fn search(&self, query: &SearchQuery, context: &FilterContext) -> Result<Vec<Media>> {
        self.limiter.acquire().await;

        let config = &self.config;
        let (search_url, page) = self
            .engine
            .search_subjects(
                &config.search_url,
                &query.subject_name,
                config.search_use_only_first_word,
                config.search_remove_special,
            )
            .await?;

        let Page::Found { url, body } = page else {
            log::info!("[{}] No results for '{}' ({})", self.id, query.subject_name, search_url);
            return Ok(Vec::new());
        };
        let Some(subjects) = subjects_on_page(&self.engine, &url, &body, config) else {
            log::warn!("[{}] Subject format not usable, skipping search", self.id);
            return Ok(Vec::new());
        };

        let found = subjects.len();
        let subjects = apply_filters(subjects, &subject_filters(config), context);
        log::info!(
            "[{}] '{}': {} subjects, {} after name filter",
            self.id,
            query.subject_name,
            found,
            subjects.len()
        );

        let media: Vec<Media> = stream::iter(subjects)
            .map(|subject| async move { self.media_for_subject(&subject, query).await })
            .buffered(self.max_concurrent)
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .flatten()
            .collect();

        Ok(apply_filters(media, &episode_filters(config), context))
    }

    async fn media_for_subject(&self, subject: &SubjectStub, query: &SearchQuery) -> Vec<Media> {
        let page = match self.engine.search_episodes(&subject.full_url).await {
            Ok(page) => page,
            Err(e) => {
                log::warn!("[{}] Subject '{}' failed: {}", self.id, subject.name, e);
                return Vec::new();
            }
        };
        let Page::Found { url, body } = page else {
            log::debug!("[{}] Subject page gone: {}", self.id, subject.full_url);
            return Vec::new();
        };
        let Some(episodes) = episodes_on_page(&self.engine, &url, &body, &self.config) else {
            log::warn!("[{}] Channel format not usable, skipping episodes", self.id);
            return Vec::new();
        };
        self.engine
            .select_media(&episodes, &self.config, query, &self.id, &subject.name)
    }
}

#[async_trait]
impl MediaSource for SelectorMediaSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn info(&self) -> MediaSourceInfo {
        MediaSourceInfo {
            display_name: format!("Selector-{}", self.id),
            description: "CSS selector media source".to_string(),
            website_url: self.config.final_base_url(),
            icon_url: String::new(),
        }
    }

    async fn check_connection(&self) -> ConnectionStatus {
        let url = self.config.final_base_url();
        match self.engine.fetcher().probe(&url).await {
            Ok(status) => {
                log::debug!("[{}] {} answered {}", self.id, url, status);
                ConnectionStatus::Success
            }
            Err(e) => {
                log::warn!("[{}] {} unreachable: {}", self.id, url, e);
                ConnectionStatus::Failed
            }
        }
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<MediaMatch>> {
        if !self.supports_player() {
            log::info!(
                "[{}] Player {} not in {:?}, skipping",
                self.id,
                self.player,
                self.config.only_supports_players
            );
            return Ok(Vec::new());
        }

        let context = FilterContext::from_request(request);
        let mut seen = HashSet::new();
        let mut matches = Vec::new();

        for name in request
            .subject_names
            .iter()
            .take(self.config.search_use_subject_names_count)
        {
            let query = request.query_for(name);
            match self.search(&query, &context).await {
                Ok(media) => matches.extend(
                    media
                        .into_iter()
                        .filter(|m| seen.insert(m.media_id.clone()))
                        .map(MediaMatch::fuzzy),
                ),
                Err(e) => log::warn!("[{}] Search for '{}' failed: {}", self.id, name, e),
            }
        }
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::models::{ChannelFormatConfig, EpisodeSort, MatchKind, SubjectFormatConfig};
    use crate::utils::http::testing::MockFetcher;

    const SEARCH_PAGE: &str = r#"
        <div class="item"><span class="t">Frieren</span><a href="/anime/1/index.html">go</a></div>
        <div class="item"><a href="/anime/2/index.html">missing title</a></div>
        <div class="item"><span class="t">Frieren Movie</span><a href="/anime/3/index.html">go</a></div>
        <div class="item"><span class="t">Dungeon Meshi</span><a href="/anime/4/index.html">go</a></div>
    "#;

    const SUBJECT_1: &str = r#"
        <ul>
          <li class="ep"><a href="ep1.html">第1集</a></li>
          <li class="ep"><a href="ep2.html">第2集</a></li>
          <li class="ep"><a href="pv.html">PV</a></li>
        </ul>
    "#;

    const SUBJECT_3: &str = r#"<li class="ep"><a href="full.html">01</a></li>"#;

    fn config() -> SelectorSearchConfig {
        let mut config = SelectorSearchConfig::new("https://x.test/s/{keyword}");
        config.subject_format_config = SubjectFormatConfig::new(".item", ".t", "a");
        config.channel_format_config = ChannelFormatConfig::new(".ep", "a", "a");
        config.request_interval_seconds = 2.0;
        config
    }

    fn fetcher() -> Arc<MockFetcher> {
        Arc::new(
            MockFetcher::new()
                .page("https://x.test/s/Frieren", SEARCH_PAGE)
                .page("https://x.test/anime/1/index.html", SUBJECT_1)
                .page("https://x.test/anime/3/index.html", SUBJECT_3),
        )
    }

    fn source(config: SelectorSearchConfig, fetcher: Arc<MockFetcher>) -> SelectorMediaSource {
        SelectorMediaSource::new("x", config, fetcher)
            .unwrap()
            .with_player(Player::Vlc)
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_end_to_end() {
        let fetcher = fetcher();
        let source = source(config(), fetcher.clone());

        let matches = source.fetch(&FetchRequest::new(["Frieren"])).await.unwrap();

        let ids: Vec<_> = matches.iter().map(|m| m.media.media_id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "x.Frieren-第1集-1",
                "x.Frieren-第2集-2",
                "x.Frieren Movie-01-1",
            ]
        );
        assert!(matches.iter().all(|m| m.kind == MatchKind::Fuzzy));
        assert_eq!(
            matches[0].media.original_url,
            "https://x.test/anime/1/ep1.html"
        );
        // Dungeon Meshi is filtered by name before its page is requested
        assert!(!fetcher
            .requests()
            .contains(&"https://x.test/anime/4/index.html".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_filters_requested_episode() {
        let source = source(config(), fetcher());
        let request = FetchRequest::new(["Frieren"]).with_episode(EpisodeSort::Normal(2));

        let matches = source.fetch(&request).await.unwrap();
        let ids: Vec<_> = matches.iter().map(|m| m.media.media_id.as_str()).collect();
        assert_eq!(ids, vec!["x.Frieren-第2集-2"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsupported_player_makes_no_requests() {
        let fetcher = fetcher();
        let mut config = config();
        config.only_supports_players = vec!["exoplayer".into()];
        let source = source(config, fetcher.clone());

        let matches = source.fetch(&FetchRequest::new(["Frieren"])).await.unwrap();
        assert!(matches.is_empty());
        assert_eq!(fetcher.request_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_found_search_is_empty_not_error() {
        let fetcher = Arc::new(MockFetcher::new());
        let source = source(config(), fetcher.clone());
        let matches = source.fetch(&FetchRequest::new(["Nothing"])).await.unwrap();
        assert!(matches.is_empty());
        assert_eq!(fetcher.requests(), vec!["https://x.test/s/Nothing".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_subject_failure_is_isolated() {
        let fetcher = Arc::new(
            MockFetcher::new()
                .page("https://x.test/s/Frieren", SEARCH_PAGE)
                .page("https://x.test/anime/1/index.html", SUBJECT_1)
                .page("https://x.test/anime/3/index.html", SUBJECT_3)
                .failing("https://x.test/anime/1/index.html", 1),
        );
        let source = source(config(), fetcher);

        let matches = source.fetch(&FetchRequest::new(["Frieren"])).await.unwrap();
        let ids: Vec<_> = matches.iter().map(|m| m.media.media_id.as_str()).collect();
        assert_eq!(ids, vec!["x.Frieren Movie-01-1"]);
    }

    #[tokio::test]
    async fn test_searches_are_rate_limited() {
        let fetcher = fetcher();
        let mut config = config();
        config.search_use_subject_names_count = 2;
        config.request_interval_seconds = 0.2;
        let source = source(config, fetcher);

        let start = std::time::Instant::now();
        let request = FetchRequest::new(["Frieren", "Frieren"]);
        source.fetch(&request).await.unwrap();
        assert!(start.elapsed() + Duration::from_millis(10) >= Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_only_configured_name_count_is_searched() {
        let fetcher = fetcher();
        let source = source(config(), fetcher.clone());
        source
            .fetch(&FetchRequest::new(["Frieren", "Sousou no Frieren"]))
            .await
            .unwrap();
        assert!(fetcher.requests().iter().all(|u| !u.contains("Sousou")));
    }

    #[tokio::test]
    async fn test_video_resolver_follows_media_url() {
        let fetcher = Arc::new(MockFetcher::new().page(
            "https://x.test/anime/1/ep1.html",
            r#"<script>var player = {"url":"https:\/\/cdn.test\/1.m3u8"};</script>"#,
        ));
        let source = source(config(), fetcher.clone());

        let video = source
            .video_resolver()
            .resolve(fetcher.as_ref(), "https://x.test/anime/1/ep1.html")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(video.url, "https://cdn.test/1.m3u8");
    }

    #[tokio::test]
    async fn test_check_connection_any_status_is_reachable() {
        let source = source(config(), Arc::new(MockFetcher::new()));
        assert_eq!(source.check_connection().await, ConnectionStatus::Success);
    }

    #[test]
    fn test_unusable_config_is_rejected() {
        let result = SelectorMediaSource::new(
            "x",
            SelectorSearchConfig::new("https://x.test/search"),
            Arc::new(MockFetcher::new()),
        );
        assert!(result.is_err());
    }
}
