//! Play URL to video URL resolution.
//!
//! [`VideoMatcher`] classifies a single URL. [`VideoResolver`] drives it over
//! a play page and the nested pages it points at.

use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{DEFAULT_MATCH_VIDEO_URL, MatchVideoConfig};
use crate::utils::absolute_url;
use crate::utils::http::{DocumentFetcher, Page};

/// Attributes that may carry a player or video link.
const LINK_ATTRIBUTES: &[&str] = &["src", "href", "data-src", "data-url", "data-play"];

static LINK_ELEMENTS: LazyLock<Option<Selector>> =
    LazyLock::new(|| Selector::parse("[src], [href], [data-src], [data-url], [data-play]").ok());

static TEXT_URLS: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s"'<>()\\]+"#).ok());

/// A playable video URL plus the headers to request it with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebVideo {
    pub url: String,
    pub headers: BTreeMap<String, String>,
}

/// Outcome of matching one URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebVideoMatch {
    /// An intermediate page: load it and match its links.
    LoadPage,
    Matched(WebVideo),
    /// Not a video source; try the next candidate.
    Continue,
}

/// The two-regex protocol: nested check first, then direct match.
#[derive(Debug, Clone)]
pub struct VideoMatcher {
    enable_nested_url: bool,
    nested: Option<Regex>,
    video: Option<Regex>,
    /// Reject wrapper URLs from the anchored branch of the built-in pattern
    reject_wrapped: bool,
    headers: BTreeMap<String, String>,
}

impl VideoMatcher {
    /// Build a matcher, disabling any pattern that fails to compile.
    pub fn new(config: &MatchVideoConfig) -> Self {
        Self {
            enable_nested_url: config.enable_nested_url,
            nested: lenient(&config.match_nested_url),
            video: lenient(&config.match_video_url),
            reject_wrapped: config.match_video_url == DEFAULT_MATCH_VIDEO_URL,
            headers: video_headers(config),
        }
    }

    /// Build a matcher, failing on the first pattern that does not compile.
    pub fn try_new(config: &MatchVideoConfig) -> Result<Self> {
        Ok(Self {
            enable_nested_url: config.enable_nested_url,
            nested: strict(&config.match_nested_url)?,
            video: strict(&config.match_video_url)?,
            reject_wrapped: config.match_video_url == DEFAULT_MATCH_VIDEO_URL,
            headers: video_headers(config),
        })
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn match_url(&self, url: &str) -> WebVideoMatch {
        if self.enable_nested_url && self.nested.as_ref().is_some_and(|re| re.is_match(url)) {
            return WebVideoMatch::LoadPage;
        }
        let Some(video) = &self.video else {
            return WebVideoMatch::Continue;
        };
        let mut caps = video.captures(url);
        if self.reject_wrapped
            && caps.as_ref().is_some_and(|c| c.get(0).is_some_and(|m| m.start() == 0))
            && wraps_another_url(url)
        {
            // `^` cannot match past the start, so only the host markers remain
            caps = video.captures_at(url, 1);
        }
        match caps {
            Some(caps) => {
                let video_url = caps.name("v").map_or(url, |m| m.as_str());
                WebVideoMatch::Matched(self.web_video(video_url))
            }
            None => WebVideoMatch::Continue,
        }
    }

    /// Cut a video URL out of raw page text through the `v` group of the
    /// video pattern. Patterns without a `v` group never match here.
    pub fn find_in_text(&self, text: &str) -> Option<WebVideo> {
        let video = self.video.as_ref()?;
        video
            .capture_names()
            .any(|name| name == Some("v"))
            .then(|| {
                video
                    .captures_iter(text)
                    .filter_map(|caps| caps.name("v"))
                    .map(|m| m.as_str().replace("\\/", "/"))
                    .find(|url| url.starts_with("http://") || url.starts_with("https://"))
            })
            .flatten()
            .map(|url| self.web_video(&url))
    }

    fn web_video(&self, url: &str) -> WebVideo {
        WebVideo {
            url: url.to_string(),
            headers: self.headers.clone(),
        }
    }
}

fn lenient(pattern: &str) -> Option<Regex> {
    if pattern.trim().is_empty() {
        return None;
    }
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            log::warn!("{}", AppError::pattern(pattern, e));
            None
        }
    }
}

fn strict(pattern: &str) -> Result<Option<Regex>> {
    if pattern.trim().is_empty() {
        return Ok(None);
    }
    Regex::new(pattern)
        .map(Some)
        .map_err(|e| AppError::pattern(pattern, e))
}

/// Headers a browser video element would send.
/// Whether another `http(s)://` follows the URL's own scheme.
fn wraps_another_url(url: &str) -> bool {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    rest.contains("http://") || rest.contains("https://")
}

fn video_headers(config: &MatchVideoConfig) -> BTreeMap<String, String> {
    let template = &config.add_headers_to_video;
    let mut headers = BTreeMap::new();
    headers.insert("User-Agent".to_string(), template.user_agent.clone());
    if !template.referer.is_empty() {
        headers.insert("Referer".to_string(), template.referer.clone());
    }
    if !config.cookies.trim().is_empty() {
        headers.insert("Cookie".to_string(), config.cookies.trim().to_string());
    }
    for (name, value) in [
        ("Sec-Ch-Ua-Mobile", "?0"),
        ("Sec-Ch-Ua-Platform", "macOS"),
        ("Sec-Fetch-Dest", "video"),
        ("Sec-Fetch-Mode", "no-cors"),
        ("Sec-Fetch-Site", "cross-site"),
    ] {
        headers.insert(name.to_string(), value.to_string());
    }
    headers
}

/// Absolute candidate links on a page, in document order, without repeats.
pub fn candidate_links(body: &str, page_url: &str) -> Vec<String> {
    let Ok(base) = Url::parse(page_url) else {
        return Vec::new();
    };
    let mut seen = HashSet::new();
    let mut links = Vec::new();
    let mut push = |link: String| {
        if seen.insert(link.clone()) {
            links.push(link);
        }
    };

    if let Some(selector) = LINK_ELEMENTS.as_ref() {
        let document = Html::parse_document(body);
        for element in document.select(selector) {
            for attr in LINK_ATTRIBUTES {
                if let Some(link) = element.value().attr(attr).and_then(|v| absolute_url(&base, v)) {
                    push(link);
                }
            }
        }
    }
    if let Some(pattern) = TEXT_URLS.as_ref() {
        let unescaped = body.replace("\\/", "/");
        for m in pattern.find_iter(&unescaped) {
            push(m.as_str().to_string());
        }
    }
    links
}

/// Follows a play URL through nested pages until a video matches.
#[derive(Debug, Clone)]
pub struct VideoResolver {
    matcher: VideoMatcher,
    max_nested_hops: usize,
}

impl VideoResolver {
    pub fn new(config: &MatchVideoConfig) -> Self {
        Self {
            matcher: VideoMatcher::new(config),
            max_nested_hops: config.max_nested_hops,
        }
    }

    pub fn matcher(&self) -> &VideoMatcher {
        &self.matcher
    }

    /// Resolve `play_url` to a video.
    ///
    /// The play page itself is always loaded; up to `max_nested_hops` further
    /// levels of `LoadPage` links are followed. No URL is loaded twice.
    /// Failures loading nested pages are logged and skipped.
    pub async fn resolve(&self, fetcher: &dyn DocumentFetcher, play_url: &str) -> Result<Option<WebVideo>> {
        if let WebVideoMatch::Matched(video) = self.matcher.match_url(play_url) {
            return Ok(Some(video));
        }

        let mut visited = HashSet::from([play_url.to_string()]);
        let mut frontier = vec![play_url.to_string()];
        let mut hops = 0;

        loop {
            let mut next = Vec::new();
            for url in &frontier {
                let page = if url == play_url {
                    fetcher.fetch(url).await?
                } else {
                    match fetcher.fetch(url).await {
                        Ok(page) => page,
                        Err(e) => {
                            log::warn!("Nested page {} failed: {}", url, e);
                            continue;
                        }
                    }
                };
                let Page::Found { url: page_url, body } = page else {
                    log::debug!("Nested page {} not found", url);
                    continue;
                };

                for link in candidate_links(&body, &page_url) {
                    match self.matcher.match_url(&link) {
                        WebVideoMatch::Matched(video) => return Ok(Some(video)),
                        WebVideoMatch::LoadPage => {
                            if visited.insert(link.clone()) {
                                next.push(link);
                            }
                        }
                        WebVideoMatch::Continue => {}
                    }
                }
                if let Some(video) = self.matcher.find_in_text(&body) {
                    return Ok(Some(video));
                }
            }

            if next.is_empty() || hops >= self.max_nested_hops {
                return Ok(None);
            }
            hops += 1;
            log::debug!("Following {} nested page(s), hop {}", next.len(), hops);
            frontier = next;
        }
    }
}
