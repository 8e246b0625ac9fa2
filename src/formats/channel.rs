//! Episode list (channel) formats.

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::formats::query::{compile, element_text, is_parsable, link_of, text_of};
use crate::models::{ChannelFormatConfig, ChannelGroupedConfig, RawEpisode, SelectorSearchConfig, parse_sort};
use crate::utils::absolute_url;

/// Strategy for reading episodes off a subject page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelFormat {
    /// Every matched element is one episode; channels only via an optional
    /// per-episode selector.
    Flat,
    /// Outer channel blocks, each with its own episode list.
    Grouped,
}

impl ChannelFormat {
    /// Whether `config` supplies everything this format needs.
    pub fn is_valid_config(&self, config: &SelectorSearchConfig) -> bool {
        match self {
            Self::Flat => {
                let c = &config.channel_format_config;
                c.is_valid()
                    && is_parsable(&c.episode_selector)
                    && is_parsable(&c.name_selector)
                    && is_parsable(&c.url_selector)
                    && c.channel_selector
                        .as_deref()
                        .is_none_or(|s| s.trim().is_empty() || is_parsable(s))
            }
            Self::Grouped => {
                let c = &config.channel_grouped_config;
                c.is_valid()
                    && is_parsable(&c.channel_selector)
                    && is_parsable(&c.episode_selector)
                    && is_parsable(&c.episode_name_selector)
                    && is_parsable(&c.episode_url_selector)
                    && c.channel_name_selector
                        .as_deref()
                        .is_none_or(|s| s.trim().is_empty() || is_parsable(s))
            }
        }
    }

    /// Read episodes from `document`, resolving links against `base_url`.
    ///
    /// An invalid config yields an empty list. Elements missing a name or a
    /// link are skipped.
    pub fn select(
        &self,
        document: &Html,
        base_url: &Url,
        config: &SelectorSearchConfig,
    ) -> Vec<RawEpisode> {
        if !self.is_valid_config(config) {
            return Vec::new();
        }
        match self {
            Self::Flat => select_flat(document, base_url, &config.channel_format_config),
            Self::Grouped => select_grouped(document, base_url, &config.channel_grouped_config),
        }
    }
}

fn optional_selector(s: Option<&str>) -> Option<Selector> {
    s.filter(|s| !s.trim().is_empty()).and_then(compile)
}

fn read_episode(
    element: &ElementRef<'_>,
    name_sel: &Selector,
    url_sel: &Selector,
    channel: Option<String>,
    base_url: &Url,
) -> Option<RawEpisode> {
    let name = text_of(element, name_sel)?;
    let partial_url = link_of(element, url_sel)?;
    let play_url = absolute_url(base_url, &partial_url)?;
    Some(RawEpisode {
        channel,
        episode_sort_or_ep: parse_sort(&name),
        name,
        play_url,
    })
}

fn select_flat(document: &Html, base_url: &Url, config: &ChannelFormatConfig) -> Vec<RawEpisode> {
    let (Some(episode_sel), Some(name_sel), Some(url_sel)) = (
        compile(&config.episode_selector),
        compile(&config.name_selector),
        compile(&config.url_selector),
    ) else {
        return Vec::new();
    };
    let channel_sel = optional_selector(config.channel_selector.as_deref());

    document
        .select(&episode_sel)
        .filter_map(|element| {
            let channel = channel_sel
                .as_ref()
                .and_then(|sel| text_of(&element, sel));
            read_episode(&element, &name_sel, &url_sel, channel, base_url)
        })
        .collect()
}

fn select_grouped(document: &Html, base_url: &Url, config: &ChannelGroupedConfig) -> Vec<RawEpisode> {
    let (Some(channel_sel), Some(episode_sel), Some(name_sel), Some(url_sel)) = (
        compile(&config.channel_selector),
        compile(&config.episode_selector),
        compile(&config.episode_name_selector),
        compile(&config.episode_url_selector),
    ) else {
        return Vec::new();
    };
    let channel_name_sel = optional_selector(config.channel_name_selector.as_deref());

    // Tab-style pages keep channel names outside the groups; those are
    // matched to groups by position.
    let page_level_names: Vec<String> = channel_name_sel
        .as_ref()
        .map(|sel| document.select(sel).map(|e| element_text(&e)).collect())
        .unwrap_or_default();

    let mut episodes = Vec::new();
    for (index, group) in document.select(&channel_sel).enumerate() {
        let channel = channel_name_sel
            .as_ref()
            .and_then(|sel| text_of(&group, sel))
            .or_else(|| page_level_names.get(index).cloned())
            .filter(|name| !name.is_empty());

        episodes.extend(group.select(&episode_sel).filter_map(|element| {
            read_episode(&element, &name_sel, &url_sel, channel.clone(), base_url)
        }));
    }
    episodes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EpisodeSort;
    use crate::utils::directory_of;

    fn config() -> SelectorSearchConfig {
        let mut config = SelectorSearchConfig::new("https://x.test/s/{keyword}");
        config.channel_format_config = ChannelFormatConfig::new(".ep", "a", "a");
        config.channel_grouped_config = ChannelGroupedConfig {
            channel_selector: ".playlist".into(),
            channel_name_selector: Some(".tab".into()),
            episode_selector: "li".into(),
            episode_name_selector: "a".into(),
            episode_url_selector: "a".into(),
        };
        config
    }

    fn base() -> Url {
        directory_of("https://x.test/anime/123/index.html").unwrap()
    }

    #[test]
    fn test_flat_resolves_directory_relative() {
        let document = Html::parse_document(
            r#"
            <ul>
              <li class="ep"><a href="ep1.html">第1集</a></li>
              <li class="ep"><a href="/play/2.html">第2集</a></li>
              <li class="ep"><span>broken</span></li>
              <li class="ep"><a href="sp.html">特别篇</a></li>
            </ul>
            "#,
        );
        let episodes = ChannelFormat::Flat.select(&document, &base(), &config());

        assert_eq!(episodes.len(), 3);
        assert_eq!(episodes[0].play_url, "https://x.test/anime/123/ep1.html");
        assert_eq!(episodes[0].episode_sort_or_ep, Some(EpisodeSort::Normal(1)));
        assert_eq!(episodes[0].channel, None);
        assert_eq!(episodes[1].play_url, "https://x.test/play/2.html");
        assert_eq!(episodes[2].name, "特别篇");
        assert_eq!(episodes[2].episode_sort_or_ep, None);
    }

    #[test]
    fn test_flat_optional_channel_selector() {
        let document = Html::parse_document(
            r#"<div class="ep"><em>简/1080P</em><a href="1.html">01</a></div>
               <div class="ep"><a href="2.html">02</a></div>"#,
        );
        let mut config = config();
        config.channel_format_config.channel_selector = Some("em".into());

        let episodes = ChannelFormat::Flat.select(&document, &base(), &config);
        assert_eq!(episodes[0].channel.as_deref(), Some("简/1080P"));
        assert_eq!(episodes[1].channel, None);
        assert_eq!(episodes[1].episode_sort_or_ep, Some(EpisodeSort::Normal(2)));
    }

    #[test]
    fn test_flat_invalid_config_is_empty() {
        let document = Html::parse_document(r#"<li class="ep"><a href="1.html">1</a></li>"#);
        let mut config = config();
        config.channel_format_config.name_selector.clear();
        assert!(ChannelFormat::Flat.select(&document, &base(), &config).is_empty());
    }

    #[test]
    fn test_grouped_names_inside_groups() {
        let document = Html::parse_document(
            r#"
            <div class="playlist"><h3 class="tab">简/1080P</h3>
              <ul><li><a href="a1.html">第1集</a></li><li><a href="a2.html">第2集</a></li></ul>
            </div>
            <div class="playlist"><h3 class="tab">繁/720P</h3>
              <ul><li><a href="b1.html">第1集</a></li></ul>
            </div>
            "#,
        );
        let episodes = ChannelFormat::Grouped.select(&document, &base(), &config());

        assert_eq!(episodes.len(), 3);
        assert_eq!(episodes[0].channel.as_deref(), Some("简/1080P"));
        assert_eq!(episodes[2].channel.as_deref(), Some("繁/720P"));
        assert_eq!(episodes[2].play_url, "https://x.test/anime/123/b1.html");
    }

    #[test]
    fn test_grouped_names_matched_by_position() {
        let document = Html::parse_document(
            r#"
            <div class="tabs"><span class="tab">线路一</span><span class="tab">线路二</span></div>
            <div class="playlist"><ul><li><a href="a1.html">01</a></li></ul></div>
            <div class="playlist"><ul><li><a href="b1.html">01</a></li></ul></div>
            "#,
        );
        let episodes = ChannelFormat::Grouped.select(&document, &base(), &config());

        let channels: Vec<_> = episodes.iter().map(|e| e.channel.as_deref()).collect();
        assert_eq!(channels, vec![Some("线路一"), Some("线路二")]);
    }
}
