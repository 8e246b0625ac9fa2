//! Filters applied to subject stubs and assembled media.

use std::collections::BTreeSet;

use crate::models::{EpisodeRange, EpisodeSort, FetchRequest, Media, SelectorSearchConfig, SubjectStub};
use crate::utils::text::SUBTITLE_KEYWORDS;

/// What the caller asked for, as seen by the filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterContext {
    pub subject_names: BTreeSet<String>,
    pub episode_sort: Option<EpisodeSort>,
    pub episode_ep: Option<EpisodeSort>,
    pub episode_name: Option<String>,
}

impl FilterContext {
    /// Context for a whole request. A request that names no episode leaves
    /// every episode criterion unset.
    pub fn from_request(request: &FetchRequest) -> Self {
        Self {
            subject_names: request.subject_names.iter().cloned().collect(),
            episode_sort: request.episode_sort.clone(),
            episode_ep: request.episode_ep.clone(),
            episode_name: request.episode_name.clone(),
        }
    }

    fn names_episode(&self) -> bool {
        self.episode_sort.is_some() || self.episode_ep.is_some() || self.episode_name.is_some()
    }
}

/// The parts of a record a filter looks at.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub title: &'a str,
    pub episode_range: Option<&'a EpisodeRange>,
}

impl<'a> From<&'a Media> for Candidate<'a> {
    fn from(media: &'a Media) -> Self {
        Self {
            title: &media.original_title,
            episode_range: Some(&media.episode_range),
        }
    }
}

impl<'a> From<&'a SubjectStub> for Candidate<'a> {
    fn from(stub: &'a SubjectStub) -> Self {
        Self {
            title: &stub.name,
            episode_range: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaFilter {
    /// Every word of some requested subject name occurs in the title.
    ContainsSubjectName,
    /// The record covers the requested episode.
    EpisodeMatches,
    /// The title mentions one of these qualities.
    Quality(Vec<String>),
    /// The title mentions one of these subtitle languages.
    Language(Vec<String>),
}

impl MediaFilter {
    pub fn accepts(&self, candidate: &Candidate<'_>, context: &FilterContext) -> bool {
        match self {
            Self::ContainsSubjectName => contains_subject_name(candidate.title, context),
            Self::EpisodeMatches => episode_matches(candidate, context),
            Self::Quality(qualities) => {
                let title = candidate.title.to_lowercase();
                qualities.is_empty() || qualities.iter().any(|q| title.contains(&q.to_lowercase()))
            }
            Self::Language(languages) => {
                languages.is_empty() || languages.iter().any(|l| mentions_language(candidate.title, l))
            }
        }
    }
}

fn contains_subject_name(title: &str, context: &FilterContext) -> bool {
    let title = title.to_lowercase();
    context.subject_names.iter().any(|name| {
        let name = name.to_lowercase();
        let mut words = name.split_whitespace().peekable();
        words.peek().is_some() && words.all(|word| title.contains(word))
    })
}

fn episode_matches(candidate: &Candidate<'_>, context: &FilterContext) -> bool {
    if !context.names_episode() {
        return true;
    }
    let title = candidate.title.to_lowercase();
    if let Some(name) = &context.episode_name {
        if !name.trim().is_empty() && title.contains(&name.to_lowercase()) {
            return true;
        }
    }

    let wanted = context.episode_sort.iter().chain(context.episode_ep.iter());
    match candidate.episode_range {
        Some(range) => wanted.into_iter().any(|sort| range.contains(sort)),
        None => wanted.into_iter().any(|sort| title_mentions_episode(&title, sort)),
    }
}

fn title_mentions_episode(title: &str, sort: &EpisodeSort) -> bool {
    let n = sort.to_string().to_lowercase();
    [
        format!("第{n}集"),
        format!("第{n}话"),
        format!("ep{n}"),
        format!("episode {n}"),
        format!(" {n} "),
    ]
    .iter()
    .any(|pattern| title.contains(pattern.as_str()))
}

fn mentions_language(title: &str, language: &str) -> bool {
    let lower = title.to_lowercase();
    let language = language.to_uppercase();
    SUBTITLE_KEYWORDS
        .iter()
        .filter(|(_, lang)| *lang == language)
        .any(|(keyword, _)| title.contains(keyword))
        || lower.contains(&language.to_lowercase())
}

/// Filters for subject stubs under `config`.
pub fn subject_filters(config: &SelectorSearchConfig) -> Vec<MediaFilter> {
    if config.filter_by_subject_name {
        vec![MediaFilter::ContainsSubjectName]
    } else {
        Vec::new()
    }
}

/// Filters for assembled media under `config`.
pub fn episode_filters(config: &SelectorSearchConfig) -> Vec<MediaFilter> {
    if config.filter_by_episode_sort {
        vec![MediaFilter::EpisodeMatches]
    } else {
        Vec::new()
    }
}

/// Keep the items every filter accepts, in order.
pub fn apply_filters<T>(items: Vec<T>, filters: &[MediaFilter], context: &FilterContext) -> Vec<T>
where
    for<'a> &'a T: Into<Candidate<'a>>,
{
    if filters.is_empty() {
        return items;
    }
    items
        .into_iter()
        .filter(|item| {
            let candidate: Candidate<'_> = item.into();
            filters.iter().all(|f| f.accepts(&candidate, context))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(names: &[&str]) -> FilterContext {
        FilterContext {
            subject_names: names.iter().map(|s| s.to_string()).collect(),
            ..FilterContext::default()
        }
    }

    fn stub(name: &str) -> SubjectStub {
        SubjectStub {
            internal_id: "0".into(),
            name: name.into(),
            full_url: "https://x.test/a".into(),
            partial_url: "/a".into(),
        }
    }

    #[test]
    fn test_contains_subject_name_word_wise() {
        let ctx = context(&["Sousou no Frieren", "葬送的芙莉莲"]);
        let filter = MediaFilter::ContainsSubjectName;
        assert!(filter.accepts(&Candidate { title: "Frieren SOUSOU no (2023)", episode_range: None }, &ctx));
        assert!(filter.accepts(&Candidate { title: "葬送的芙莉莲 第二季", episode_range: None }, &ctx));
        assert!(!filter.accepts(&Candidate { title: "Dungeon Meshi", episode_range: None }, &ctx));
        assert!(!filter.accepts(&Candidate { title: "anything", episode_range: None }, &context(&[" "])));
    }

    #[test]
    fn test_apply_filters_on_stubs_keeps_order() {
        let stubs = vec![stub("Frieren"), stub("Other"), stub("Frieren Movie")];
        let kept = apply_filters(stubs, &[MediaFilter::ContainsSubjectName], &context(&["frieren"]));
        let names: Vec<_> = kept.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Frieren", "Frieren Movie"]);
    }

    #[test]
    fn test_episode_matches_by_range() {
        let range = EpisodeRange::single(EpisodeSort::Normal(3));
        let candidate = Candidate { title: "Frieren 第3集", episode_range: Some(&range) };
        let mut ctx = context(&["Frieren"]);
        assert!(MediaFilter::EpisodeMatches.accepts(&candidate, &ctx));

        ctx.episode_sort = Some(EpisodeSort::Normal(3));
        assert!(MediaFilter::EpisodeMatches.accepts(&candidate, &ctx));

        ctx.episode_sort = Some(EpisodeSort::Normal(4));
        assert!(!MediaFilter::EpisodeMatches.accepts(&candidate, &ctx));

        ctx.episode_ep = Some(EpisodeSort::Normal(3));
        assert!(MediaFilter::EpisodeMatches.accepts(&candidate, &ctx));
    }

    #[test]
    fn test_episode_matches_by_title() {
        let mut ctx = context(&[]);
        ctx.episode_sort = Some(EpisodeSort::Normal(7));
        let hit = Candidate { title: "Frieren EP7", episode_range: None };
        let miss = Candidate { title: "Frieren EP8", episode_range: None };
        assert!(MediaFilter::EpisodeMatches.accepts(&hit, &ctx));
        assert!(!MediaFilter::EpisodeMatches.accepts(&miss, &ctx));

        ctx.episode_name = Some("Journey's End".into());
        let named = Candidate { title: "Frieren journey's end", episode_range: None };
        assert!(MediaFilter::EpisodeMatches.accepts(&named, &ctx));
    }

    #[test]
    fn test_quality_and_language() {
        let ctx = FilterContext::default();
        let title = Candidate { title: "简/1080P 第1集", episode_range: None };
        assert!(MediaFilter::Quality(vec!["1080p".into()]).accepts(&title, &ctx));
        assert!(!MediaFilter::Quality(vec!["720P".into()]).accepts(&title, &ctx));
        assert!(MediaFilter::Quality(Vec::new()).accepts(&title, &ctx));
        assert!(MediaFilter::Language(vec!["chs".into()]).accepts(&title, &ctx));
        assert!(!MediaFilter::Language(vec!["CHT".into()]).accepts(&title, &ctx));

        let eng = Candidate { title: "Frieren [ENG] 01", episode_range: None };
        assert!(MediaFilter::Language(vec!["ENG".into()]).accepts(&eng, &ctx));
    }

    #[test]
    fn test_config_driven_filter_sets() {
        let mut config = SelectorSearchConfig::new("https://x.test/s/{keyword}");
        assert_eq!(subject_filters(&config), vec![MediaFilter::ContainsSubjectName]);
        assert_eq!(episode_filters(&config), vec![MediaFilter::EpisodeMatches]);
        config.filter_by_subject_name = false;
        config.filter_by_episode_sort = false;
        assert!(subject_filters(&config).is_empty());
        assert!(episode_filters(&config).is_empty());
    }
}
