//! Episode sort keys and ranges.

use std::cmp::Ordering;
use std::fmt;
use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

/// Normalized ordering key for an episode.
///
/// Numbered episodes compare numerically and always sort before specials
/// (OVA, SP, movies) which compare by their text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EpisodeSort {
    Normal(u32),
    Special(String),
}

/// Patterns tried in order by [`parse_sort`]. Prefixed forms come first so a
/// bare number embedded elsewhere in a title is never picked over them.
static SORT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"第(\d+)集",
        r"第(\d+)[话話]",
        r"EP(\d+)",
        r"(\d+)集",
        r"(\d+)[话話]",
        r"^(\d+)$",
        r"Episode\s*(\d+)",
        r"Ep\s+(\d+)",
    ]
    .iter()
    .filter_map(|p| RegexBuilder::new(p).case_insensitive(true).build().ok())
    .collect()
});

/// Infer an episode sort from a free-text episode name.
///
/// Returns `None` when no known pattern matches. The same name always yields
/// the same sort.
pub fn parse_sort(name: &str) -> Option<EpisodeSort> {
    let name = name.trim();
    SORT_PATTERNS.iter().find_map(|pattern| {
        pattern
            .captures(name)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .map(EpisodeSort::Normal)
    })
}

impl EpisodeSort {
    /// Build a sort from arbitrary text: plain numbers become `Normal`,
    /// anything else is kept verbatim as `Special`.
    pub fn parse_text(text: &str) -> Self {
        let trimmed = text.trim();
        match trimmed.parse::<u32>() {
            Ok(n) => Self::Normal(n),
            Err(_) => Self::Special(trimmed.to_string()),
        }
    }

    /// The episode number, if this is a numbered episode.
    pub fn number(&self) -> Option<u32> {
        match self {
            Self::Normal(n) => Some(*n),
            Self::Special(_) => None,
        }
    }

    pub fn is_special(&self) -> bool {
        matches!(self, Self::Special(_))
    }
}

impl From<u32> for EpisodeSort {
    fn from(n: u32) -> Self {
        Self::Normal(n)
    }
}

impl fmt::Display for EpisodeSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal(n) => write!(f, "{n}"),
            Self::Special(s) => f.write_str(s),
        }
    }
}

impl Ord for EpisodeSort {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Normal(a), Self::Normal(b)) => a.cmp(b),
            (Self::Normal(_), Self::Special(_)) => Ordering::Less,
            (Self::Special(_), Self::Normal(_)) => Ordering::Greater,
            (Self::Special(a), Self::Special(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for EpisodeSort {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Inclusive range of episodes covered by one media record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeRange {
    pub start: EpisodeSort,
    pub end: EpisodeSort,
}

impl EpisodeRange {
    pub fn single(sort: EpisodeSort) -> Self {
        Self {
            start: sort.clone(),
            end: sort,
        }
    }

    pub fn is_single(&self) -> bool {
        self.start == self.end
    }

    /// Whether `sort` falls inside this range.
    pub fn contains(&self, sort: &EpisodeSort) -> bool {
        &self.start <= sort && sort <= &self.end
    }
}

impl fmt::Display for EpisodeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_single() {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}
