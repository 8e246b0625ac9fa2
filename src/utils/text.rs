//! Text heuristics: search keywords, subtitle language, resolution, ids.

use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};
use sha2::{Digest, Sha256};

use crate::models::KEYWORD_PLACEHOLDER;

/// Subtitle keywords, checked in order; the first hit wins.
pub const SUBTITLE_KEYWORDS: &[(&str, &str)] = &[
    ("简中", "CHS"),
    ("简体", "CHS"),
    ("简", "CHS"),
    ("繁中", "CHT"),
    ("繁体", "CHT"),
    ("繁", "CHT"),
    ("日语", "JPN"),
    ("日文", "JPN"),
    ("英语", "ENG"),
    ("英文", "ENG"),
];

/// Tags must stand apart from ASCII letters and digits; CJK neighbours are
/// fine (`繁1080P`).
static RESOLUTION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [r"\d{3,4}p", r"[24]K", r"UHD", r"HD"]
        .iter()
        .filter_map(|tag| {
            RegexBuilder::new(&format!("(?:^|[^0-9a-z])({tag})(?:[^0-9a-z]|$)"))
                .case_insensitive(true)
                .build()
                .ok()
        })
        .collect()
});

const QUALITY_TAGS: &[&str] = &["2160P", "1440P", "2K", "4K", "1080P", "720P"];

static QUALITY_TAG_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    RegexBuilder::new(r"(2160|1440|1080|720)p|[24]k")
        .case_insensitive(true)
        .build()
        .ok()
});

/// Build the search keyword from a subject name.
///
/// With `remove_special`, punctuation becomes whitespace; with
/// `use_only_first_word`, only the first whitespace-separated token is kept.
pub fn search_keyword(subject_name: &str, remove_special: bool, use_only_first_word: bool) -> String {
    let mut keyword = subject_name.to_string();
    if remove_special {
        keyword = keyword
            .chars()
            .map(|c| if is_word_char(c) || c.is_whitespace() { c } else { ' ' })
            .collect::<String>()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
    }
    if use_only_first_word {
        if let Some(first) = keyword.split_whitespace().next() {
            keyword = first.to_string();
        }
    }
    keyword.trim().to_string()
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Percent-encode a keyword for use in a URL (spaces become `+`).
pub fn encode_url_segment(text: &str) -> String {
    url::form_urlencoded::byte_serialize(text.as_bytes()).collect()
}

/// Substitute an already-built keyword into a search URL template.
///
/// Pure: the template is never modified.
pub fn build_search_url(template: &str, keyword: &str) -> String {
    template.replace(KEYWORD_PLACEHOLDER, &encode_url_segment(keyword))
}

/// First subtitle language whose keyword occurs in `text`.
pub fn subtitle_language(text: &str) -> Option<&'static str> {
    SUBTITLE_KEYWORDS
        .iter()
        .find(|(keyword, _)| text.contains(keyword))
        .map(|(_, lang)| *lang)
}

/// Languages guessed from the channel name and then the episode name,
/// deduplicated, in that order.
pub fn guess_subtitle_languages(channel: Option<&str>, episode_name: &str) -> Vec<String> {
    let mut languages: Vec<String> = Vec::new();
    for text in channel.into_iter().chain(std::iter::once(episode_name)) {
        if let Some(lang) = subtitle_language(text) {
            if !languages.iter().any(|l| l == lang) {
                languages.push(lang.to_string());
            }
        }
    }
    languages
}

/// Resolution tag found in `text`, upper-cased (`1080P`, `4K`, `HD`).
pub fn extract_resolution(text: &str) -> Option<String> {
    RESOLUTION_PATTERNS.iter().find_map(|pattern| {
        pattern
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_uppercase())
    })
}

/// Whether an episode title looks like a whole movie release
/// (a subtitle marker plus a quality tag).
pub fn is_possibly_movie(title: &str) -> bool {
    let upper = title.to_uppercase();
    (title.contains('简') || title.contains('繁'))
        && QUALITY_TAGS.iter().any(|tag| upper.contains(tag))
}

/// `text` with quality tags (`1080P`, `4K`) removed.
pub fn strip_quality_tags(text: &str) -> String {
    match QUALITY_TAG_PATTERN.as_ref() {
        Some(pattern) => pattern.replace_all(text, "").into_owned(),
        None => text.to_string(),
    }
}

/// Page-local identifier: sequence index plus a full content hash.
pub fn content_id(prefix: &str, index: usize, name: &str, href: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    hasher.update([0u8]);
    hasher.update(href.as_bytes());
    format!("{prefix}{index}_{}", hex::encode(hasher.finalize()))
}
