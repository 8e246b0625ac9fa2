//! Utility functions and helpers.

pub mod http;
pub mod rate_limit;
pub mod retry;
pub mod text;

use url::Url;

/// Resolve `href` to an absolute http(s) URL, or `None` if it cannot be one
/// (`javascript:` links, malformed hrefs).
pub fn absolute_url(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    let url = base.join(href).ok()?;
    matches!(url.scheme(), "http" | "https").then(|| url.to_string())
}

/// The directory containing `url`: last path segment, query and fragment
/// dropped, trailing slash kept.
///
/// `https://x.test/anime/123/index.html` becomes `https://x.test/anime/123/`.
pub fn directory_of(url: &str) -> Option<Url> {
    let mut url = Url::parse(url).ok()?;
    url.set_query(None);
    url.set_fragment(None);
    let path = url.path();
    let dir = match path.rfind('/') {
        Some(idx) => path[..=idx].to_string(),
        None => "/".to_string(),
    };
    url.set_path(&dir);
    Some(url)
}

/// Guess a site root (`scheme://host[:port]`) from any URL on it.
pub fn guess_base_url(url_str: &str) -> String {
    match Url::parse(url_str) {
        Ok(url) if url.has_host() => url.origin().ascii_serialization(),
        _ => {
            // Templates with odd placeholders may not parse; fall back to slicing.
            let Some(scheme_end) = url_str.find("//") else {
                return url_str.trim_end_matches('/').to_string();
            };
            match url_str[scheme_end + 2..].find('/') {
                Some(slash) => url_str[..scheme_end + 2 + slash].to_string(),
                None => url_str.trim_end_matches('/').to_string(),
            }
        }
    }
}
