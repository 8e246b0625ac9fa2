//! Thin selector-query helpers over `scraper`.
//!
//! Everything a format needs from the HTML layer: select elements, read the
//! text of an element, read an attribute.

use scraper::{ElementRef, Selector};

use crate::error::{AppError, Result};

/// Parse a CSS selector, mapping failures to [`AppError::Selector`].
pub fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

/// Parse a selector for use during extraction; a bad selector is logged and
/// yields `None` so the caller can return an empty result.
pub(crate) fn compile(s: &str) -> Option<Selector> {
    match parse_selector(s.trim()) {
        Ok(selector) => Some(selector),
        Err(e) => {
            log::warn!("{}", e);
            None
        }
    }
}

/// Whether a non-empty selector string parses.
pub(crate) fn is_parsable(s: &str) -> bool {
    !s.trim().is_empty() && Selector::parse(s.trim()).is_ok()
}

/// Inner text with whitespace collapsed.
pub fn element_text(element: &ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// First match of `selector` within `element`.
pub fn select_first<'a>(element: &ElementRef<'a>, selector: &Selector) -> Option<ElementRef<'a>> {
    element.select(selector).next()
}

/// Non-empty, trimmed attribute value.
pub fn attr(element: &ElementRef<'_>, name: &str) -> Option<String> {
    element
        .value()
        .attr(name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Non-empty text of the first `selector` match within `element`.
pub fn text_of(element: &ElementRef<'_>, selector: &Selector) -> Option<String> {
    select_first(element, selector)
        .map(|e| element_text(&e))
        .filter(|t| !t.is_empty())
}

/// Link target of the first `selector` match: its `href`, or its text when
/// the element carries the URL as content.
pub fn link_of(element: &ElementRef<'_>, selector: &Selector) -> Option<String> {
    let target = select_first(element, selector)?;
    attr(&target, "href").or_else(|| Some(element_text(&target)).filter(|t| !t.is_empty()))
}
