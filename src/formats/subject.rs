//! Subject list formats.

use scraper::Html;
use url::Url;

use crate::formats::query::{attr, compile, element_text, is_parsable, link_of, text_of};
use crate::models::{SelectorSearchConfig, SubjectFormatConfig, SubjectIndexedConfig, SubjectStub};
use crate::utils::absolute_url;
use crate::utils::text::content_id;

/// Strategy for reading subject stubs off a search page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubjectFormat {
    /// Container, name and URL selectors applied per container.
    Direct,
    /// One container, items read through attributes.
    Indexed,
}

impl SubjectFormat {
    /// Whether `config` supplies everything this format needs.
    pub fn is_valid_config(&self, config: &SelectorSearchConfig) -> bool {
        match self {
            Self::Direct => {
                let c = &config.subject_format_config;
                c.is_valid()
                    && is_parsable(&c.subject_selector)
                    && is_parsable(&c.name_selector)
                    && is_parsable(&c.url_selector)
            }
            Self::Indexed => {
                let c = &config.subject_indexed_config;
                c.is_valid() && is_parsable(&c.container_selector) && is_parsable(&c.item_selector)
            }
        }
    }

    /// Read subjects from `document`, resolving links against `base_url`.
    ///
    /// An invalid config yields an empty list. Elements missing a name or a
    /// link are skipped.
    pub fn select(
        &self,
        document: &Html,
        base_url: &Url,
        config: &SelectorSearchConfig,
    ) -> Vec<SubjectStub> {
        if !self.is_valid_config(config) {
            return Vec::new();
        }
        match self {
            Self::Direct => select_direct(document, base_url, &config.subject_format_config),
            Self::Indexed => select_indexed(document, base_url, &config.subject_indexed_config),
        }
    }
}

fn select_direct(document: &Html, base_url: &Url, config: &SubjectFormatConfig) -> Vec<SubjectStub> {
    let (Some(container_sel), Some(name_sel), Some(url_sel)) = (
        compile(&config.subject_selector),
        compile(&config.name_selector),
        compile(&config.url_selector),
    ) else {
        return Vec::new();
    };

    document
        .select(&container_sel)
        .enumerate()
        .filter_map(|(index, element)| {
            let name = text_of(&element, &name_sel)?;
            let partial_url = link_of(&element, &url_sel)?;
            let full_url = absolute_url(base_url, &partial_url)?;
            Some(SubjectStub {
                internal_id: content_id("", index, &name, &partial_url),
                name,
                full_url,
                partial_url,
            })
        })
        .collect()
}

fn select_indexed(document: &Html, base_url: &Url, config: &SubjectIndexedConfig) -> Vec<SubjectStub> {
    let (Some(container_sel), Some(item_sel)) = (
        compile(&config.container_selector),
        compile(&config.item_selector),
    ) else {
        return Vec::new();
    };

    let Some(container) = document.select(&container_sel).next() else {
        return Vec::new();
    };

    container
        .select(&item_sel)
        .enumerate()
        .filter_map(|(index, item)| {
            let name = attr(&item, &config.name_attr)
                .or_else(|| Some(element_text(&item)).filter(|t| !t.is_empty()))?;
            let partial_url = attr(&item, &config.url_attr)?;
            let full_url = absolute_url(base_url, &partial_url)?;
            Some(SubjectStub {
                internal_id: content_id("idx_", index, &name, &partial_url),
                name,
                full_url,
                partial_url,
            })
        })
        .collect()
}
