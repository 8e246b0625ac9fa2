// src/config.rs

//! Operator configuration: HTTP client, retry policy, logging and the list
//! of sources, loaded from one TOML file.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{SelectorSearchConfig, ThreeStepConfig};
use crate::services::{MediaSource, SelectorMediaSource, ThreeStepSource};
use crate::utils::http::DocumentFetcher;
use crate::utils::retry::RetryPolicy;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Retry settings for three-step sources
    #[serde(default)]
    pub retry: RetryPolicy,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Configured media sources
    #[serde(default)]
    pub sources: Vec<SourceEntry>,
}

impl Config {
    /// Load and validate configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Reject structurally unusable configuration.
    pub fn validate(&self) -> Result<()> {
        if self.http.user_agent.trim().is_empty() {
            return Err(AppError::validation("http.user_agent is empty"));
        }
        if self.http.timeout_secs == 0 {
            return Err(AppError::validation("http.timeout_secs must be > 0"));
        }
        if self.http.max_concurrent == 0 {
            return Err(AppError::validation("http.max_concurrent must be > 0"));
        }
        if self.retry.max_attempts == 0 {
            return Err(AppError::validation("retry.max_attempts must be > 0"));
        }

        let mut ids = HashSet::new();
        for source in &self.sources {
            if source.id.trim().is_empty() {
                return Err(AppError::validation("source id is empty"));
            }
            if !ids.insert(source.id.as_str()) {
                return Err(AppError::validation(format!(
                    "duplicate source id: {}",
                    source.id
                )));
            }
            source.validate()?;
        }
        Ok(())
    }

    pub fn source(&self, id: &str) -> Option<&SourceEntry> {
        self.sources.iter().find(|s| s.id == id)
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header for page requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Maximum subject pages fetched at once per search
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            max_concurrent: defaults::max_concurrent(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default level when neither `RUST_LOG` nor a CLI flag sets one
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Selector,
    ThreeStep,
}

/// One `[[sources]]` entry. The table matching `kind` must be present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceEntry {
    pub id: String,
    pub kind: SourceKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<SelectorSearchConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub three_step: Option<ThreeStepConfig>,
}

impl SourceEntry {
    pub fn validate(&self) -> Result<()> {
        match self.kind {
            SourceKind::Selector => self
                .selector
                .as_ref()
                .ok_or_else(|| self.missing_table("selector"))?
                .validate()
                .map_err(|e| self.wrap(e)),
            SourceKind::ThreeStep => self
                .three_step
                .as_ref()
                .ok_or_else(|| self.missing_table("three_step"))?
                .validate()
                .map_err(|e| self.wrap(e)),
        }
    }

    fn missing_table(&self, table: &str) -> AppError {
        AppError::validation(format!(
            "source {}: kind needs a [sources.{}] table",
            self.id, table
        ))
    }

    fn wrap(&self, e: AppError) -> AppError {
        AppError::validation(format!("source {}: {}", self.id, e))
    }
}

/// Build the media source described by `entry`.
pub fn build_source(
    entry: &SourceEntry,
    config: &Config,
    fetcher: Arc<dyn DocumentFetcher>,
) -> Result<Box<dyn MediaSource>> {
    entry.validate()?;
    match (entry.kind, &entry.selector, &entry.three_step) {
        (SourceKind::Selector, Some(selector), _) => Ok(Box::new(
            SelectorMediaSource::new(&entry.id, selector.clone(), fetcher)?
                .with_max_concurrent(config.http.max_concurrent),
        )),
        (SourceKind::ThreeStep, _, Some(three_step)) => Ok(Box::new(ThreeStepSource::from_config(
            &entry.id,
            three_step.clone(),
            fetcher,
            config.retry.clone(),
        )?)),
        _ => Err(entry.missing_table(match entry.kind {
            SourceKind::Selector => "selector",
            SourceKind::ThreeStep => "three_step",
        })),
    }
}

mod defaults {
    pub fn user_agent() -> String {
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn max_concurrent() -> usize {
        4
    }
    pub fn log_level() -> String {
        "info".into()
    }
}
