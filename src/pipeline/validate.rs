// src/pipeline/validate.rs

use std::path::Path;

use serde::Serialize;

use crate::config::{Config, SourceKind};
use crate::error::Result;
use crate::formats;

/// Per-source findings of a validation run.
#[derive(Debug, Clone, Serialize)]
pub struct SourceCheck {
    pub id: String,
    pub kind: SourceKind,
    /// Phases that will not run and patterns that do not compile
    pub warnings: Vec<String>,
}

/// Load, validate and inspect the configuration at `path`.
///
/// Structural problems are errors; format gaps are reported per source.
pub fn run_validate(path: &Path) -> Result<Vec<SourceCheck>> {
    log::info!("Validating {}", path.display());
    let config = Config::load(path).inspect_err(|e| log::error!("Validation failed: {}", e))?;

    log::info!(
        "http: user_agent={}, timeout={}s, max_concurrent={}",
        config.http.user_agent,
        config.http.timeout_secs,
        config.http.max_concurrent
    );
    log::info!(
        "retry: {} attempts, {}ms backoff",
        config.retry.max_attempts,
        config.retry.backoff_ms
    );

    let checks = check_sources(&config);
    for check in &checks {
        if check.warnings.is_empty() {
            log::info!("  {} ({:?}): ok", check.id, check.kind);
        }
        for warning in &check.warnings {
            log::warn!("  {} ({:?}): {}", check.id, check.kind, warning);
        }
    }
    Ok(checks)
}

/// Format checks for every source in an already validated config.
pub fn check_sources(config: &Config) -> Vec<SourceCheck> {
    config
        .sources
        .iter()
        .map(|entry| SourceCheck {
            id: entry.id.clone(),
            kind: entry.kind,
            warnings: entry
                .selector
                .as_ref()
                .map(formats::check)
                .unwrap_or_default(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_reports_disabled_phases() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            br#"
            [[sources]]
            id = "half"
            kind = "selector"
            [sources.selector]
            search_url = "https://x.test/s/{keyword}"
            [sources.selector.subject_format_config]
            subject_selector = ".item"
            name_selector = ".t"
            url_selector = "a"
            "#,
        )
        .unwrap();

        let checks = run_validate(file.path()).unwrap();
        assert_eq!(checks.len(), 1);
        assert_eq!(checks[0].warnings.len(), 1);
        assert!(checks[0].warnings[0].contains("episode phase disabled"));
    }

    #[test]
    fn test_structural_error_is_returned() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"[http]\ntimeout_secs = 0\n").unwrap();
        assert!(run_validate(file.path()).is_err());
    }
}
