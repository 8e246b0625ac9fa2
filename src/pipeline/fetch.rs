// src/pipeline/fetch.rs

//! Fetch media from every configured source and write a JSON report.

use std::path::Path;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use tokio::io::AsyncWriteExt;

use crate::error::Result;
use crate::models::{FetchRequest, MediaMatch};
use crate::services::MediaSource;

/// Outcome of one source for one request.
#[derive(Debug, Clone, Serialize)]
pub struct SourceOutcome {
    pub source_id: String,
    pub matches: Vec<MediaMatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Everything a fetch run produced.
#[derive(Debug, Clone, Serialize)]
pub struct FetchReport {
    pub request: FetchRequest,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub sources: Vec<SourceOutcome>,
}

impl FetchReport {
    pub fn match_count(&self) -> usize {
        self.sources.iter().map(|s| s.matches.len()).sum()
    }

    pub fn failed_sources(&self) -> impl Iterator<Item = &str> {
        self.sources
            .iter()
            .filter(|s| s.error.is_some())
            .map(|s| s.source_id.as_str())
    }
}

/// Run `request` against every source concurrently.
///
/// A failing source is recorded in its outcome and does not abort the run.
pub async fn run_fetch(sources: &[Box<dyn MediaSource>], request: &FetchRequest) -> FetchReport {
    let started_at = Utc::now();
    log::info!(
        "Fetching {:?} from {} source(s)",
        request.subject_names,
        sources.len()
    );

    let outcomes = join_all(sources.iter().map(|source| async move {
        match source.fetch(request).await {
            Ok(matches) => {
                log::info!("[{}] {} match(es)", source.id(), matches.len());
                SourceOutcome {
                    source_id: source.id().to_string(),
                    matches,
                    error: None,
                }
            }
            Err(e) => {
                log::warn!("[{}] fetch failed: {}", source.id(), e);
                SourceOutcome {
                    source_id: source.id().to_string(),
                    matches: Vec::new(),
                    error: Some(e.to_string()),
                }
            }
        }
    }))
    .await;

    let report = FetchReport {
        request: request.clone(),
        started_at,
        finished_at: Utc::now(),
        sources: outcomes,
    };
    log::info!(
        "Fetch finished: {} match(es) in {}ms",
        report.match_count(),
        (report.finished_at - report.started_at).num_milliseconds()
    );
    report
}

/// Write `report` as pretty JSON, replacing `path` atomically.
pub async fn write_report(report: &FetchReport, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let bytes = serde_json::to_vec_pretty(report)?;
    let tmp = path.with_extension("tmp");
    let mut file = tokio::fs::File::create(&tmp).await?;
    file.write_all(&bytes).await?;
    file.flush().await?;
    drop(file);

    tokio::fs::rename(&tmp, path).await?;
    log::info!("Report written to {}", path.display());
    Ok(())
}
