// src/pipeline/probe.rs

//! Connection probes for configured sources.

use futures::future::join_all;
use serde::Serialize;

use crate::services::{ConnectionStatus, MediaSource};

#[derive(Debug, Clone, Serialize)]
pub struct ProbeResult {
    pub id: String,
    pub website_url: String,
    pub status: ConnectionStatus,
}

/// Probe every source concurrently, reporting in source order.
pub async fn run_probe(sources: &[Box<dyn MediaSource>]) -> Vec<ProbeResult> {
    let results = join_all(sources.iter().map(|source| async move {
        ProbeResult {
            id: source.id().to_string(),
            website_url: source.info().website_url,
            status: source.check_connection().await,
        }
    }))
    .await;

    for result in &results {
        match result.status {
            ConnectionStatus::Success => log::info!("{} ({}): reachable", result.id, result.website_url),
            ConnectionStatus::Failed => log::warn!("{} ({}): unreachable", result.id, result.website_url),
        }
    }
    results
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::models::{SelectorSearchConfig, ThreeStepConfig};
    use crate::services::{SelectorMediaSource, ThreeStepSource};
    use crate::utils::http::testing::MockFetcher;
    use crate::utils::retry::RetryPolicy;

    #[tokio::test]
    async fn test_probe_reports_each_source() {
        let fetcher = Arc::new(MockFetcher::new());
        let sources: Vec<Box<dyn MediaSource>> = vec![
            Box::new(
                SelectorMediaSource::new(
                    "sel",
                    SelectorSearchConfig::new("https://x.test/s/{keyword}"),
                    fetcher.clone(),
                )
                .unwrap(),
            ),
            Box::new(
                ThreeStepSource::from_config(
                    "three",
                    ThreeStepConfig::new("https://y.test", "https://y.test/?q={keyword}"),
                    fetcher.clone(),
                    RetryPolicy::default(),
                )
                .unwrap(),
            ),
        ];

        let results = run_probe(&sources).await;
        assert_eq!(results[0].id, "sel");
        assert_eq!(results[0].website_url, "https://x.test");
        // Any answer counts for selector sources; three-step needs a 2xx
        assert_eq!(results[0].status, ConnectionStatus::Success);
        assert_eq!(results[1].status, ConnectionStatus::Failed);
    }
}
