// src/pipeline/resolve.rs

//! Resolve a play URL to a playable video using a source's matching rules.

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::MatchVideoConfig;
use crate::services::{VideoResolver, WebVideo};
use crate::utils::http::DocumentFetcher;

/// Resolve `play_url` with the video rules of source `source_id`.
///
/// Three-step sources carry no rules of their own and use the defaults.
pub async fn run_resolve(
    config: &Config,
    source_id: &str,
    play_url: &str,
    fetcher: &dyn DocumentFetcher,
) -> Result<Option<WebVideo>> {
    let entry = config
        .source(source_id)
        .ok_or_else(|| AppError::config(format!("unknown source: {source_id}")))?;

    let rules: MatchVideoConfig = entry
        .selector
        .as_ref()
        .map(|selector| selector.match_video.clone())
        .unwrap_or_default();
    let resolver = VideoResolver::new(&rules);

    log::info!("[{}] resolving {}", source_id, play_url);
    let video = resolver.resolve(fetcher, play_url).await?;
    match &video {
        Some(video) => log::info!("[{}] video: {}", source_id, video.url),
        None => log::warn!("[{}] no video found behind {}", source_id, play_url),
    }
    Ok(video)
}
