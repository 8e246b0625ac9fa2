//! Selector source CLI
//!
//! Validate source configs, probe sites, fetch media and resolve play URLs.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use log::LevelFilter;
use selector_source::{
    config::{Config, build_source},
    error::{AppError, Result},
    formats,
    models::{EpisodeSort, FetchRequest},
    pipeline,
    services::MediaSource,
    utils::http::{DocumentFetcher, HttpFetcher},
};

/// Selector-driven media source engine
#[derive(Parser, Debug)]
#[command(
    name = "selector-source",
    version,
    about = "Search anime streaming sites with configured selectors"
)]
struct Cli {
    /// Path to the sources configuration file
    #[arg(short, long, default_value = "data/sources.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate the configuration and report disabled phases
    Validate,

    /// List known subject and channel format ids
    Formats,

    /// Check that every configured site answers
    Probe {
        /// Only probe these sources
        #[arg(short, long)]
        source: Vec<String>,
    },

    /// Search every source for a subject episode
    Fetch {
        /// Subject names in preference order
        #[arg(short, long, required = true)]
        name: Vec<String>,

        /// Episode sort, e.g. `3` or `SP1`
        #[arg(short, long)]
        episode: Option<String>,

        /// Only query these sources
        #[arg(short, long)]
        source: Vec<String>,

        /// Write the JSON report here
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Follow a play URL to a playable video
    Resolve {
        /// Source whose video rules apply
        #[arg(short, long)]
        source: String,

        /// Play page URL
        url: String,
    },
}

/// Initialize logging; `RUST_LOG` wins, then the verbose flag, then the config.
/// Start logging before the config is read so load warnings are visible.
///
/// Without `-v` or `RUST_LOG` the filter stays open and the effective level
/// is capped with [`log::set_max_level`] instead, first at `info` and then at
/// the configured `logging.level`.
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "trace" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp_secs()
        .init();
    if let Some(level) = configured_level(verbose, rust_log_set(), "info") {
        log::set_max_level(level);
    }
}

fn rust_log_set() -> bool {
    std::env::var_os(env_logger::DEFAULT_FILTER_ENV).is_some()
}

/// Level to cap logging at, unless `-v` or `RUST_LOG` already chose one.
fn configured_level(verbose: bool, rust_log: bool, level: &str) -> Option<LevelFilter> {
    if verbose || rust_log {
        return None;
    }
    Some(level.trim().parse().unwrap_or(LevelFilter::Info))
}

fn build_sources(
    config: &Config,
    only: &[String],
    fetcher: Arc<dyn DocumentFetcher>,
) -> Result<Vec<Box<dyn MediaSource>>> {
    if let Some(missing) = only.iter().find(|id| config.source(id).is_none()) {
        return Err(AppError::config(format!("unknown source: {missing}")));
    }
    config
        .sources
        .iter()
        .filter(|entry| only.is_empty() || only.contains(&entry.id))
        .map(|entry| build_source(entry, config, fetcher.clone()))
        .collect()
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    if let Command::Validate = cli.command {
        let checks = pipeline::run_validate(&cli.config)?;
        let warnings: usize = checks.iter().map(|c| c.warnings.len()).sum();
        log::info!("{} source(s), {} warning(s)", checks.len(), warnings);
        return Ok(());
    }

    let config = Config::load_or_default(&cli.config);
    if let Some(level) = configured_level(cli.verbose, rust_log_set(), &config.logging.level) {
        log::set_max_level(level);
    }
    let fetcher: Arc<dyn DocumentFetcher> = Arc::new(HttpFetcher::from_config(&config.http)?);

    match cli.command {
        Command::Validate => {}

        Command::Formats => {
            for id in formats::list_subject_formats() {
                println!("subject  {id}");
            }
            for id in formats::list_channel_formats() {
                println!("channel  {id}");
            }
        }

        Command::Probe { source } => {
            let sources = build_sources(&config, &source, fetcher)?;
            let results = pipeline::run_probe(&sources).await;
            println!("{}", serde_json::to_string_pretty(&results)?);
        }

        Command::Fetch {
            name,
            episode,
            source,
            output,
        } => {
            let sources = build_sources(&config, &source, fetcher)?;
            let mut request = FetchRequest::new(name);
            if let Some(episode) = episode {
                request = request.with_episode(EpisodeSort::parse_text(&episode));
            }

            let report = pipeline::run_fetch(&sources, &request).await;
            for outcome in &report.sources {
                for found in &outcome.matches {
                    println!(
                        "{}\t{}\t{}",
                        found.media.media_id,
                        found.media.properties.episode_name,
                        found.media.download_location.uri()
                    );
                }
            }
            if let Some(path) = output {
                pipeline::write_report(&report, &path).await?;
            }

            let failed: Vec<&str> = report.failed_sources().collect();
            if !failed.is_empty() {
                log::warn!("Failed sources: {}", failed.join(", "));
            }
        }

        Command::Resolve { source, url } => {
            match pipeline::run_resolve(&config, &source, &url, fetcher.as_ref()).await? {
                Some(video) => println!("{}", serde_json::to_string_pretty(&video)?),
                None => {
                    return Err(AppError::crawl(url, "no video found"));
                }
            }
        }
    }

    Ok(())
}
