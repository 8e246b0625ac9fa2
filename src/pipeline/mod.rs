//! Pipeline entry points for operator commands.
//!
//! - `run_validate`: Load a config and report per-source format gaps
//! - `run_probe`: Check that each source's site answers
//! - `run_fetch`: Query every source for one subject and episode
//! - `run_resolve`: Follow a play URL to a playable video

pub mod fetch;
pub mod probe;
pub mod resolve;
pub mod validate;

pub use fetch::{FetchReport, SourceOutcome, run_fetch, write_report};
pub use probe::{ProbeResult, run_probe};
pub use resolve::run_resolve;
pub use validate::{SourceCheck, check_sources, run_validate};
