// src/lib.rs

//! Selector-driven media source engine.
//!
//! Turns a subject name and episode into playable media by scraping
//! streaming sites with operator-supplied CSS selectors and regexes.

pub mod config;
pub mod error;
pub mod formats;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod utils;

pub use config::{Config, SourceEntry, SourceKind, build_source};
pub use error::{AppError, Result};
pub use services::{MediaSource, SelectorMediaSource, SelectorMediaSourceEngine, ThreeStepSource};
