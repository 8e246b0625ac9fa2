// src/models/mod.rs

//! Domain models for the media source engine.
//!
//! This module contains all data structures used throughout the crate,
//! organized by their primary purpose.

mod episode;
mod media;
mod search;
mod selector;
mod three_step;

// Re-export all public types
pub use episode::{EpisodeRange, EpisodeSort, parse_sort};
pub use media::{
    FileSize, MatchKind, Media, MediaMatch, MediaProperties, MediaSourceKind,
    MediaSourceLocation, ResourceLocation, SubtitleKind,
};
pub use search::{FetchRequest, RawEpisode, SearchQuery, SubjectStub};
pub use selector::{
    ChannelFormatConfig, ChannelGroupedConfig, DEFAULT_MATCH_VIDEO_URL, KEYWORD_PLACEHOLDER,
    MatchVideoConfig, SelectMediaConfig, SelectorSearchConfig, SubjectFormatConfig, SubjectIndexedConfig,
    VideoHeaders,
};
pub use three_step::{ItemSelectors, ThreeStepConfig};
