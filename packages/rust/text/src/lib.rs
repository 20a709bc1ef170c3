//! Text normalization and content relevance filtering.
//!
//! This crate provides:
//! - [`normalize`] — whitespace/control-character cleanup for extracted text
//! - [`RelevanceFilter`] — the language-ratio + keyword gate applied to all
//!   page and attachment text before it enters the corpus

pub mod normalize;
pub mod relevance;

pub use normalize::normalize;
pub use relevance::RelevanceFilter;
