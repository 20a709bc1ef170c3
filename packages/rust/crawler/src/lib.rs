//! Knowledge-base acquisition: fetching, classification, and the frontier.
//!
//! This crate provides:
//! - [`links`] — outbound link routing (page / form / pdf / skip)
//! - [`fetch`] — HTTP page fetching and title/body/link extraction
//! - [`attachments`] — linked document download and text extraction
//! - [`engine`] — the breadth-first frontier crawler driving it all

pub mod attachments;
pub mod engine;
pub mod fetch;
pub mod links;

pub use attachments::{AttachmentExtractor, DocFormat, decode_document};
pub use engine::{CrawlProgress, CrawlReport, Crawler, SilentProgress};
pub use fetch::{FetchedDocument, PageFetcher};
pub use links::{DocKind, LinkClass, LinkClassifier};
