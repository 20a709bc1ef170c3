//! Shared types, configuration, and errors for OlimKB.
//!
//! This crate is dependency-light by design: every other workspace crate
//! pulls config structs, the error enum, and corpus record types from here.

pub mod config;
pub mod error;
pub mod types;

pub use config::{
    AppConfig, CleanerSettings, CrawlSettings, FilterSettings, RetrievalSettings, SourceRule,
    SourceSettings, config_dir, config_file_path, init_config, load_config, load_config_from,
};
pub use error::{OlimKbError, Result};
pub use types::{AttachmentText, CorpusRecord, TIMESTAMP_FORMAT};
