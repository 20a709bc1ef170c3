//! Application configuration for OlimKB.
//!
//! User config lives at `~/.olimkb/olimkb.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{OlimKbError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "olimkb.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".olimkb";

// ---------------------------------------------------------------------------
// Config structs (matching olimkb.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Crawl settings (frontier bounds, timeouts, output paths).
    #[serde(default)]
    pub crawl: CrawlSettings,

    /// Content relevance filter settings.
    #[serde(default)]
    pub filter: FilterSettings,

    /// Source labeling rules for corpus records.
    #[serde(default)]
    pub sources: SourceSettings,

    /// Corpus cleaning pass settings.
    #[serde(default)]
    pub cleaner: CleanerSettings,

    /// Retrieval engine settings.
    #[serde(default)]
    pub retrieval: RetrievalSettings,
}

/// `[crawl]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlSettings {
    /// Seed URLs for the frontier, processed at depth 0.
    #[serde(default = "default_start_urls")]
    pub start_urls: Vec<String>,

    /// Maximum number of accepted pages per run.
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// Maximum frontier depth; entries beyond it are discarded.
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,

    /// Politeness delay between accepted pages, in milliseconds.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,

    /// HTTP timeout for page fetches, in seconds.
    #[serde(default = "default_page_timeout")]
    pub page_timeout_secs: u64,

    /// HTTP timeout for attachment downloads, in seconds.
    #[serde(default = "default_attachment_timeout")]
    pub attachment_timeout_secs: u64,

    /// Output corpus file path.
    #[serde(default = "default_output_file")]
    pub output_file: String,

    /// Directory where downloaded documents are saved.
    #[serde(default = "default_docs_dir")]
    pub docs_dir: String,

    /// URL substrings that disqualify a link from becoming a page link.
    #[serde(default = "default_exclude_topics")]
    pub exclude_topics: Vec<String>,

    /// Extensions routed as fill-in form documents (listed, not fetched).
    #[serde(default = "default_form_extensions")]
    pub form_extensions: Vec<String>,

    /// Extensions routed as PDF documents (fetched and text-extracted).
    #[serde(default = "default_pdf_extensions")]
    pub pdf_extensions: Vec<String>,

    /// Minimum character count for an extracted text block to be kept.
    #[serde(default = "default_min_block_chars")]
    pub min_block_chars: usize,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            start_urls: default_start_urls(),
            max_pages: default_max_pages(),
            max_depth: default_max_depth(),
            delay_ms: default_delay_ms(),
            page_timeout_secs: default_page_timeout(),
            attachment_timeout_secs: default_attachment_timeout(),
            output_file: default_output_file(),
            docs_dir: default_docs_dir(),
            exclude_topics: default_exclude_topics(),
            form_extensions: default_form_extensions(),
            pdf_extensions: default_pdf_extensions(),
            min_block_chars: default_min_block_chars(),
        }
    }
}

fn default_start_urls() -> Vec<String> {
    [
        "https://www.kolzchut.org.il/ru/Репатрианты",
        "https://www.kolzchut.org.il/ru/New_Olim",
        "https://www.kolzchut.org.il/ru/category/Олим_Хадашим",
        "https://www.kolzchut.org.il/ru/Тошав_хозер",
        "https://www.gov.il/ru/subjects/immigration_and_absorption",
        "https://www.gov.il/ru/subjects/returning_residents",
        "https://www.gov.il/ru/subjects/learning_hebrew",
        "https://www.gov.il/ru/departments/ministry_of_aliyah_and_integration",
        "https://govextra.gov.il/moia/your-place-in-israel-lang/home-ru/",
    ]
    .map(String::from)
    .to_vec()
}
fn default_max_pages() -> usize {
    150
}
fn default_max_depth() -> u32 {
    4
}
fn default_delay_ms() -> u64 {
    500
}
fn default_page_timeout() -> u64 {
    30
}
fn default_attachment_timeout() -> u64 {
    40
}
fn default_output_file() -> String {
    "knowledge_base_aliyah_full.txt".into()
}
fn default_docs_dir() -> String {
    "docs".into()
}
fn default_exclude_topics() -> Vec<String> {
    [
        "army", "tax", "covid", "pension", "violence", "lawyer", "children", "business",
    ]
    .map(String::from)
    .to_vec()
}
fn default_form_extensions() -> Vec<String> {
    ["doc", "docx", "xls", "xlsx", "rtf", "odt", "zip"]
        .map(String::from)
        .to_vec()
}
fn default_pdf_extensions() -> Vec<String> {
    vec!["pdf".into()]
}
fn default_min_block_chars() -> usize {
    25
}

/// `[filter]` section — the relevance gate applied to all extracted text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterSettings {
    /// Minimum fraction of alphabetic characters that must be Cyrillic.
    #[serde(default = "default_cyrillic_ratio")]
    pub cyrillic_ratio: f64,

    /// Domain keywords; truncated stems match inflected forms by substring.
    #[serde(default = "default_keywords")]
    pub keywords: Vec<String>,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            cyrillic_ratio: default_cyrillic_ratio(),
            keywords: default_keywords(),
        }
    }
}

fn default_cyrillic_ratio() -> f64 {
    0.25
}
fn default_keywords() -> Vec<String> {
    [
        "алия",
        "алим",
        "репатриант",
        "репатрианты",
        "возвращающ",
        "министерство алии",
        "министерство интеграции",
        "абсорбц",
        "интеграция",
        "ульпан",
        "еврей",
        "тошав хозер",
        "olim",
        "aliyah",
        "absorption",
        "integration",
        "returning",
    ]
    .map(String::from)
    .to_vec()
}

/// `[sources]` section — maps page URLs to the source label written
/// into corpus records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSettings {
    /// Label used when no rule matches.
    #[serde(default = "default_source_label")]
    pub default_label: String,

    /// Substring rules, checked in order.
    #[serde(default = "default_source_rules")]
    pub rules: Vec<SourceRule>,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            default_label: default_source_label(),
            rules: default_source_rules(),
        }
    }
}

/// A single `[[sources.rules]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRule {
    /// URL substring to match.
    pub contains: String,
    /// Label to assign on match.
    pub label: String,
}

fn default_source_label() -> String {
    "gov.il".into()
}
fn default_source_rules() -> Vec<SourceRule> {
    vec![SourceRule {
        contains: "kolzchut".into(),
        label: "kolzchut".into(),
    }]
}

impl SourceSettings {
    /// Resolve the source label for a page URL.
    pub fn label_for(&self, url: &str) -> &str {
        self.rules
            .iter()
            .find(|r| url.contains(&r.contains))
            .map(|r| r.label.as_str())
            .unwrap_or(&self.default_label)
    }
}

/// `[cleaner]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanerSettings {
    /// Minimum character count for a cleaned line to be kept.
    #[serde(default = "default_min_line_chars")]
    pub min_line_chars: usize,

    /// Lines containing any of these substrings are dropped.
    #[serde(default = "default_exclude_substrings")]
    pub exclude_substrings: Vec<String>,
}

impl Default for CleanerSettings {
    fn default() -> Self {
        Self {
            min_line_chars: default_min_line_chars(),
            exclude_substrings: default_exclude_substrings(),
        }
    }
}

fn default_min_line_chars() -> usize {
    10
}
fn default_exclude_substrings() -> Vec<String> {
    [
        "Ссылка:",
        "Дата Парсинга",
        "На этом портале собрана информация",
        "Смотрите также",
        "Вернувшиеся жители",
        "Выходцы из Эфиопии",
        "Узники Сиона",
    ]
    .map(String::from)
    .to_vec()
}

/// `[retrieval]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalSettings {
    /// Minimum character count for a passage to participate in scoring.
    #[serde(default = "default_min_passage_chars")]
    pub min_passage_chars: usize,

    /// Number of top-scoring passages returned as context.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            min_passage_chars: default_min_passage_chars(),
            top_k: default_top_k(),
        }
    }
}

fn default_min_passage_chars() -> usize {
    40
}
fn default_top_k() -> usize {
    10
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.olimkb/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| OlimKbError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.olimkb/olimkb.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| OlimKbError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| OlimKbError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| OlimKbError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| OlimKbError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| OlimKbError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
