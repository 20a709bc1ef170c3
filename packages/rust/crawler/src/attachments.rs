//! Linked document download and text extraction.
//!
//! Attachments are saved under the docs directory, decoded by format, then
//! pushed through the same normalize + relevance gate as page text. Every
//! failure — transport, malformed file, irrelevant content — collapses to
//! an empty string so the caller simply omits the attachment.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use quick_xml::Reader;
use quick_xml::events::Event;
use regex::Regex;
use reqwest::Client;
use tracing::{debug, warn};
use url::Url;

use olimkb_shared::{CrawlSettings, OlimKbError, Result};
use olimkb_text::{RelevanceFilter, normalize};

/// Saved file names derived from page titles are capped at this length.
const MAX_NAME_CHARS: usize = 60;

/// Formats the decoder understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocFormat {
    Pdf,
    Docx,
    Rtf,
    Txt,
}

impl DocFormat {
    /// Guess a format from a file path's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "doc" | "docx" => Some(Self::Docx),
            "rtf" => Some(Self::Rtf),
            "txt" => Some(Self::Txt),
            _ => None,
        }
    }

    /// Canonical extension for saved files.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Rtf => "rtf",
            Self::Txt => "txt",
        }
    }
}

/// Decode raw document bytes into (un-normalized) text.
pub fn decode_document(format: DocFormat, bytes: &[u8]) -> Result<String> {
    match format {
        DocFormat::Pdf => pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| OlimKbError::parse(format!("pdf: {e}"))),
        DocFormat::Docx => decode_docx(bytes),
        DocFormat::Rtf => Ok(decode_rtf(bytes)),
        DocFormat::Txt => Ok(String::from_utf8_lossy(bytes).into_owned()),
    }
}

/// A docx is a zip of WordprocessingML; the document text lives in
/// `word/document.xml` as `w:t` runs, with `w:p` marking paragraphs.
fn decode_docx(bytes: &[u8]) -> Result<String> {
    let cursor = std::io::Cursor::new(bytes);
    let mut archive =
        zip::ZipArchive::new(cursor).map_err(|e| OlimKbError::parse(format!("docx: {e}")))?;

    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| OlimKbError::parse(format!("docx: {e}")))?
        .read_to_string(&mut xml)
        .map_err(|e| OlimKbError::parse(format!("docx: {e}")))?;

    let mut reader = Reader::from_str(&xml);
    let mut out = String::new();
    let mut in_text_run = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == b"w:t" => in_text_run = true,
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:t" => in_text_run = false,
                b"w:p" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Text(t)) if in_text_run => {
                let text = t
                    .unescape()
                    .map_err(|e| OlimKbError::parse(format!("docx xml: {e}")))?;
                out.push_str(&text);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(OlimKbError::parse(format!("docx xml: {e}"))),
            _ => {}
        }
    }

    Ok(out)
}

static RTF_GROUP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\\[^{}]*\}").expect("valid regex"));
static RTF_CONTROL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\[A-Za-z]+-?\d* ?").expect("valid regex"));

/// Best-effort RTF: drop control groups and control words, keep the rest.
fn decode_rtf(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    let text = RTF_GROUP_RE.replace_all(&text, "");
    let text = RTF_CONTROL_RE.replace_all(&text, "");
    text.replace(['{', '}'], " ")
}

/// Downloads linked documents, archives the bytes, and extracts
/// relevance-checked text.
pub struct AttachmentExtractor {
    client: Client,
    docs_dir: PathBuf,
    filter: RelevanceFilter,
}

impl AttachmentExtractor {
    pub fn new(settings: &CrawlSettings, filter: RelevanceFilter) -> Result<Self> {
        let client = Client::builder()
            .user_agent("Mozilla/5.0")
            .timeout(Duration::from_secs(settings.attachment_timeout_secs))
            .build()
            .map_err(|e| OlimKbError::Network(format!("failed to build HTTP client: {e}")))?;

        let docs_dir = PathBuf::from(&settings.docs_dir);
        std::fs::create_dir_all(&docs_dir).map_err(|e| OlimKbError::io(&docs_dir, e))?;

        Ok(Self {
            client,
            docs_dir,
            filter,
        })
    }

    /// Download and extract one linked document.
    ///
    /// Returns the normalized text when it passes the relevance gate;
    /// empty string on any failure or irrelevance. Never propagates —
    /// a broken attachment must not cost the crawl its page.
    pub async fn fetch_attachment(&self, url: &Url, name_hint: &str) -> String {
        match self.try_fetch(url, name_hint).await {
            Ok(Some(text)) => text,
            Ok(None) => {
                debug!(%url, "attachment rejected by relevance gate");
                String::new()
            }
            Err(e) => {
                warn!(%url, error = %e, "attachment extraction failed");
                String::new()
            }
        }
    }

    async fn try_fetch(&self, url: &Url, name_hint: &str) -> Result<Option<String>> {
        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| OlimKbError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(OlimKbError::Network(format!("{url}: HTTP {status}")));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| OlimKbError::Network(format!("{url}: body read failed: {e}")))?;

        let format = DocFormat::from_path(Path::new(url.path())).unwrap_or(DocFormat::Pdf);
        let file_name = format!("{}.{}", sanitize_name(name_hint), format.extension());
        let save_path = self.docs_dir.join(&file_name);
        std::fs::write(&save_path, &bytes).map_err(|e| OlimKbError::io(&save_path, e))?;

        let text = normalize(&decode_document(format, &bytes)?);
        if self.filter.is_relevant(&text) {
            Ok(Some(text))
        } else {
            Ok(None)
        }
    }
}

/// Collapse every run of non-word characters to a single underscore and
/// cap the length, so any page title yields a safe file name.
fn sanitize_name(hint: &str) -> String {
    let mut out = String::new();
    let mut prev_was_sub = false;

    for c in hint.chars() {
        if c.is_alphanumeric() || c == '_' || c == '-' {
            out.push(c);
            prev_was_sub = false;
        } else if !prev_was_sub {
            out.push('_');
            prev_was_sub = true;
        }
    }

    out.chars().take(MAX_NAME_CHARS).collect()
}
