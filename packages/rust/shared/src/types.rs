//! Core domain types for the OlimKB corpus.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Timestamp format used in corpus records (`Дата парсинга`).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One durable unit in the knowledge-base file: an accepted page plus
/// everything attached to it. Append-only; never mutated after writing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusRecord {
    /// Page title (first heading, document title, or a fixed placeholder).
    pub title: String,
    /// URL the page was fetched from.
    pub source_url: String,
    /// Source label resolved from the URL (e.g. "kolzchut", "gov.il").
    pub source_label: String,
    /// Local wall-clock time the page was parsed.
    pub fetched_at: NaiveDateTime,
    /// Normalized body text.
    pub body: String,
    /// URLs of fill-in form documents found on the page (listed, not fetched).
    pub form_links: Vec<String>,
    /// Extracted texts of PDF documents linked from the page.
    pub attachments: Vec<AttachmentText>,
}

/// Extracted text of one linked document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachmentText {
    /// URL the document was downloaded from.
    pub url: String,
    /// Normalized extracted text (already passed the relevance gate).
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_serialization_roundtrip() {
        let record = CorpusRecord {
            title: "Корзина абсорбции".into(),
            source_url: "https://www.gov.il/ru/departments/guides/sal_klita".into(),
            source_label: "gov.il".into(),
            fetched_at: NaiveDateTime::parse_from_str("2024-03-01 12:30:00", TIMESTAMP_FORMAT)
                .unwrap(),
            body: "Новые репатрианты получают корзину абсорбции.".into(),
            form_links: vec!["https://www.gov.il/blobFolder/form.docx".into()],
            attachments: vec![AttachmentText {
                url: "https://www.gov.il/blobFolder/guide.pdf".into(),
                text: "Выплаты для новых репатриантов.".into(),
            }],
        };

        let json = serde_json::to_string(&record).expect("serialize");
        let parsed: CorpusRecord = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, record);
    }
}
