//! Append-only corpus record writer.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use olimkb_shared::{CorpusRecord, OlimKbError, Result, TIMESTAMP_FORMAT};

/// Width of the record boundary and field separator rules.
pub(crate) const RULE_WIDTH: usize = 80;

pub(crate) const FORMS_HEADER: &str = "Формы для заполнения:";
pub(crate) const ATTACHMENT_HEADER: &str = "Правовой документ (PDF):";
pub(crate) const FORM_BULLET: &str = "📄 ";
pub(crate) const ATTACHMENT_BULLET: &str = "📑 ";

/// Serializes accepted pages into the knowledge-base file.
///
/// Owns the output handle exclusively for the duration of one crawl run.
/// Records are flushed as they are written, so an interrupted run leaves
/// only whole records behind. Any I/O error here is fatal to the crawl.
pub struct CorpusWriter {
    path: PathBuf,
    out: BufWriter<File>,
}

impl CorpusWriter {
    /// Create (truncating) the corpus file at `path`.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| OlimKbError::io(parent, e))?;
            }
        }
        let file = File::create(&path).map_err(|e| OlimKbError::io(&path, e))?;
        debug!(path = %path.display(), "corpus file opened");
        Ok(Self {
            path,
            out: BufWriter::new(file),
        })
    }

    /// Path of the corpus file being written.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record in the fixed block format.
    pub fn write_record(&mut self, record: &CorpusRecord) -> Result<()> {
        self.emit(format_args!("{}\n", "=".repeat(RULE_WIDTH)))?;
        self.emit(format_args!("Название: {}\n", record.title))?;
        self.emit(format_args!("Ссылка: {}\n", record.source_url))?;
        self.emit(format_args!("Источник: {}\n", record.source_label))?;
        self.emit(format_args!(
            "Дата парсинга: {}\n",
            record.fetched_at.format(TIMESTAMP_FORMAT)
        ))?;
        self.emit(format_args!("{}\n", "-".repeat(RULE_WIDTH)))?;
        self.emit(format_args!("{}\n\n", record.body))?;

        if !record.form_links.is_empty() {
            self.emit(format_args!("{FORMS_HEADER}\n"))?;
            for form in &record.form_links {
                self.emit(format_args!("{FORM_BULLET}{form}\n"))?;
            }
            self.emit(format_args!("\n"))?;
        }

        for attachment in &record.attachments {
            self.emit(format_args!("{ATTACHMENT_HEADER}\n"))?;
            self.emit(format_args!("{ATTACHMENT_BULLET}{}\n", attachment.url))?;
            self.emit(format_args!("{}\n\n", attachment.text))?;
        }

        self.out
            .flush()
            .map_err(|e| OlimKbError::io(&self.path, e))?;
        debug!(url = %record.source_url, "record written");
        Ok(())
    }

    /// Flush and close the corpus file.
    pub fn finish(mut self) -> Result<()> {
        self.out
            .flush()
            .map_err(|e| OlimKbError::io(&self.path, e))
    }

    fn emit(&mut self, args: std::fmt::Arguments<'_>) -> Result<()> {
        self.out
            .write_fmt(args)
            .map_err(|e| OlimKbError::io(&self.path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use olimkb_shared::AttachmentText;

    fn sample() -> CorpusRecord {
        CorpusRecord {
            title: "Тест".into(),
            source_url: "https://www.gov.il/ru/page".into(),
            source_label: "gov.il".into(),
            fetched_at: NaiveDateTime::parse_from_str("2024-01-15 08:00:00", TIMESTAMP_FORMAT)
                .unwrap(),
            body: "Содержимое страницы про репатриацию.".into(),
            form_links: vec!["https://www.gov.il/form.docx".into()],
            attachments: vec![AttachmentText {
                url: "https://www.gov.il/doc.pdf".into(),
                text: "Текст документа.".into(),
            }],
        }
    }

    #[test]
    fn record_block_layout() {
        let dir = std::env::temp_dir().join(format!("olimkb-writer-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("kb.txt");

        let mut writer = CorpusWriter::create(&path).unwrap();
        writer.write_record(&sample()).unwrap();
        writer.finish().unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let rule = "=".repeat(RULE_WIDTH);
        assert!(text.starts_with(&rule));
        assert!(text.contains("Название: Тест\n"));
        assert!(text.contains("Ссылка: https://www.gov.il/ru/page\n"));
        assert!(text.contains("Источник: gov.il\n"));
        assert!(text.contains("Дата парсинга: 2024-01-15 08:00:00\n"));
        assert!(text.contains(&"-".repeat(RULE_WIDTH)));
        assert!(text.contains("Формы для заполнения:\n📄 https://www.gov.il/form.docx\n"));
        assert!(text.contains("Правовой документ (PDF):\n📑 https://www.gov.il/doc.pdf\n"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn optional_blocks_omitted_when_empty() {
        let dir = std::env::temp_dir().join(format!("olimkb-writer2-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("kb.txt");

        let mut record = sample();
        record.form_links.clear();
        record.attachments.clear();

        let mut writer = CorpusWriter::create(&path).unwrap();
        writer.write_record(&record).unwrap();
        writer.finish().unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(!text.contains(FORMS_HEADER));
        assert!(!text.contains(ATTACHMENT_HEADER));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
