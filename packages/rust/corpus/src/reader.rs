//! Conformant reader for the corpus file format.
//!
//! Splits on the `=` boundary rule, parses the fixed field lines, and
//! tolerates absent forms/attachment blocks. Everything the writer emits
//! must parse back without loss.

use chrono::NaiveDateTime;

use olimkb_shared::{AttachmentText, CorpusRecord, OlimKbError, Result, TIMESTAMP_FORMAT};

use crate::writer::{ATTACHMENT_BULLET, ATTACHMENT_HEADER, FORM_BULLET, FORMS_HEADER};

/// Parse an entire corpus file back into records.
pub fn read_corpus(text: &str) -> Result<Vec<CorpusRecord>> {
    let mut records = Vec::new();
    let mut block: Vec<&str> = Vec::new();

    for line in text.lines() {
        if is_rule(line, '=') {
            if !block.is_empty() {
                records.push(parse_record(&block)?);
                block.clear();
            }
        } else {
            block.push(line);
        }
    }
    if !block.is_empty() {
        records.push(parse_record(&block)?);
    }

    Ok(records)
}

/// A separator rule: a line of at least ten repeated `ch` and nothing else.
fn is_rule(line: &str, ch: char) -> bool {
    let trimmed = line.trim_end();
    trimmed.chars().count() >= 10 && trimmed.chars().all(|c| c == ch)
}

fn parse_record(lines: &[&str]) -> Result<CorpusRecord> {
    let mut iter = lines.iter();

    let title = expect_field(&mut iter, "Название:")?;
    let source_url = expect_field(&mut iter, "Ссылка:")?;
    let source_label = expect_field(&mut iter, "Источник:")?;
    let timestamp = expect_field(&mut iter, "Дата парсинга:")?;

    let fetched_at = NaiveDateTime::parse_from_str(&timestamp, TIMESTAMP_FORMAT)
        .map_err(|e| OlimKbError::parse(format!("bad timestamp '{timestamp}': {e}")))?;

    // Field separator rule, then body and optional blocks.
    match iter.next() {
        Some(line) if is_rule(line, '-') => {}
        other => {
            return Err(OlimKbError::parse(format!(
                "expected field separator rule, got {other:?}"
            )));
        }
    }

    let mut body_lines: Vec<&str> = Vec::new();
    let mut form_links: Vec<String> = Vec::new();
    let mut attachments: Vec<AttachmentText> = Vec::new();
    let mut pending: Option<(String, Vec<&str>)> = None;

    #[derive(PartialEq)]
    enum Section {
        Body,
        Forms,
        Attachment,
    }
    let mut section = Section::Body;

    for &line in iter {
        if line == FORMS_HEADER {
            flush_attachment(&mut pending, &mut attachments);
            section = Section::Forms;
            continue;
        }
        if line == ATTACHMENT_HEADER {
            flush_attachment(&mut pending, &mut attachments);
            section = Section::Attachment;
            continue;
        }

        match section {
            Section::Body => body_lines.push(line),
            Section::Forms => {
                if let Some(url) = line.strip_prefix(FORM_BULLET) {
                    form_links.push(url.trim().to_string());
                }
                // blank separator lines are ignored
            }
            Section::Attachment => {
                if let Some(url) = line.strip_prefix(ATTACHMENT_BULLET) {
                    flush_attachment(&mut pending, &mut attachments);
                    pending = Some((url.trim().to_string(), Vec::new()));
                } else if let Some((_, text)) = pending.as_mut() {
                    if !line.trim().is_empty() {
                        text.push(line);
                    }
                }
            }
        }
    }
    flush_attachment(&mut pending, &mut attachments);

    // Trim blank lines at the body's edges; inner structure is preserved.
    while body_lines.first().is_some_and(|l| l.trim().is_empty()) {
        body_lines.remove(0);
    }
    while body_lines.last().is_some_and(|l| l.trim().is_empty()) {
        body_lines.pop();
    }

    Ok(CorpusRecord {
        title,
        source_url,
        source_label,
        fetched_at,
        body: body_lines.join("\n"),
        form_links,
        attachments,
    })
}

fn flush_attachment(pending: &mut Option<(String, Vec<&str>)>, out: &mut Vec<AttachmentText>) {
    if let Some((url, lines)) = pending.take() {
        out.push(AttachmentText {
            url,
            text: lines.join("\n"),
        });
    }
}

fn expect_field(iter: &mut std::slice::Iter<'_, &str>, label: &str) -> Result<String> {
    match iter.next() {
        Some(line) => line
            .strip_prefix(label)
            .map(|v| v.trim().to_string())
            .ok_or_else(|| {
                OlimKbError::parse(format!("expected '{label}' field, got '{line}'"))
            }),
        None => Err(OlimKbError::parse(format!(
            "truncated record: missing '{label}' field"
        ))),
    }
}
