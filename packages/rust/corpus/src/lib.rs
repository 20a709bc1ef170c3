//! Corpus file format: writer, conformant reader, and the cleaning pass.
//!
//! The corpus is a flat UTF-8 text file of appended records, one per
//! accepted page. The writer owns the file handle exclusively for the
//! duration of a crawl run; the reader re-parses records losslessly; the
//! cleaner is a standalone normalization pass over a finished corpus.

pub mod cleaner;
pub mod reader;
pub mod writer;

pub use cleaner::{CleanStats, clean_corpus, clean_file};
pub use reader::read_corpus;
pub use writer::CorpusWriter;

#[cfg(test)]
mod roundtrip_tests {
    use super::*;
    use chrono::NaiveDateTime;
    use olimkb_shared::{AttachmentText, CorpusRecord, TIMESTAMP_FORMAT};

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).unwrap()
    }

    fn full_record() -> CorpusRecord {
        CorpusRecord {
            title: "Корзина абсорбции".into(),
            source_url: "https://www.gov.il/ru/departments/guides/sal_klita".into(),
            source_label: "gov.il".into(),
            fetched_at: ts("2024-03-01 12:30:00"),
            body: "Новые репатрианты получают корзину абсорбции в первые месяцы после репатриации.".into(),
            form_links: vec![
                "https://www.gov.il/blobFolder/form101.docx".into(),
                "https://www.gov.il/blobFolder/form102.xlsx".into(),
            ],
            attachments: vec![AttachmentText {
                url: "https://www.gov.il/blobFolder/guide.pdf".into(),
                text: "Размер выплат зависит от состава семьи репатрианта.".into(),
            }],
        }
    }

    fn bare_record() -> CorpusRecord {
        CorpusRecord {
            title: "Ульпан".into(),
            source_url: "https://www.kolzchut.org.il/ru/Ульпан".into(),
            source_label: "kolzchut".into(),
            fetched_at: ts("2024-03-01 12:31:05"),
            body: "Ульпан для изучения иврита доступен каждому новому репатрианту.".into(),
            form_links: vec![],
            attachments: vec![],
        }
    }

    #[test]
    fn write_then_read_is_lossless() {
        let dir = std::env::temp_dir().join(format!("olimkb-roundtrip-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("kb.txt");

        let records = vec![full_record(), bare_record()];
        {
            let mut writer = CorpusWriter::create(&path).unwrap();
            for record in &records {
                writer.write_record(record).unwrap();
            }
            writer.finish().unwrap();
        }

        let text = std::fs::read_to_string(&path).unwrap();
        let parsed = read_corpus(&text).unwrap();
        assert_eq!(parsed, records);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn reader_tolerates_absent_optional_blocks() {
        let dir = std::env::temp_dir().join(format!("olimkb-bare-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("kb.txt");

        {
            let mut writer = CorpusWriter::create(&path).unwrap();
            writer.write_record(&bare_record()).unwrap();
            writer.finish().unwrap();
        }

        let text = std::fs::read_to_string(&path).unwrap();
        let parsed = read_corpus(&text).unwrap();
        assert_eq!(parsed.len(), 1);
        assert!(parsed[0].form_links.is_empty());
        assert!(parsed[0].attachments.is_empty());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
