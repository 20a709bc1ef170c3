//! Content relevance gate: Cyrillic ratio + keyword presence.

use olimkb_shared::FilterSettings;

/// Decides whether a block of text belongs in the knowledge base.
///
/// Two gates, both mandatory:
///
/// 1. **Language gate** — among alphabetic characters, the fraction of
///    Cyrillic ones must exceed the configured threshold. A cheap proxy for
///    "predominantly Russian text", not real language detection: it will
///    accept Russian loanwords inside foreign text and reject Russian pages
///    heavy with numerals or Latin acronyms.
/// 2. **Keyword gate** — the case-folded text must contain at least one
///    configured keyword as a substring. Keywords are truncated stems
///    (e.g. "абсорбц") so inflected forms match without stemming.
#[derive(Debug, Clone)]
pub struct RelevanceFilter {
    min_cyrillic_ratio: f64,
    keywords: Vec<String>,
}

impl RelevanceFilter {
    /// Build a filter from config; keywords are lowercased once here.
    pub fn new(settings: &FilterSettings) -> Self {
        Self {
            min_cyrillic_ratio: settings.cyrillic_ratio,
            keywords: settings
                .keywords
                .iter()
                .map(|k| k.to_lowercase())
                .collect(),
        }
    }

    /// Both gates must pass; no partial-credit scoring.
    pub fn is_relevant(&self, text: &str) -> bool {
        self.cyrillic_ratio_ok(text) && self.has_keyword(text)
    }

    fn cyrillic_ratio_ok(&self, text: &str) -> bool {
        let mut letters = 0usize;
        let mut cyrillic = 0usize;

        for c in text.chars().filter(|c| c.is_alphabetic()) {
            letters += 1;
            if c.to_lowercase().any(is_cyrillic_lower) {
                cyrillic += 1;
            }
        }

        if letters == 0 {
            return false;
        }
        cyrillic as f64 / letters as f64 > self.min_cyrillic_ratio
    }

    fn has_keyword(&self, text: &str) -> bool {
        let folded = text.to_lowercase();
        self.keywords.iter().any(|k| folded.contains(k))
    }
}

/// Lowercase Russian alphabet, `а..я` plus `ё`.
fn is_cyrillic_lower(c: char) -> bool {
    ('а'..='я').contains(&c) || c == 'ё'
}
