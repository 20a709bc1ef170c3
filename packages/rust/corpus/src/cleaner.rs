//! Standalone cleaning pass over a finished corpus file.
//!
//! Scrubs each line down to Russian text plus basic punctuation, drops
//! short/noise/boilerplate lines, and deduplicates exact lines while
//! preserving first-seen order. The output is the compact text fed to
//! retrieval experiments; the raw corpus file stays untouched.

use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::info;

use olimkb_shared::{CleanerSettings, OlimKbError, Result};

/// Counters reported by a cleaning run.
#[derive(Debug, Clone, Copy)]
pub struct CleanStats {
    /// Lines read from the input.
    pub lines_in: usize,
    /// Lines surviving all filters and deduplication.
    pub lines_kept: usize,
}

/// Everything outside Russian letters, digits, whitespace, and basic
/// punctuation is noise (record rules, emoji bullets, Latin boilerplate).
static NOISE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[^А-Яа-яЁё0-9\s.,!?\-:;"'()\[\]]+"#).expect("valid regex")
});

/// Clean a corpus text in memory.
pub fn clean_corpus(input: &str, settings: &CleanerSettings) -> (String, CleanStats) {
    let exclude: Vec<String> = settings
        .exclude_substrings
        .iter()
        .map(|s| s.to_lowercase())
        .collect();

    let mut seen: HashSet<String> = HashSet::new();
    let mut kept: Vec<String> = Vec::new();
    let mut lines_in = 0usize;

    for raw_line in input.lines() {
        lines_in += 1;
        let line = scrub_line(raw_line);
        if !is_valid_line(&line, settings.min_line_chars, &exclude) {
            continue;
        }
        if seen.insert(line.clone()) {
            kept.push(line);
        }
    }

    let stats = CleanStats {
        lines_in,
        lines_kept: kept.len(),
    };
    (kept.join("\n"), stats)
}

/// Clean `input` and write the result to `output`.
pub fn clean_file(input: &Path, output: &Path, settings: &CleanerSettings) -> Result<CleanStats> {
    let text = std::fs::read_to_string(input).map_err(|e| OlimKbError::io(input, e))?;
    let (cleaned, stats) = clean_corpus(&text, settings);
    std::fs::write(output, cleaned).map_err(|e| OlimKbError::io(output, e))?;

    info!(
        input = %input.display(),
        output = %output.display(),
        lines_in = stats.lines_in,
        lines_kept = stats.lines_kept,
        "cleaning pass complete"
    );
    Ok(stats)
}

fn scrub_line(line: &str) -> String {
    NOISE_RE.replace_all(line, "").trim().to_string()
}

fn is_valid_line(line: &str, min_chars: usize, exclude_lower: &[String]) -> bool {
    if line.chars().count() < min_chars {
        return false;
    }
    if !line.chars().any(is_cyrillic) {
        return false;
    }
    let folded = line.to_lowercase();
    !exclude_lower.iter().any(|sub| folded.contains(sub))
}

fn is_cyrillic(c: char) -> bool {
    ('А'..='я').contains(&c) || c == 'ё' || c == 'Ё'
}
