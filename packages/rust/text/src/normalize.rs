//! Whitespace and control-character normalization.

/// Normalize a block of raw extracted text.
///
/// Maps control characters (form feeds from PDF extraction, stray NULs) to
/// spaces, collapses every whitespace run — including newlines — to a single
/// space, and trims the ends. Pure and total; `normalize(normalize(x)) ==
/// normalize(x)` for all inputs.
pub fn normalize(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
