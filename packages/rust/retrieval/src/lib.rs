//! Lexical passage retrieval over the corpus file.
//!
//! A pure bag-of-words overlap ranker: the corpus is split into blank-line
//! delimited passages, each passage is scored by how many of its tokens
//! (with repetition) appear in the query's token set, and the top-k
//! passages are returned joined by blank lines. No TF-IDF normalization,
//! no length penalty, no stemming — the ranking is deliberately simple and
//! fully deterministic.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use olimkb_shared::RetrievalSettings;

/// Maximal runs of alphanumeric/hyphen/apostrophe characters, both
/// alphabets. Case folding happens after matching.
static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-zА-Яа-яЁё0-9'\-]+").expect("valid regex"));

/// Blank-line passage boundary (any whitespace-only line).
static PASSAGE_SPLIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n").expect("valid regex"));

/// Query tokens this short carry no signal and are excluded from the set.
const MIN_QUERY_TOKEN_CHARS: usize = 3;

/// Stateless-per-call passage ranker.
///
/// Construct once from config; every [`Retriever::retrieve`] call re-derives
/// passages from the corpus text it is given, so the engine never holds
/// state between questions and is independent of the crawler's lifetime.
#[derive(Debug, Clone)]
pub struct Retriever {
    settings: RetrievalSettings,
}

impl Retriever {
    pub fn new(settings: RetrievalSettings) -> Self {
        Self { settings }
    }

    /// Return the best-matching context for `query`, joined with blank
    /// lines. Empty string when no passage shares a token with the query —
    /// a valid outcome callers must handle by declining to answer.
    pub fn retrieve(&self, corpus: &str, query: &str) -> String {
        self.retrieve_top(corpus, query, self.settings.top_k)
    }

    /// Same as [`Retriever::retrieve`] with an explicit `k`.
    pub fn retrieve_top(&self, corpus: &str, query: &str, k: usize) -> String {
        let passages = split_passages(corpus, self.settings.min_passage_chars);
        let query_set = query_token_set(query);

        let mut scored: Vec<(usize, &str)> = passages
            .iter()
            .filter_map(|p| {
                let score = tokenize(p).filter(|t| query_set.contains(t)).count();
                (score > 0).then_some((score, *p))
            })
            .collect();

        // Stable sort: ties keep original passage order.
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        let context = scored
            .iter()
            .take(k)
            .map(|(_, p)| *p)
            .collect::<Vec<_>>()
            .join("\n\n");

        debug!(
            passages = passages.len(),
            matched = scored.len(),
            context_chars = context.chars().count(),
            "context selected"
        );
        context
    }
}

/// Split corpus text into trimmed passages of at least `min_chars`
/// characters. The whitespace-tolerant boundary pattern makes CRLF corpora
/// split the same way as LF ones.
pub fn split_passages(text: &str, min_chars: usize) -> Vec<&str> {
    PASSAGE_SPLIT_RE
        .split(text)
        .map(str::trim)
        .filter(|p| p.chars().count() >= min_chars)
        .collect()
}

/// Case-folded tokens of `text`, in order, repetitions kept.
fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    TOKEN_RE.find_iter(text).map(|m| m.as_str().to_lowercase())
}

/// The query's token set: case-folded, short tokens excluded.
fn query_token_set(query: &str) -> HashSet<String> {
    tokenize(query)
        .filter(|t| t.chars().count() >= MIN_QUERY_TOKEN_CHARS)
        .collect()
}
