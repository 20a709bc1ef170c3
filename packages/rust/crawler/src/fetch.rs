//! Page fetching and text/link extraction.

use std::time::Duration;

use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

use olimkb_shared::{CrawlSettings, OlimKbError, Result};
use olimkb_text::normalize;

/// Browser-like identifying header; some government portals refuse
/// requests without one.
const USER_AGENT: &str = "Mozilla/5.0";

/// Placeholder when a page has neither a heading nor a title element.
const UNTITLED: &str = "Без названия";

/// A fetched page, alive only while its frontier entry is processed.
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    /// First heading text, document title, or a fixed placeholder.
    pub title: String,
    /// Normalized body text, one block per line.
    pub body: String,
    /// Raw `href` values of every anchor; classification happens later.
    pub links: Vec<String>,
}

/// HTTP fetcher + HTML extractor for crawlable pages.
pub struct PageFetcher {
    client: Client,
    min_block_chars: usize,
}

impl PageFetcher {
    pub fn new(settings: &CrawlSettings) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(Duration::from_secs(settings.page_timeout_secs))
            .build()
            .map_err(|e| OlimKbError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            min_block_chars: settings.min_block_chars,
        })
    }

    /// Fetch a page and extract title, body text, and outbound links.
    ///
    /// Any transport error or non-2xx status is an [`OlimKbError::Network`];
    /// the crawl logs it and moves on — no retries.
    pub async fn fetch_page(&self, url: &Url) -> Result<FetchedDocument> {
        debug!(%url, "fetching page");

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

        let html = response
            .text()
            .await
            .map_err(|e| OlimKbError::Network(format!("{url}: body read failed: {e}")))?;

        Ok(extract_document(&html, self.min_block_chars))
    }
}

/// Extract title, body blocks, and anchors from an HTML document.
///
/// The body is built from paragraph, list-item, sub-heading, and generic
/// block elements inside `<main>` (the whole document when there is no
/// main region); blocks at or below the length floor are boilerplate and
/// dropped. This is a coarse filter, not a content-extraction algorithm.
pub(crate) fn extract_document(html: &str, min_block_chars: usize) -> FetchedDocument {
    let doc = Html::parse_document(html);

    let h1_sel = Selector::parse("h1").unwrap();
    let title_sel = Selector::parse("title").unwrap();
    let main_sel = Selector::parse("main").unwrap();
    let block_sel = Selector::parse("p, li, h2, h3, div").unwrap();
    let anchor_sel = Selector::parse("a[href]").unwrap();

    let title = doc
        .select(&h1_sel)
        .next()
        .or_else(|| doc.select(&title_sel).next())
        .map(|el| normalize(&el.text().collect::<String>()))
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| UNTITLED.to_string());

    let blocks: Vec<String> = match doc.select(&main_sel).next() {
        Some(main) => collect_blocks(main.select(&block_sel), min_block_chars),
        None => collect_blocks(doc.select(&block_sel), min_block_chars),
    };

    let links = doc
        .select(&anchor_sel)
        .filter_map(|el| el.value().attr("href"))
        .map(String::from)
        .collect();

    FetchedDocument {
        title,
        body: blocks.join("\n"),
        links,
    }
}

fn collect_blocks<'a>(
    elements: impl Iterator<Item = ElementRef<'a>>,
    min_chars: usize,
) -> Vec<String> {
    elements
        .map(|el| normalize(&el.text().collect::<String>()))
        .filter(|text| text.chars().count() > min_chars)
        .collect()
}
