//! Outbound link classification.
//!
//! Every `href` harvested from a page is routed into exactly one of three
//! buckets: follow it as a page, treat it as a linked document (form or
//! PDF), or skip it. Resolution against the page URL is the only
//! canonicalization performed — query strings and fragments survive, so two
//! URLs differing only in a query string stay distinct.

use std::path::Path;

use url::Url;

use olimkb_shared::CrawlSettings;

/// Where a classified link goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkClass {
    /// Not worth following: fragment-only, scripted, mail, insecure, or an
    /// excluded topic.
    Skip,
    /// A crawlable page, enqueued on the frontier.
    Page(Url),
    /// A linked binary document.
    Document(DocKind, Url),
}

/// Document link flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocKind {
    /// Fill-in form family (doc/xls/rtf/odt/zip); listed in the corpus
    /// record but never fetched.
    Form,
    /// PDF; downloaded and text-extracted.
    Pdf,
}

/// Routes outbound links by extension, scheme, and topic exclusion list.
#[derive(Debug, Clone)]
pub struct LinkClassifier {
    form_extensions: Vec<String>,
    pdf_extensions: Vec<String>,
    exclude_topics: Vec<String>,
    /// Page links must be https; relaxed only for mock-server tests.
    require_https: bool,
}

impl LinkClassifier {
    pub fn new(settings: &CrawlSettings) -> Self {
        Self {
            form_extensions: lowercased(&settings.form_extensions),
            pdf_extensions: lowercased(&settings.pdf_extensions),
            exclude_topics: settings.exclude_topics.clone(),
            require_https: true,
        }
    }

    /// Accept plain-http page links (for integration tests with mock servers).
    #[cfg(test)]
    pub(crate) fn allow_insecure(mut self) -> Self {
        self.require_https = false;
        self
    }

    /// Classify `href` as found on the page at `base`.
    pub fn classify(&self, base: &Url, href: &str) -> LinkClass {
        // Fragment-only targets point back into the same page.
        if href.starts_with('#') {
            return LinkClass::Skip;
        }

        let Ok(resolved) = base.join(href) else {
            return LinkClass::Skip;
        };

        match resolved.scheme() {
            "javascript" | "mailto" => return LinkClass::Skip,
            _ => {}
        }

        if let Some(ext) = path_extension(&resolved) {
            if self.form_extensions.iter().any(|e| *e == ext) {
                return LinkClass::Document(DocKind::Form, resolved);
            }
            if self.pdf_extensions.iter().any(|e| *e == ext) {
                return LinkClass::Document(DocKind::Pdf, resolved);
            }
        }

        let scheme_ok = match resolved.scheme() {
            "https" => true,
            "http" => !self.require_https,
            _ => false,
        };

        let full = resolved.as_str();
        if scheme_ok && !self.exclude_topics.iter().any(|t| full.contains(t)) {
            return LinkClass::Page(resolved);
        }

        LinkClass::Skip
    }
}

fn lowercased(items: &[String]) -> Vec<String> {
    items.iter().map(|s| s.to_lowercase()).collect()
}

/// Lowercased file extension of the URL path, if any.
fn path_extension(url: &Url) -> Option<String> {
    Path::new(url.path())
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}
