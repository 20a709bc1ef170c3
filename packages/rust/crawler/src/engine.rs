//! Breadth-first frontier crawler.
//!
//! The crawler is the sole driver of the acquisition side: it owns the
//! visit queue, the visited set, and the crawl bounds, and it drives
//! fetch → classify → extract links → extract attachments → write. Its only
//! durable output is the corpus file. Single worker, one request in flight,
//! strict FIFO order.

use std::collections::{HashSet, VecDeque};
use std::time::{Duration, Instant};

use chrono::Local;
use tracing::{debug, info, instrument, warn};
use url::Url;

use olimkb_corpus::CorpusWriter;
use olimkb_shared::{
    AttachmentText, CorpusRecord, CrawlSettings, FilterSettings, Result, SourceSettings,
};
use olimkb_text::RelevanceFilter;

use crate::attachments::AttachmentExtractor;
use crate::fetch::PageFetcher;
use crate::links::{DocKind, LinkClass, LinkClassifier};

/// One unit of frontier work.
#[derive(Debug, Clone)]
struct FrontierEntry {
    url: Url,
    depth: u32,
}

/// Terminal outcome of one dequeued frontier entry.
///
/// Every entry lands in exactly one of these; the per-stage failure
/// contract (nothing but a corpus write error aborts the crawl) hangs off
/// this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryOutcome {
    /// Already processed earlier in this run.
    SkippedVisited,
    /// Deeper than the depth cap.
    SkippedDepth,
    /// Transport error or non-2xx status; abandoned for this run.
    FetchFailed,
    /// Failed the relevance gate; its links contribute nothing.
    Irrelevant,
    /// Written to the corpus.
    Accepted,
}

/// Final counters for a crawl run.
#[derive(Debug, Clone)]
pub struct CrawlReport {
    /// Pages accepted into the corpus.
    pub pages: usize,
    /// PDF attachments whose text made it into a record.
    pub attachments: usize,
    /// Form links recorded across all pages.
    pub forms: usize,
    /// Entries abandoned on fetch errors.
    pub fetch_failures: usize,
    /// Pages rejected by the relevance gate.
    pub rejected: usize,
    /// Entries discarded as already-visited or too deep.
    pub skipped: usize,
    /// Wall-clock duration of the run.
    pub duration: Duration,
}

/// Progress callback so the CLI can narrate a long crawl.
pub trait CrawlProgress: Send + Sync {
    /// Called right before an entry is fetched.
    fn page(&self, url: &str, accepted: usize, cap: usize);
}

/// No-op reporter for headless/test usage.
pub struct SilentProgress;

impl CrawlProgress for SilentProgress {
    fn page(&self, _url: &str, _accepted: usize, _cap: usize) {}
}

/// Breadth-first crawler over the configured start URLs.
pub struct Crawler {
    settings: CrawlSettings,
    sources: SourceSettings,
    fetcher: PageFetcher,
    attachments: AttachmentExtractor,
    links: LinkClassifier,
    filter: RelevanceFilter,
}

impl Crawler {
    /// Build a crawler from configuration. Creates the docs directory.
    pub fn new(
        settings: CrawlSettings,
        filter_settings: &FilterSettings,
        sources: SourceSettings,
    ) -> Result<Self> {
        let filter = RelevanceFilter::new(filter_settings);
        let fetcher = PageFetcher::new(&settings)?;
        let attachments = AttachmentExtractor::new(&settings, filter.clone())?;
        let links = LinkClassifier::new(&settings);

        Ok(Self {
            settings,
            sources,
            fetcher,
            attachments,
            links,
            filter,
        })
    }

    /// Follow plain-http page links (for integration tests with mock servers).
    #[cfg(test)]
    fn allow_insecure(mut self) -> Self {
        self.links = self.links.allow_insecure();
        self
    }

    /// Run the crawl, streaming accepted records into `writer`.
    ///
    /// Per-entry failures are logged and non-fatal; only a corpus write
    /// error aborts the run. The caller must ensure at most one crawl
    /// writes to a given corpus file at a time.
    #[instrument(skip_all, fields(max_pages = self.settings.max_pages, max_depth = self.settings.max_depth))]
    pub async fn crawl(
        &self,
        writer: &mut CorpusWriter,
        progress: &dyn CrawlProgress,
    ) -> Result<CrawlReport> {
        let start_time = Instant::now();

        let mut frontier: VecDeque<FrontierEntry> = VecDeque::new();
        for raw in &self.settings.start_urls {
            match Url::parse(raw) {
                Ok(url) => frontier.push_back(FrontierEntry { url, depth: 0 }),
                Err(e) => warn!(url = raw, error = %e, "invalid start URL, skipping"),
            }
        }

        let mut visited: HashSet<String> = HashSet::new();
        let mut report = CrawlReport {
            pages: 0,
            attachments: 0,
            forms: 0,
            fetch_failures: 0,
            rejected: 0,
            skipped: 0,
            duration: Duration::ZERO,
        };

        info!(seeds = frontier.len(), "starting crawl");

        while report.pages < self.settings.max_pages {
            let Some(entry) = frontier.pop_front() else {
                break;
            };

            let outcome = self
                .process_entry(&entry, &mut frontier, &mut visited, writer, &mut report, progress)
                .await?;

            debug!(url = %entry.url, depth = entry.depth, ?outcome, "entry processed");

            match outcome {
                EntryOutcome::SkippedVisited | EntryOutcome::SkippedDepth => report.skipped += 1,
                EntryOutcome::FetchFailed => report.fetch_failures += 1,
                EntryOutcome::Irrelevant => report.rejected += 1,
                EntryOutcome::Accepted => {
                    // Politeness delay between accepted pages only; skips
                    // and failures cost the server nothing.
                    if self.settings.delay_ms > 0 {
                        tokio::time::sleep(Duration::from_millis(self.settings.delay_ms)).await;
                    }
                }
            }
        }

        report.duration = start_time.elapsed();
        info!(
            pages = report.pages,
            attachments = report.attachments,
            forms = report.forms,
            fetch_failures = report.fetch_failures,
            rejected = report.rejected,
            duration_ms = report.duration.as_millis(),
            "crawl completed"
        );

        Ok(report)
    }

    /// Drive one frontier entry to its terminal outcome.
    async fn process_entry(
        &self,
        entry: &FrontierEntry,
        frontier: &mut VecDeque<FrontierEntry>,
        visited: &mut HashSet<String>,
        writer: &mut CorpusWriter,
        report: &mut CrawlReport,
        progress: &dyn CrawlProgress,
    ) -> Result<EntryOutcome> {
        // Dedup is checked at dequeue: the same URL may sit in the frontier
        // more than once, but is processed at most once per run.
        if visited.contains(entry.url.as_str()) {
            return Ok(EntryOutcome::SkippedVisited);
        }
        if entry.depth > self.settings.max_depth {
            return Ok(EntryOutcome::SkippedDepth);
        }

        // Visited before any fetch or relevance check: failed and rejected
        // URLs are never retried via another link.
        visited.insert(entry.url.as_str().to_string());

        progress.page(entry.url.as_str(), report.pages, self.settings.max_pages);

        let doc = match self.fetcher.fetch_page(&entry.url).await {
            Ok(doc) => doc,
            Err(e) => {
                warn!(url = %entry.url, error = %e, "fetch failed");
                return Ok(EntryOutcome::FetchFailed);
            }
        };

        if !self.filter.is_relevant(&doc.body) {
            // An irrelevant page contributes nothing — not even its links.
            return Ok(EntryOutcome::Irrelevant);
        }

        let mut form_links: Vec<String> = Vec::new();
        let mut pdf_links: Vec<Url> = Vec::new();

        for href in &doc.links {
            match self.links.classify(&entry.url, href) {
                LinkClass::Skip => {}
                LinkClass::Page(url) => {
                    if !visited.contains(url.as_str()) {
                        frontier.push_back(FrontierEntry {
                            url,
                            depth: entry.depth + 1,
                        });
                    }
                }
                LinkClass::Document(DocKind::Form, url) => form_links.push(url.into()),
                LinkClass::Document(DocKind::Pdf, url) => pdf_links.push(url),
            }
        }

        report.forms += form_links.len();

        let mut attachments: Vec<AttachmentText> = Vec::new();
        for pdf_url in &pdf_links {
            let text = self.attachments.fetch_attachment(pdf_url, &doc.title).await;
            if !text.is_empty() {
                attachments.push(AttachmentText {
                    url: pdf_url.as_str().to_string(),
                    text,
                });
            }
        }
        report.attachments += attachments.len();

        let record = CorpusRecord {
            title: doc.title,
            source_url: entry.url.as_str().to_string(),
            source_label: self.sources.label_for(entry.url.as_str()).to_string(),
            fetched_at: Local::now().naive_local(),
            body: doc.body,
            form_links,
            attachments,
        };

        // Streaming append; an I/O error here is fatal to the run.
        writer.write_record(&record)?;
        report.pages += 1;

        Ok(EntryOutcome::Accepted)
    }
}

#[cfg(test)]
mod crawl_tests {
    use super::*;
    use olimkb_corpus::read_corpus;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const RELEVANT_BODY: &str =
        "<p>Новые репатрианты получают корзину абсорбции и место в ульпане.</p>";

    fn page(title: &str, extra: &str) -> String {
        format!("<html><body><main><h1>{title}</h1>{RELEVANT_BODY}{extra}</main></body></html>")
    }

    fn test_settings(server_uri: &str, tmp: &std::path::Path) -> CrawlSettings {
        CrawlSettings {
            start_urls: vec![format!("{server_uri}/")],
            max_pages: 50,
            max_depth: 4,
            delay_ms: 0,
            docs_dir: tmp.join("docs").to_string_lossy().into_owned(),
            ..CrawlSettings::default()
        }
    }

    async fn run_crawl(
        settings: CrawlSettings,
        tmp: &std::path::Path,
    ) -> (CrawlReport, Vec<CorpusRecord>) {
        let crawler = Crawler::new(
            settings,
            &FilterSettings::default(),
            SourceSettings::default(),
        )
        .unwrap()
        .allow_insecure();

        let corpus_path = tmp.join("kb.txt");
        let mut writer = CorpusWriter::create(&corpus_path).unwrap();
        let report = crawler.crawl(&mut writer, &SilentProgress).await.unwrap();
        writer.finish().unwrap();

        let text = std::fs::read_to_string(&corpus_path).unwrap();
        (report, read_corpus(&text).unwrap())
    }

    fn tmp_dir(tag: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("olimkb-engine-{tag}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn irrelevant_seed_produces_no_records_and_no_children() {
        let server = MockServer::start().await;

        // The seed page has links but zero keywords; its children must
        // never be requested.
        let seed = r#"<html><body><main>
            <h1>Weather</h1>
            <p>Forecast for the coming week is sunny with light winds.</p>
            <a href="/child">child</a>
        </main></body></html>"#;

        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(seed))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/child"))
            .respond_with(ResponseTemplate::new(200).set_body_string(page("Child", "")))
            .expect(0)
            .mount(&server)
            .await;

        let tmp = tmp_dir("irrelevant");
        let (report, records) = run_crawl(test_settings(&server.uri(), &tmp), &tmp).await;

        assert_eq!(report.pages, 0);
        assert_eq!(report.rejected, 1);
        assert!(records.is_empty());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn visited_urls_are_never_refetched() {
        let server = MockServer::start().await;

        // The two pages link to each other; each must be fetched exactly
        // once, enforced by the mocks' expected call counts.
        let a = page("Страница А", &format!(r#"<a href="{}/b">b</a>"#, server.uri()));
        let b = page("Страница Б", &format!(r#"<a href="{}/">a</a>"#, server.uri()));

        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(a))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/b"))
            .respond_with(ResponseTemplate::new(200).set_body_string(b))
            .expect(1)
            .mount(&server)
            .await;

        let tmp = tmp_dir("visited");
        let (report, records) = run_crawl(test_settings(&server.uri(), &tmp), &tmp).await;

        assert_eq!(report.pages, 2);
        assert_eq!(records.len(), 2);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn page_cap_bounds_accepted_pages() {
        let server = MockServer::start().await;

        // A chain of pages longer than the cap.
        for i in 0..6u32 {
            let next = format!(r#"<a href="{}/p{}">next</a>"#, server.uri(), i + 1);
            let body = page(&format!("Страница {i}"), &next);
            let p = if i == 0 {
                "/".to_string()
            } else {
                format!("/p{i}")
            };
            Mock::given(method("GET"))
                .and(path(p.as_str()))
                .respond_with(ResponseTemplate::new(200).set_body_string(body))
                .mount(&server)
                .await;
        }

        let tmp = tmp_dir("cap");
        let mut settings = test_settings(&server.uri(), &tmp);
        settings.max_pages = 3;
        settings.max_depth = 100;
        let (report, records) = run_crawl(settings, &tmp).await;

        assert_eq!(report.pages, 3);
        assert_eq!(records.len(), 3);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn depth_cap_discards_deep_entries() {
        let server = MockServer::start().await;

        for i in 0..4u32 {
            let next = format!(r#"<a href="{}/p{}">next</a>"#, server.uri(), i + 1);
            let body = page(&format!("Страница {i}"), &next);
            let p = if i == 0 {
                "/".to_string()
            } else {
                format!("/p{i}")
            };
            Mock::given(method("GET"))
                .and(path(p.as_str()))
                .respond_with(ResponseTemplate::new(200).set_body_string(body))
                .mount(&server)
                .await;
        }

        let tmp = tmp_dir("depth");
        let mut settings = test_settings(&server.uri(), &tmp);
        settings.max_depth = 1;
        let (report, _records) = run_crawl(settings, &tmp).await;

        // Depth 0 and 1 accepted; the depth-2 entry is discarded unfetched.
        assert_eq!(report.pages, 2);
        assert_eq!(report.skipped, 1);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn fetch_failures_are_non_fatal() {
        let server = MockServer::start().await;

        let seed = page(
            "Стартовая",
            &format!(r#"<a href="{}/missing">x</a>"#, server.uri()),
        );
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(seed))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let tmp = tmp_dir("failures");
        let (report, records) = run_crawl(test_settings(&server.uri(), &tmp), &tmp).await;

        assert_eq!(report.pages, 1);
        assert_eq!(report.fetch_failures, 1);
        assert_eq!(records.len(), 1);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn forms_are_listed_but_not_fetched() {
        let server = MockServer::start().await;

        let seed = page(
            "Формы",
            &format!(r#"<a href="{}/form101.docx">форма</a>"#, server.uri()),
        );
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(seed))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/form101.docx"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let tmp = tmp_dir("forms");
        let (report, records) = run_crawl(test_settings(&server.uri(), &tmp), &tmp).await;

        assert_eq!(report.pages, 1);
        assert_eq!(report.forms, 1);
        assert_eq!(records[0].form_links.len(), 1);
        assert!(records[0].form_links[0].ends_with("/form101.docx"));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn broken_pdf_attachment_is_omitted_but_page_kept() {
        let server = MockServer::start().await;

        let seed = page(
            "С документом",
            &format!(r#"<a href="{}/guide.pdf">документ</a>"#, server.uri()),
        );
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(seed))
            .mount(&server)
            .await;
        // Garbage bytes: pdf extraction fails, attachment omitted, page kept.
        Mock::given(method("GET"))
            .and(path("/guide.pdf"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"junk".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let tmp = tmp_dir("pdf");
        let (report, records) = run_crawl(test_settings(&server.uri(), &tmp), &tmp).await;

        assert_eq!(report.pages, 1);
        assert_eq!(report.attachments, 0);
        assert!(records[0].attachments.is_empty());

        let _ = std::fs::remove_dir_all(&tmp);
    }
}
