//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use olimkb_corpus::{CorpusWriter, clean_file};
use olimkb_crawler::{CrawlProgress, Crawler, DocFormat, decode_document};
use olimkb_retrieval::Retriever;
use olimkb_shared::{AppConfig, init_config, load_config, load_config_from};
use olimkb_text::normalize;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// OlimKB — build and query the aliyah/absorption knowledge base.
#[derive(Parser)]
#[command(
    name = "olimkb",
    version,
    about = "Crawl aliyah/absorption portals into a knowledge base and retrieve context from it.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to an alternate config file (defaults to ~/.olimkb/olimkb.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Crawl the configured portals and rebuild the corpus file.
    Crawl {
        /// Output corpus file (defaults to the configured path).
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Run the cleaning pass over a finished corpus file.
    Clean {
        /// Input corpus file.
        input: PathBuf,
        /// Cleaned output file.
        output: PathBuf,
    },

    /// Retrieve the best-matching passages for a question.
    Retrieve {
        /// The question to match against the knowledge base.
        query: String,

        /// Knowledge-base file (defaults to the configured corpus path).
        #[arg(long)]
        kb: Option<PathBuf>,

        /// Number of passages to return.
        #[arg(long)]
        top_k: Option<usize>,
    },

    /// Convert saved documents (pdf/docx/rtf/txt) into text files.
    ExtractDocs {
        /// Directory of downloaded documents (defaults to the configured docs dir).
        #[arg(long)]
        docs_dir: Option<PathBuf>,

        /// Output directory for extracted text files.
        #[arg(long, default_value = "docs_text")]
        out_dir: PathBuf,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "olimkb=info",
        1 => "olimkb=debug",
        _ => "olimkb=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };

    match cli.command {
        Command::Crawl { out } => cmd_crawl(&config, out.as_deref()).await,
        Command::Clean { input, output } => cmd_clean(&config, &input, &output),
        Command::Retrieve { query, kb, top_k } => {
            cmd_retrieve(&config, &query, kb.as_deref(), top_k)
        }
        Command::ExtractDocs { docs_dir, out_dir } => {
            cmd_extract_docs(&config, docs_dir.as_deref(), &out_dir)
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(&config),
        },
    }
}

// ---------------------------------------------------------------------------
// crawl
// ---------------------------------------------------------------------------

async fn cmd_crawl(config: &AppConfig, out: Option<&Path>) -> Result<()> {
    let mut crawl_settings = config.crawl.clone();
    if let Some(path) = out {
        crawl_settings.output_file = path.to_string_lossy().into_owned();
    }
    let output_path = PathBuf::from(&crawl_settings.output_file);

    info!(
        seeds = crawl_settings.start_urls.len(),
        max_pages = crawl_settings.max_pages,
        max_depth = crawl_settings.max_depth,
        out = %output_path.display(),
        "starting acquisition run"
    );

    let crawler = Crawler::new(crawl_settings, &config.filter, config.sources.clone())?;
    let mut writer = CorpusWriter::create(&output_path)?;

    let reporter = CliProgress::new();
    let report = crawler.crawl(&mut writer, &reporter).await?;
    writer.finish()?;
    reporter.finish();

    println!();
    println!("  Crawl finished.");
    println!("  Pages:        {}", report.pages);
    println!("  Attachments:  {}", report.attachments);
    println!("  Forms:        {}", report.forms);
    println!("  Failures:     {}", report.fetch_failures);
    println!("  Rejected:     {}", report.rejected);
    println!("  Time:         {:.1}s", report.duration.as_secs_f64());
    println!("  Corpus:       {}", output_path.display());
    println!();

    Ok(())
}

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl CrawlProgress for CliProgress {
    fn page(&self, url: &str, accepted: usize, cap: usize) {
        self.spinner
            .set_message(format!("[{accepted}/{cap}] {url}"));
    }
}

// ---------------------------------------------------------------------------
// clean
// ---------------------------------------------------------------------------

fn cmd_clean(config: &AppConfig, input: &Path, output: &Path) -> Result<()> {
    let stats = clean_file(input, output, &config.cleaner)?;

    println!();
    println!("  Cleaning pass finished.");
    println!("  Lines read: {}", stats.lines_in);
    println!("  Lines kept: {}", stats.lines_kept);
    println!("  Output:     {}", output.display());
    println!();

    Ok(())
}

// ---------------------------------------------------------------------------
// retrieve
// ---------------------------------------------------------------------------

fn cmd_retrieve(
    config: &AppConfig,
    query: &str,
    kb: Option<&Path>,
    top_k: Option<usize>,
) -> Result<()> {
    let kb_path = kb
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&config.crawl.output_file));

    let corpus = std::fs::read_to_string(&kb_path)
        .map_err(|e| eyre!("cannot read knowledge base '{}': {e}", kb_path.display()))?;

    let retriever = Retriever::new(config.retrieval.clone());
    let k = top_k.unwrap_or(config.retrieval.top_k);
    let context = retriever.retrieve_top(&corpus, query, k);

    if context.is_empty() {
        // A valid outcome: decline to answer rather than guess.
        println!("No matching passages in the knowledge base for this question.");
        return Ok(());
    }

    info!(context_chars = context.chars().count(), "context selected");
    println!("{context}");

    Ok(())
}

// ---------------------------------------------------------------------------
// extract-docs
// ---------------------------------------------------------------------------

fn cmd_extract_docs(config: &AppConfig, docs_dir: Option<&Path>, out_dir: &Path) -> Result<()> {
    let docs_dir = docs_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&config.crawl.docs_dir));

    std::fs::create_dir_all(out_dir)?;

    let mut converted = 0usize;
    let mut skipped = 0usize;

    for entry in std::fs::read_dir(&docs_dir)
        .map_err(|e| eyre!("cannot read docs dir '{}': {e}", docs_dir.display()))?
    {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let Some(format) = DocFormat::from_path(&path) else {
            skipped += 1;
            continue;
        };

        let bytes = std::fs::read(&path)?;
        let text = match decode_document(format, &bytes) {
            Ok(text) => normalize(&text),
            Err(e) => {
                warn!(file = %path.display(), error = %e, "extraction failed");
                skipped += 1;
                continue;
            }
        };
        if text.is_empty() {
            warn!(file = %path.display(), "no extractable text");
            skipped += 1;
            continue;
        }

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".into());
        std::fs::write(out_dir.join(format!("{stem}.txt")), text)?;
        converted += 1;
    }

    println!();
    println!("  Documents converted: {converted}");
    println!("  Skipped:             {skipped}");
    println!("  Output:              {}", out_dir.display());
    println!();

    Ok(())
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}

fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let rendered = toml::to_string_pretty(config)?;
    println!("{rendered}");
    Ok(())
}
