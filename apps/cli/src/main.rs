//! OlimKB CLI — knowledge-base acquisition and retrieval for
//! aliyah/absorption content.
//!
//! Crawls the configured government/NGO portals into a flat corpus file,
//! cleans it, and answers "best passages for this question" over it.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
