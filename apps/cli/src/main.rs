//! SiteSync CLI: crawl a website into a CustomGPT project.
//!
//! Crawls the site with Apify, uploads every page with its metadata, waits
//! for remote indexing, and optionally asks a smoke-test question.

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
