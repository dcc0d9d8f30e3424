//! CLI command definitions, routing, and tracing setup.

use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Report, Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};
use url::Url;

use sitesync_core::{ProgressReporter, RunSummary, SyncConfig, cancel_pair, sync_site};
use sitesync_crawler::ApifyClient;
use sitesync_customgpt::CustomGptClient;
use sitesync_shared::{AppConfig, UploadResult, UploadStatus, init_config, load_config, read_secret};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// SiteSync: turn a website into a searchable CustomGPT project.
#[derive(Parser)]
#[command(
    name = "sitesync",
    version,
    about = "Crawl a website and index it into a new CustomGPT project.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

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
    /// Crawl a site, upload it to a new project, and wait for indexing.
    Sync(SyncArgs),

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Args)]
pub(crate) struct SyncArgs {
    /// Website URL to crawl.
    pub url: String,

    /// Maximum crawl depth.
    #[arg(long)]
    pub depth: Option<u32>,

    /// Question to ask once indexing finishes.
    #[arg(long)]
    pub prompt: Option<String>,

    /// Seconds between indexing status checks.
    #[arg(long)]
    pub poll_interval: Option<u64>,

    /// Give up waiting for indexing after this many re-checks.
    #[arg(long)]
    pub max_polls: Option<u32>,

    /// Documents uploaded in parallel.
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Print the run summary as JSON.
    #[arg(long)]
    pub json: bool,
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
        0 => "sitesync=info",
        1 => "sitesync=debug",
        _ => "sitesync=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt().with_env_filter(env_filter).with_target(false).init();
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
    match cli.command {
        Command::Sync(args) => cmd_sync(args).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

/// Layer command-line overrides on top of the loaded config.
fn build_sync_config(args: &SyncArgs, config: &AppConfig) -> Result<SyncConfig> {
    let start_url = Url::parse(&args.url).map_err(|e| eyre!("invalid URL '{}': {e}", args.url))?;
    if !matches!(start_url.scheme(), "http" | "https") {
        return Err(eyre!("URL must be http or https: {start_url}"));
    }

    let mut sync = SyncConfig::from_app_config(start_url, config);
    if let Some(depth) = args.depth {
        sync.crawl_depth = depth;
    }
    if let Some(secs) = args.poll_interval {
        sync.indexing.poll_interval = Duration::from_secs(secs);
    }
    if let Some(max_polls) = args.max_polls {
        sync.indexing.max_polls = max_polls;
    }
    if let Some(concurrency) = args.concurrency {
        sync.upload_concurrency = concurrency.max(1);
    }
    sync.prompt = args.prompt.clone().filter(|p| !p.trim().is_empty());
    Ok(sync)
}

async fn cmd_sync(args: SyncArgs) -> Result<()> {
    let config = load_config()?;
    let sync = build_sync_config(&args, &config)?;

    // Fail on missing credentials before any remote call
    let apify_token = read_secret(&config.apify.token_env, "Apify")?;
    let api_key = read_secret(&config.customgpt.api_key_env, "CustomGPT")?;

    let crawler = ApifyClient::new(&config.apify.base_url, apify_token, &config.apify.actor_id)?;
    let kb = CustomGptClient::new(&config.customgpt.base_url, api_key)?;

    let (handle, signal) = cancel_pair();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping after in-flight work");
            handle.cancel();
        }
    });

    info!(
        url = %sync.start_url,
        depth = sync.crawl_depth,
        concurrency = sync.upload_concurrency,
        "starting sync"
    );

    let reporter = CliProgress::new();
    let outcome = sync_site(&sync, &crawler, &kb, &reporter, &signal).await;
    reporter.spinner.finish_and_clear();

    match outcome {
        Ok(summary) => {
            print_summary(&summary, args.json)?;
            Ok(())
        }
        Err(err) => {
            print_summary(&err.summary, args.json)?;
            Err(Report::new(err.source).wrap_err("sync failed"))
        }
    }
}

fn print_summary(summary: &RunSummary, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }

    let uploads = &summary.uploads;
    println!();
    println!("  Run:       {}", summary.run_id);
    if let Some(project) = &summary.project {
        println!("  Project:   {} ({})", project.name, project.id);
    }
    println!("  Documents: {}", summary.documents);
    println!("  Uploaded:  {}", uploads.uploaded());
    println!("  Skipped:   {}", uploads.skipped());
    println!("  Failed:    {}", uploads.failed());
    if uploads.metadata_failed() > 0 {
        println!("  Metadata:  {} without metadata", uploads.metadata_failed());
    }
    match &summary.indexing {
        Some(report) if !report.failed_pages.is_empty() => {
            println!("  Indexing:  done, {} page(s) failed", report.failed_pages.len());
        }
        Some(_) => println!("  Indexing:  done"),
        None => println!("  Indexing:  not completed"),
    }
    if let Some(turn) = &summary.conversation {
        println!("  Prompt:    {}", turn.prompt);
        println!("  Response:  {}", turn.response_text);
    }
    if let Some(url) = summary.dashboard_url() {
        println!("  Dashboard: {url}");
    }
    println!("  Time:      {:.1}s", summary.elapsed.as_secs_f64());
    println!();
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn document_uploaded(&self, result: &UploadResult, processed: usize, total: usize) {
        let outcome = match result.status {
            UploadStatus::Uploaded => "uploaded",
            UploadStatus::Skipped => "skipped",
            UploadStatus::MetadataFailed { .. } => "no metadata",
            UploadStatus::UploadFailed { .. } => "failed",
        };
        self.spinner.set_message(format!(
            "Uploading [{processed}/{total}] {} ({outcome})",
            result.source_url
        ));
    }

    fn indexing_poll(&self, listing_page: u32, pending: usize) {
        self.spinner.set_message(format!(
            "Waiting for indexing: {pending} queued on listing page {listing_page}"
        ));
    }

    fn done(&self, _summary: &RunSummary) {
        self.spinner.finish_and_clear();
    }
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
