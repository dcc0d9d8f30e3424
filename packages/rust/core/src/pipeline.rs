//! End-to-end `sync` pipeline: URL → crawl → documents → project → uploads → indexing → query.

use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{error, info, instrument};
use url::Url;
use uuid::Uuid;

use sitesync_crawler::{CrawlSource, DocumentAdapter};
use sitesync_customgpt::KnowledgeBase;
use sitesync_shared::{
    AppConfig, ConversationTurn, Document, IndexingPolicy, IndexingReport, Project, Result,
    SiteSyncError, UploadReport, UploadResult,
};

use crate::cancel::CancelSignal;
use crate::indexing::IndexingMonitor;
use crate::provision;
use crate::query;
use crate::upload::Uploader;

/// Where a finished project can be chatted with.
const DASHBOARD_URL_BASE: &str = "https://app.customgpt.ai/projects";

/// Configuration for the `sync` pipeline.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Site to crawl; also names the remote project.
    pub start_url: Url,
    /// Maximum crawl depth.
    pub crawl_depth: u32,
    /// Description truncation bound, in characters.
    pub description_max_chars: usize,
    /// Extension of uploaded file names.
    pub file_extension: String,
    /// Uploads in flight at once.
    pub upload_concurrency: usize,
    /// Indexing wait policy.
    pub indexing: IndexingPolicy,
    /// Name of the smoke-test conversation.
    pub conversation_name: String,
    /// Smoke-test prompt. No query is made when absent.
    pub prompt: Option<String>,
}

impl SyncConfig {
    /// Build from loaded config; CLI flags are applied on top by the caller.
    pub fn from_app_config(start_url: Url, config: &AppConfig) -> Self {
        Self {
            start_url,
            crawl_depth: config.defaults.crawl_depth,
            description_max_chars: config.defaults.description_max_chars,
            file_extension: config.defaults.file_extension.clone(),
            upload_concurrency: config.defaults.upload_concurrency,
            indexing: IndexingPolicy::from(&config.indexing),
            conversation_name: config.customgpt.conversation_name.clone(),
            prompt: None,
        }
    }
}

/// Everything a run produced, including what it managed before failing.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    /// Present once provisioning succeeded.
    pub project: Option<Project>,
    /// Documents produced by the crawl, blank ones included.
    pub documents: usize,
    pub uploads: UploadReport,
    /// Present once indexing finished.
    pub indexing: Option<IndexingReport>,
    pub conversation: Option<ConversationTurn>,
    pub elapsed: Duration,
}

impl RunSummary {
    fn new() -> Self {
        Self {
            run_id: Uuid::now_v7(),
            project: None,
            documents: 0,
            uploads: UploadReport::default(),
            indexing: None,
            conversation: None,
            elapsed: Duration::ZERO,
        }
    }

    pub fn indexing_succeeded(&self) -> bool {
        self.indexing.is_some()
    }

    pub fn dashboard_url(&self) -> Option<String> {
        self.project
            .as_ref()
            .map(|p| format!("{DASHBOARD_URL_BASE}/{}/ask-me-anything", p.id))
    }
}

/// A stage failure plus the summary of everything done before it.
#[derive(Debug, thiserror::Error)]
#[error("{source}")]
pub struct PipelineError {
    pub source: SiteSyncError,
    pub summary: Box<RunSummary>,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each document, whatever its outcome.
    fn document_uploaded(&self, result: &UploadResult, processed: usize, total: usize);
    /// Called each time a listing page is found still queued.
    fn indexing_poll(&self, listing_page: u32, pending: usize);
    /// Called when the pipeline completes.
    fn done(&self, _summary: &RunSummary) {}
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn document_uploaded(&self, _result: &UploadResult, _processed: usize, _total: usize) {}
    fn indexing_poll(&self, _listing_page: u32, _pending: usize) {}
}

/// Run the full `sync` pipeline.
///
/// 1. Crawl the site and adapt records to documents
/// 2. Create a project named after the site
/// 3. Upload every document and attach its metadata
/// 4. Wait for remote indexing
/// 5. Ask the smoke-test prompt, if any
///
/// A crawl failure returns an empty summary.
#[instrument(skip_all, fields(url = %config.start_url))]
pub async fn sync_site(
    config: &SyncConfig,
    crawler: &dyn CrawlSource,
    kb: &dyn KnowledgeBase,
    progress: &dyn ProgressReporter,
    cancel: &CancelSignal,
) -> std::result::Result<RunSummary, PipelineError> {
    let start = Instant::now();

    progress.phase("Crawling site");
    let records = match crawler.crawl(&config.start_url, config.crawl_depth).await {
        Ok(records) => records,
        Err(source) => {
            error!(error = %source, "crawl failed");
            let mut summary = RunSummary::new();
            summary.elapsed = start.elapsed();
            return Err(PipelineError {
                source,
                summary: Box::new(summary),
            });
        }
    };

    if cancel.is_cancelled() {
        let mut summary = RunSummary::new();
        summary.elapsed = start.elapsed();
        return Err(PipelineError {
            source: SiteSyncError::Cancelled,
            summary: Box::new(summary),
        });
    }

    let documents: Vec<Document> = DocumentAdapter::new(config.description_max_chars)
        .documents(records)
        .collect();
    info!(documents = documents.len(), "crawl complete");

    finish(config, documents, kb, progress, cancel, start).await
}

/// Run steps 2–5 on documents obtained elsewhere.
pub async fn sync_documents(
    config: &SyncConfig,
    documents: Vec<Document>,
    kb: &dyn KnowledgeBase,
    progress: &dyn ProgressReporter,
    cancel: &CancelSignal,
) -> std::result::Result<RunSummary, PipelineError> {
    finish(config, documents, kb, progress, cancel, Instant::now()).await
}

async fn finish(
    config: &SyncConfig,
    documents: Vec<Document>,
    kb: &dyn KnowledgeBase,
    progress: &dyn ProgressReporter,
    cancel: &CancelSignal,
    start: Instant,
) -> std::result::Result<RunSummary, PipelineError> {
    let mut summary = RunSummary::new();
    let outcome = run_stages(config, documents, kb, progress, cancel, &mut summary).await;
    summary.elapsed = start.elapsed();

    match outcome {
        Ok(()) => {
            progress.done(&summary);
            info!(
                run_id = %summary.run_id,
                uploaded = summary.uploads.uploaded(),
                skipped = summary.uploads.skipped(),
                failed = summary.uploads.failed(),
                elapsed_ms = summary.elapsed.as_millis(),
                "sync pipeline complete"
            );
            Ok(summary)
        }
        Err(source) => {
            error!(run_id = %summary.run_id, error = %source, "sync pipeline aborted");
            Err(PipelineError {
                source,
                summary: Box::new(summary),
            })
        }
    }
}

#[instrument(skip_all, fields(run_id = %summary.run_id))]
async fn run_stages(
    config: &SyncConfig,
    documents: Vec<Document>,
    kb: &dyn KnowledgeBase,
    progress: &dyn ProgressReporter,
    cancel: &CancelSignal,
    summary: &mut RunSummary,
) -> Result<()> {
    summary.documents = documents.len();
    if cancel.is_cancelled() {
        return Err(SiteSyncError::Cancelled);
    }

    // --- Provision ---
    progress.phase("Creating project");
    let name = provision::generate_project_name(config.start_url.as_str())?;
    let project = provision::create_project(kb, &name).await?;
    let project_id = project.id.clone();
    summary.project = Some(project);

    // --- Upload ---
    progress.phase("Uploading documents");
    let uploader = Uploader::new(config.file_extension.clone(), config.upload_concurrency);
    summary.uploads = uploader
        .upload_all(kb, &project_id, documents, progress, cancel)
        .await;
    if cancel.is_cancelled() {
        return Err(SiteSyncError::Cancelled);
    }

    // --- Indexing ---
    progress.phase("Waiting for indexing");
    let monitor = IndexingMonitor::new(config.indexing.clone());
    summary.indexing = Some(
        monitor
            .wait_until_indexed(kb, &project_id, progress, cancel)
            .await?,
    );

    // --- Query ---
    if let Some(prompt) = &config.prompt {
        progress.phase("Asking test question");
        summary.conversation =
            Some(query::ask(kb, &project_id, &config.conversation_name, prompt).await?);
    }

    Ok(())
}
