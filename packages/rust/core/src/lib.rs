//! Core pipeline orchestration for SiteSync.
//!
//! Ties the crawl source and the knowledge-base client together into the
//! end-to-end `sync` workflow: provision a project, upload documents, wait
//! for indexing, and optionally ask a smoke-test question.

pub mod cancel;
pub mod indexing;
pub mod pipeline;
pub mod provision;
pub mod query;
pub mod upload;

#[cfg(test)]
pub(crate) mod testing;

pub use cancel::{CancelHandle, CancelSignal, cancel_pair};
pub use pipeline::{
    PipelineError, ProgressReporter, RunSummary, SilentProgress, SyncConfig, sync_documents,
    sync_site,
};
