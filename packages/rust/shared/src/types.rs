//! Core domain types shared by the sync pipeline stages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// A crawled page normalized for upload. Content may be empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Extracted page text.
    pub content: String,
    /// URL the page was crawled from.
    pub source_url: String,
    /// Page title, empty when the crawler found none.
    pub title: String,
    /// Page description, already truncated by the source adapter.
    pub description: String,
}

impl Document {
    /// True when there is nothing worth uploading.
    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }
}

// ---------------------------------------------------------------------------
// Project
// ---------------------------------------------------------------------------

/// Opaque identifier of a remote project.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(String);

impl ProjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A remote project created for one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Upload results
// ---------------------------------------------------------------------------

/// Outcome of pushing one document to the remote project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UploadStatus {
    /// Source created and metadata attached.
    Uploaded,
    /// Source created, metadata update rejected. `status` is absent on transport failure.
    MetadataFailed { status: Option<u16> },
    /// Source creation rejected. `status` is absent on transport failure.
    UploadFailed { status: Option<u16> },
    /// Blank content, no remote call made.
    Skipped,
}

/// Per-document record in the [`UploadReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResult {
    /// Position of the document in the source sequence.
    pub index: usize,
    /// Original page URL.
    pub source_url: String,
    /// File name the source was uploaded under.
    pub file_name: String,
    /// First remote page created for the source, when known.
    pub page_id: Option<String>,
    #[serde(flatten)]
    pub status: UploadStatus,
}

/// Aggregate of all per-document outcomes, in source order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadReport {
    pub results: Vec<UploadResult>,
}

impl UploadReport {
    pub fn total(&self) -> usize {
        self.results.len()
    }

    /// Documents with both source and metadata accepted.
    pub fn uploaded(&self) -> usize {
        self.count(|s| matches!(s, UploadStatus::Uploaded))
    }

    /// Documents whose source was accepted but whose metadata was not.
    pub fn metadata_failed(&self) -> usize {
        self.count(|s| matches!(s, UploadStatus::MetadataFailed { .. }))
    }

    /// Documents whose source upload was rejected.
    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, UploadStatus::UploadFailed { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, UploadStatus::Skipped))
    }

    fn count(&self, pred: impl Fn(&UploadStatus) -> bool) -> usize {
        self.results.iter().filter(|r| pred(&r.status)).count()
    }
}

// ---------------------------------------------------------------------------
// Indexing
// ---------------------------------------------------------------------------

/// Remote indexing state of a single page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexStatus {
    Queued,
    Indexed,
    Failed,
}

impl IndexStatus {
    /// Map a remote status string. Only `queued` is pending; `ok`/`indexed` are
    /// success and anything else is a terminal failure.
    pub fn from_remote(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "queued" => Self::Queued,
            "ok" | "indexed" => Self::Indexed,
            _ => Self::Failed,
        }
    }

    pub fn is_pending(self) -> bool {
        self == Self::Queued
    }
}

/// One entry of a page-status listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageStatus {
    pub page_id: String,
    pub filename: String,
    pub index_status: IndexStatus,
}

/// What the indexing monitor observed before returning.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexingReport {
    /// Listing pages settled during the scan.
    pub listing_pages: u32,
    /// Total fetches issued, including re-fetches of pending pages.
    pub polls: u32,
    /// Remote pages seen in settled listings.
    pub pages_seen: usize,
    /// Pages that settled in the `failed` state.
    pub failed_pages: Vec<String>,
}

// ---------------------------------------------------------------------------
// Conversation
// ---------------------------------------------------------------------------

/// A single prompt/response exchange against a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub session_id: String,
    pub prompt: String,
    pub response_text: String,
}
