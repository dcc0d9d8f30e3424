//! Knowledge-base service boundary and its CustomGPT implementation.
//!
//! Every endpoint answers with a [`Reply`]: either the decoded success body or
//! the status code the service sent instead. Transport failures and malformed
//! bodies surface as `Err`, so callers can tell "the service said no" apart
//! from "we never got a usable answer".

mod client;
mod wire;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sitesync_shared::{PageStatus, ProjectId, Result};

pub use client::CustomGptClient;

// ---------------------------------------------------------------------------
// Reply
// ---------------------------------------------------------------------------

/// Outcome of a call that reached the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply<T> {
    /// The call returned its expected status; body decoded.
    Success(T),
    /// The call returned some other status.
    Rejected { status: u16 },
}

impl<T> Reply<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Convert to a `Result`, building the error from the rejected status.
    pub fn or_status<E>(self, err: impl FnOnce(u16) -> E) -> std::result::Result<T, E> {
        match self {
            Self::Success(v) => Ok(v),
            Self::Rejected { status } => Err(err(status)),
        }
    }
}

// ---------------------------------------------------------------------------
// Endpoint results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedProject {
    pub id: ProjectId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedSource {
    /// Pages the service split the source into, in creation order.
    pub page_ids: Vec<String>,
}

/// Fields written by a metadata update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageMetadata {
    pub url: String,
    pub title: String,
    pub description: String,
}

/// One page of the paginated page-status listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageListing {
    pub entries: Vec<PageStatus>,
    pub has_next_page: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    pub session_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageReply {
    pub user_query: String,
    pub response_text: String,
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Remote knowledge-base operations used by the sync pipeline.
#[async_trait]
pub trait KnowledgeBase: Send + Sync {
    /// Create a project. Success is 201.
    async fn create_project(&self, name: &str) -> Result<Reply<CreatedProject>>;

    /// Upload `content` as a file-backed source. Success is 201.
    async fn create_source(
        &self,
        project: &ProjectId,
        file_name: &str,
        content: &str,
    ) -> Result<Reply<CreatedSource>>;

    /// Attach url/title/description to a page. Success is 200.
    async fn update_page_metadata(
        &self,
        project: &ProjectId,
        page_id: &str,
        metadata: &PageMetadata,
    ) -> Result<Reply<()>>;

    /// Fetch listing page `page` (1-based) of `limit` entries. Success is 200.
    async fn list_pages(
        &self,
        project: &ProjectId,
        page: u32,
        limit: u32,
    ) -> Result<Reply<PageListing>>;

    /// Open a conversation. Success is 201.
    async fn create_conversation(
        &self,
        project: &ProjectId,
        name: &str,
    ) -> Result<Reply<Conversation>>;

    /// Send one non-streaming prompt. Success is 200.
    async fn send_message(
        &self,
        project: &ProjectId,
        session_id: &str,
        prompt: &str,
    ) -> Result<Reply<MessageReply>>;
}
