//! CustomGPT v1 response bodies and their conversion to endpoint results.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use tracing::debug;
use sitesync_shared::{IndexStatus, PageStatus, ProjectId};

use crate::{Conversation, CreatedProject, CreatedSource, MessageReply, PageListing};

/// `{"status": "success", "data": {...}}`
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub data: T,
}

/// Ids come back as numbers; accept strings too.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum RemoteId {
    Int(i64),
    Str(String),
}

impl RemoteId {
    fn into_string(self) -> String {
        match self {
            Self::Int(n) => n.to_string(),
            Self::Str(s) => s,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProjectData {
    id: RemoteId,
    #[serde(default)]
    project_name: String,
    #[serde(default)]
    created_at: Option<String>,
}

impl From<ProjectData> for CreatedProject {
    fn from(data: ProjectData) -> Self {
        Self {
            id: ProjectId::new(data.id.into_string()),
            name: data.project_name,
            created_at: match data.created_at.as_deref().and_then(parse_timestamp) {
                Some(ts) => ts,
                None => {
                    debug!(raw = ?data.created_at, "no usable created_at, using local clock");
                    Utc::now()
                }
            },
        }
    }
}

/// The API mixes `2023-04-30 16:43:53` and RFC 3339 timestamps.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

#[derive(Debug, Deserialize)]
pub(crate) struct SourceData {
    #[serde(default)]
    pages: Vec<SourcePage>,
}

#[derive(Debug, Deserialize)]
struct SourcePage {
    id: RemoteId,
}

impl From<SourceData> for CreatedSource {
    fn from(data: SourceData) -> Self {
        Self {
            page_ids: data.pages.into_iter().map(|p| p.id.into_string()).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct PagesData {
    pages: PagesPage,
}

/// Laravel-style paginator.
#[derive(Debug, Deserialize)]
struct PagesPage {
    #[serde(default)]
    data: Vec<PageEntry>,
    #[serde(default)]
    next_page_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PageEntry {
    id: RemoteId,
    #[serde(default)]
    filename: Option<String>,
    #[serde(default)]
    page_url: Option<String>,
    index_status: String,
}

impl From<PagesData> for PageListing {
    fn from(data: PagesData) -> Self {
        let has_next_page = data
            .pages
            .next_page_url
            .as_deref()
            .is_some_and(|u| !u.is_empty());
        let entries = data
            .pages
            .data
            .into_iter()
            .map(|e| PageStatus {
                page_id: e.id.into_string(),
                filename: e.filename.or(e.page_url).unwrap_or_default(),
                index_status: IndexStatus::from_remote(&e.index_status),
            })
            .collect();

        Self {
            entries,
            has_next_page,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ConversationData {
    session_id: String,
}

impl From<ConversationData> for Conversation {
    fn from(data: ConversationData) -> Self {
        Self {
            session_id: data.session_id,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct MessageData {
    user_query: String,
    openai_response: String,
}

impl From<MessageData> for MessageReply {
    fn from(data: MessageData) -> Self {
        Self {
            user_query: data.user_query,
            response_text: data.openai_response,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_accepts_numeric_id_and_sql_timestamp() {
        let json = r#"{"status":"success","data":{"id":42,"project_name":"example.com - 20261019:120000","created_at":"2026-10-19 12:00:00"}}"#;
        let env: Envelope<ProjectData> = serde_json::from_str(json).unwrap();
        let project = CreatedProject::from(env.data);
        assert_eq!(project.id.as_str(), "42");
        assert_eq!(project.created_at.to_rfc3339(), "2026-10-19T12:00:00+00:00");
    }

    #[test]
    fn unparseable_created_at_falls_back_to_local_clock() {
        let before = Utc::now();
        let json = r#"{"data":{"id":"p-9","project_name":"x","created_at":"yesterday"}}"#;
        let env: Envelope<ProjectData> = serde_json::from_str(json).unwrap();
        let project = CreatedProject::from(env.data);
        assert_eq!(project.id.as_str(), "p-9");
        assert!(project.created_at >= before);
        assert!(project.created_at <= Utc::now());
    }

    #[test]
    fn listing_maps_statuses_and_next_page() {
        let json = r#"{"data":{"pages":{
            "current_page":1,
            "data":[
                {"id":1,"filename":"document_0.txt","index_status":"ok"},
                {"id":2,"filename":"document_1.txt","index_status":"queued"},
                {"id":3,"page_url":"https://example.com/x","index_status":"failed"}
            ],
            "next_page_url":"https://app.customgpt.ai/api/v1/projects/42/pages?page=2"
        }}}"#;
        let env: Envelope<PagesData> = serde_json::from_str(json).unwrap();
        let listing = PageListing::from(env.data);
        assert!(listing.has_next_page);
        let statuses: Vec<IndexStatus> =
            listing.entries.iter().map(|e| e.index_status).collect();
        assert_eq!(
            statuses,
            vec![IndexStatus::Indexed, IndexStatus::Queued, IndexStatus::Failed]
        );
        assert_eq!(listing.entries[2].filename, "https://example.com/x");
    }

    #[test]
    fn null_next_page_means_last() {
        let json = r#"{"data":{"pages":{"data":[],"next_page_url":null}}}"#;
        let env: Envelope<PagesData> = serde_json::from_str(json).unwrap();
        assert!(!PageListing::from(env.data).has_next_page);
    }

    #[test]
    fn message_missing_response_is_rejected() {
        let json = r#"{"data":{"user_query":"hi"}}"#;
        assert!(serde_json::from_str::<Envelope<MessageData>>(json).is_err());
    }
}
