//! reqwest-backed [`KnowledgeBase`] for the CustomGPT v1 REST API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::{DeserializeOwned, IgnoredAny};
use tracing::{debug, warn};

use sitesync_shared::{ProjectId, Result, SiteSyncError};

use crate::wire::{ConversationData, Envelope, MessageData, PagesData, ProjectData, SourceData};
use crate::{
    Conversation, CreatedProject, CreatedSource, KnowledgeBase, MessageReply, PageListing,
    PageMetadata, Reply,
};

/// User-Agent string for API requests.
const USER_AGENT: &str = concat!("SiteSync/", env!("CARGO_PKG_VERSION"));

/// Per-request timeout. Sends wait on a model completion, so keep this generous.
const REQUEST_TIMEOUT_SECS: u64 = 120;

pub struct CustomGptClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl CustomGptClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| SiteSyncError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Send `req`; decode `Envelope<W>` if the status matches `expected`.
    async fn call<W, T>(&self, req: RequestBuilder, expected: StatusCode) -> Result<Reply<T>>
    where
        W: DeserializeOwned,
        T: From<W>,
    {
        let resp = req
            .bearer_auth(&self.api_key)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| SiteSyncError::Network(e.to_string()))?;

        let status = resp.status();
        let url = resp.url().path().to_string();
        if status != expected {
            let body = resp.text().await.unwrap_or_default();
            warn!(%url, status = status.as_u16(), body = %truncate_for_log(&body), "request rejected");
            return Ok(Reply::Rejected {
                status: status.as_u16(),
            });
        }

        let body = resp
            .text()
            .await
            .map_err(|e| SiteSyncError::Network(format!("{url}: failed to read body: {e}")))?;
        let envelope: Envelope<W> = serde_json::from_str(&body)
            .map_err(|e| SiteSyncError::parse(format!("{url}: {e}")))?;

        debug!(%url, status = status.as_u16(), "request succeeded");
        Ok(Reply::Success(T::from(envelope.data)))
    }
}

#[async_trait]
impl KnowledgeBase for CustomGptClient {
    async fn create_project(&self, name: &str) -> Result<Reply<CreatedProject>> {
        let form = Form::new().text("project_name", name.to_string());
        let req = self.client.post(self.url("/projects")).multipart(form);
        self.call::<ProjectData, _>(req, StatusCode::CREATED).await
    }

    async fn create_source(
        &self,
        project: &ProjectId,
        file_name: &str,
        content: &str,
    ) -> Result<Reply<CreatedSource>> {
        let part = Part::text(content.to_string())
            .file_name(file_name.to_string())
            .mime_str("text/plain")
            .map_err(|e| SiteSyncError::validation(format!("bad mime type: {e}")))?;
        let form = Form::new().part("file", part);
        let req = self
            .client
            .post(self.url(&format!("/projects/{project}/sources")))
            .multipart(form);
        self.call::<SourceData, _>(req, StatusCode::CREATED).await
    }

    async fn update_page_metadata(
        &self,
        project: &ProjectId,
        page_id: &str,
        metadata: &PageMetadata,
    ) -> Result<Reply<()>> {
        let body = serde_json::json!({
            "url": metadata.url,
            "title": metadata.title,
            "description": metadata.description,
        });
        let req = self
            .client
            .put(self.url(&format!("/projects/{project}/pages/{page_id}/metadata")))
            .json(&body);
        let reply: Reply<Ignored> = self.call::<IgnoredAny, _>(req, StatusCode::OK).await?;
        Ok(match reply {
            Reply::Success(_) => Reply::Success(()),
            Reply::Rejected { status } => Reply::Rejected { status },
        })
    }

    async fn list_pages(
        &self,
        project: &ProjectId,
        page: u32,
        limit: u32,
    ) -> Result<Reply<PageListing>> {
        let req = self
            .client
            .get(self.url(&format!("/projects/{project}/pages")))
            .query(&[("page", page), ("limit", limit)]);
        self.call::<PagesData, _>(req, StatusCode::OK).await
    }

    async fn create_conversation(
        &self,
        project: &ProjectId,
        name: &str,
    ) -> Result<Reply<Conversation>> {
        let req = self
            .client
            .post(self.url(&format!("/projects/{project}/conversations")))
            .json(&serde_json::json!({ "name": name }));
        self.call::<ConversationData, _>(req, StatusCode::CREATED)
            .await
    }

    async fn send_message(
        &self,
        project: &ProjectId,
        session_id: &str,
        prompt: &str,
    ) -> Result<Reply<MessageReply>> {
        let req = self
            .client
            .post(self.url(&format!(
                "/projects/{project}/conversations/{session_id}/messages"
            )))
            .query(&[("stream", "false")])
            .json(&serde_json::json!({ "prompt": prompt }));
        self.call::<MessageData, _>(req, StatusCode::OK).await
    }
}

/// Body-less success marker for the metadata endpoint.
struct Ignored;

impl From<IgnoredAny> for Ignored {
    fn from(_: IgnoredAny) -> Self {
        Ignored
    }
}

fn truncate_for_log(body: &str) -> &str {
    match body.char_indices().nth(200) {
        Some((cut, _)) => &body[..cut],
        None => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, body_string_contains, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> CustomGptClient {
        CustomGptClient::new(server.uri(), "key-abc").unwrap()
    }

    #[tokio::test]
    async fn test_create_project_success() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/projects"))
            .and(header("authorization", "Bearer key-abc"))
            .and(body_string_contains("example.com - 20261019:120000"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "status": "success",
                "data": {"id": 7, "project_name": "example.com - 20261019:120000"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let reply = client(&server)
            .create_project("example.com - 20261019:120000")
            .await
            .unwrap();
        match reply {
            Reply::Success(p) => {
                assert_eq!(p.id.as_str(), "7");
                assert_eq!(p.name, "example.com - 20261019:120000");
            }
            Reply::Rejected { status } => panic!("unexpected rejection {status}"),
        }
    }

    #[tokio::test]
    async fn test_ok_instead_of_created_is_rejection() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/projects"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {"id": 7}
            })))
            .mount(&server)
            .await;

        let reply = client(&server).create_project("x").await.unwrap();
        assert_eq!(reply, Reply::Rejected { status: 200 });
    }

    #[tokio::test]
    async fn test_create_source_returns_page_ids() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/projects/7/sources"))
            .and(body_string_contains("filename=\"document_0.txt\""))
            .and(body_string_contains("hello world"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "data": {"id": 99, "pages": [{"id": 501}, {"id": 502}]}
            })))
            .mount(&server)
            .await;

        let reply = client(&server)
            .create_source(&ProjectId::new("7"), "document_0.txt", "hello world")
            .await
            .unwrap();
        assert_eq!(
            reply,
            Reply::Success(CreatedSource {
                page_ids: vec!["501".into(), "502".into()]
            })
        );
    }

    #[tokio::test]
    async fn test_update_metadata_sends_fields() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/projects/7/pages/501/metadata"))
            .and(body_json(serde_json::json!({
                "url": "https://example.com/a",
                "title": "A",
                "description": "About A"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "success",
                "data": {"title": "A"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let metadata = PageMetadata {
            url: "https://example.com/a".into(),
            title: "A".into(),
            description: "About A".into(),
        };
        let reply = client(&server)
            .update_page_metadata(&ProjectId::new("7"), "501", &metadata)
            .await
            .unwrap();
        assert_eq!(reply, Reply::Success(()));
    }

    #[tokio::test]
    async fn test_list_pages_passes_cursor_and_limit() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/projects/7/pages"))
            .and(query_param("page", "2"))
            .and(query_param("limit", "50"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {"pages": {
                    "data": [{"id": 1, "filename": "document_0.txt", "index_status": "ok"}],
                    "next_page_url": null
                }}
            })))
            .mount(&server)
            .await;

        let reply = client(&server)
            .list_pages(&ProjectId::new("7"), 2, 50)
            .await
            .unwrap();
        match reply {
            Reply::Success(listing) => {
                assert_eq!(listing.entries.len(), 1);
                assert!(!listing.has_next_page);
            }
            Reply::Rejected { status } => panic!("unexpected rejection {status}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_parse_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/projects/7/pages"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = client(&server)
            .list_pages(&ProjectId::new("7"), 1, 100)
            .await
            .unwrap_err();
        assert!(matches!(err, SiteSyncError::Parse { .. }));
    }

    #[tokio::test]
    async fn test_conversation_round_trip() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/projects/7/conversations"))
            .and(body_json(serde_json::json!({"name": "smoke"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "data": {"id": 3, "session_id": "sess-1"}
            })))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/projects/7/conversations/sess-1/messages"))
            .and(query_param("stream", "false"))
            .and(body_json(serde_json::json!({"prompt": "What is this site?"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {"user_query": "What is this site?", "openai_response": "An example."}
            })))
            .mount(&server)
            .await;

        let kb = client(&server);
        let project = ProjectId::new("7");
        let conversation = kb
            .create_conversation(&project, "smoke")
            .await
            .unwrap()
            .or_status(|s| s)
            .unwrap();
        let reply = kb
            .send_message(&project, &conversation.session_id, "What is this site?")
            .await
            .unwrap()
            .or_status(|s| s)
            .unwrap();
        assert_eq!(reply.response_text, "An example.");
        assert_eq!(reply.user_query, "What is this site?");
    }
}
