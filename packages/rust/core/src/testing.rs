//! In-memory knowledge base and crawl source for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use url::Url;

use sitesync_crawler::{CrawlRecord, CrawlSource};
use sitesync_customgpt::{
    Conversation, CreatedProject, CreatedSource, KnowledgeBase, MessageReply, PageListing,
    PageMetadata, Reply,
};
use sitesync_shared::{IndexStatus, PageStatus, ProjectId, Result, SiteSyncError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    CreateProject(String),
    CreateSource(String),
    UpdateMetadata(String),
    ListPages(u32),
    CreateConversation(String),
    SendMessage(String),
}

/// One page of the scripted listing. The first entry reads `queued` for the
/// first `queued_fetches` fetches of this page, then its final status.
#[derive(Debug, Clone)]
pub(crate) struct StubListingPage {
    pub entries: Vec<PageStatus>,
    pub queued_fetches: u32,
}

impl StubListingPage {
    pub fn settled(ids: &[&str]) -> Self {
        Self {
            entries: ids.iter().map(|id| entry(id, IndexStatus::Indexed)).collect(),
            queued_fetches: 0,
        }
    }

    pub fn queued_for(mut self, fetches: u32) -> Self {
        self.queued_fetches = fetches;
        self
    }
}

pub(crate) fn entry(id: &str, status: IndexStatus) -> PageStatus {
    PageStatus {
        page_id: id.to_string(),
        filename: format!("{id}.txt"),
        index_status: status,
    }
}

pub(crate) struct StubKb {
    pub project_status: u16,
    /// Non-201 status per uploaded file name.
    pub source_status: HashMap<String, u16>,
    /// File names whose upload fails at the transport level.
    pub source_transport_error: Vec<String>,
    /// File names whose upload succeeds with no pages.
    pub source_without_pages: Vec<String>,
    /// Non-200 status per page id.
    pub metadata_status: HashMap<String, u16>,
    pub listing: Vec<StubListingPage>,
    pub listing_status: u16,
    pub conversation_status: u16,
    pub message_status: u16,
    pub(crate) calls: Mutex<Vec<Call>>,
    pub(crate) fetches: Mutex<HashMap<u32, u32>>,
}

impl Default for StubKb {
    fn default() -> Self {
        Self {
            project_status: 201,
            source_status: HashMap::new(),
            source_transport_error: Vec::new(),
            source_without_pages: Vec::new(),
            metadata_status: HashMap::new(),
            listing: Vec::new(),
            listing_status: 200,
            conversation_status: 201,
            message_status: 200,
            calls: Mutex::new(Vec::new()),
            fetches: Mutex::new(HashMap::new()),
        }
    }
}

impl StubKb {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

/// Page id the stub assigns to an uploaded file.
pub(crate) fn page_for(file_name: &str) -> String {
    format!("page-{file_name}")
}

#[async_trait]
impl KnowledgeBase for StubKb {
    async fn create_project(&self, name: &str) -> Result<Reply<CreatedProject>> {
        self.record(Call::CreateProject(name.to_string()));
        if self.project_status != 201 {
            return Ok(Reply::Rejected {
                status: self.project_status,
            });
        }
        Ok(Reply::Success(CreatedProject {
            id: ProjectId::new("proj-1"),
            name: name.to_string(),
            created_at: Utc::now(),
        }))
    }

    async fn create_source(
        &self,
        _project: &ProjectId,
        file_name: &str,
        _content: &str,
    ) -> Result<Reply<CreatedSource>> {
        self.record(Call::CreateSource(file_name.to_string()));
        if self.source_transport_error.iter().any(|f| f == file_name) {
            return Err(SiteSyncError::Network("connection reset".into()));
        }
        if let Some(&status) = self.source_status.get(file_name) {
            return Ok(Reply::Rejected { status });
        }
        let page_ids = if self.source_without_pages.iter().any(|f| f == file_name) {
            Vec::new()
        } else {
            vec![page_for(file_name), format!("{}-2", page_for(file_name))]
        };
        Ok(Reply::Success(CreatedSource { page_ids }))
    }

    async fn update_page_metadata(
        &self,
        _project: &ProjectId,
        page_id: &str,
        _metadata: &PageMetadata,
    ) -> Result<Reply<()>> {
        self.record(Call::UpdateMetadata(page_id.to_string()));
        match self.metadata_status.get(page_id) {
            Some(&status) => Ok(Reply::Rejected { status }),
            None => Ok(Reply::Success(())),
        }
    }

    async fn list_pages(
        &self,
        _project: &ProjectId,
        page: u32,
        _limit: u32,
    ) -> Result<Reply<PageListing>> {
        self.record(Call::ListPages(page));
        if self.listing_status != 200 {
            return Ok(Reply::Rejected {
                status: self.listing_status,
            });
        }

        let fetch = {
            let mut fetches = self.fetches.lock().unwrap();
            let n = fetches.entry(page).or_insert(0);
            *n += 1;
            *n
        };

        let Some(scripted) = self.listing.get(page as usize - 1) else {
            return Ok(Reply::Success(PageListing {
                entries: Vec::new(),
                has_next_page: false,
            }));
        };

        let mut entries = scripted.entries.clone();
        if fetch <= scripted.queued_fetches {
            if let Some(first) = entries.first_mut() {
                first.index_status = IndexStatus::Queued;
            }
        }
        Ok(Reply::Success(PageListing {
            entries,
            has_next_page: (page as usize) < self.listing.len(),
        }))
    }

    async fn create_conversation(
        &self,
        _project: &ProjectId,
        name: &str,
    ) -> Result<Reply<Conversation>> {
        self.record(Call::CreateConversation(name.to_string()));
        if self.conversation_status != 201 {
            return Ok(Reply::Rejected {
                status: self.conversation_status,
            });
        }
        Ok(Reply::Success(Conversation {
            session_id: "sess-1".into(),
        }))
    }

    async fn send_message(
        &self,
        _project: &ProjectId,
        _session_id: &str,
        prompt: &str,
    ) -> Result<Reply<MessageReply>> {
        self.record(Call::SendMessage(prompt.to_string()));
        if self.message_status != 200 {
            return Ok(Reply::Rejected {
                status: self.message_status,
            });
        }
        Ok(Reply::Success(MessageReply {
            user_query: prompt.to_string(),
            response_text: format!("answer to: {prompt}"),
        }))
    }
}

/// Crawl source returning canned records.
pub(crate) struct StubCrawler {
    pub records: Vec<CrawlRecord>,
    pub fail: bool,
}

#[async_trait]
impl CrawlSource for StubCrawler {
    async fn crawl(&self, _start_url: &Url, _max_depth: u32) -> Result<Vec<CrawlRecord>> {
        if self.fail {
            return Err(SiteSyncError::Crawl("actor run failed".into()));
        }
        Ok(self.records.clone())
    }
}
