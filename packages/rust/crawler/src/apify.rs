//! Apify REST client for the website content crawler actor.
//!
//! A crawl is three calls: start an actor run, long-poll it until it reaches a
//! terminal state, then read the run's default dataset.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::{debug, info, instrument};
use url::Url;

use sitesync_shared::{Result, SiteSyncError};

use crate::CrawlSource;
use crate::documents::CrawlRecord;

/// Seconds the API may hold a run-status request open.
const WAIT_FOR_FINISH_SECS: u64 = 60;

/// User-Agent string for crawl requests.
const USER_AGENT: &str = concat!("SiteSync/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    data: T,
}

/// Actor run metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct RunData {
    pub id: String,
    pub status: String,
    #[serde(rename = "defaultDatasetId")]
    pub default_dataset_id: String,
}

#[derive(Debug, Serialize)]
struct StartUrl<'a> {
    url: &'a str,
}

/// Input for the website content crawler actor.
#[derive(Debug, Serialize)]
struct CrawlerInput<'a> {
    #[serde(rename = "startUrls")]
    start_urls: Vec<StartUrl<'a>>,
    #[serde(rename = "maxCrawlDepth")]
    max_crawl_depth: u32,
}

/// Terminal state of an actor run.
enum RunState {
    Succeeded,
    Failed,
    Running,
}

impl RunState {
    fn of(status: &str) -> Self {
        match status {
            "SUCCEEDED" => Self::Succeeded,
            "FAILED" | "ABORTED" | "TIMED-OUT" => Self::Failed,
            _ => Self::Running,
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct ApifyClient {
    client: Client,
    base_url: String,
    token: String,
    actor_id: String,
}

impl ApifyClient {
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        actor_id: impl Into<String>,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(WAIT_FOR_FINISH_SECS + 30))
            .build()
            .map_err(|e| SiteSyncError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            actor_id: actor_id.into(),
        })
    }

    /// Start a crawler run. Returns immediately with run metadata.
    pub async fn start_run(&self, start_url: &Url, max_depth: u32) -> Result<RunData> {
        let input = CrawlerInput {
            start_urls: vec![StartUrl {
                url: start_url.as_str(),
            }],
            max_crawl_depth: max_depth,
        };

        let url = format!("{}/acts/{}/runs", self.base_url, self.actor_id);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&input)
            .send()
            .await
            .map_err(|e| SiteSyncError::Network(format!("{url}: {e}")))?;

        let api_resp: ApiResponse<RunData> = read_json(resp).await?;
        Ok(api_resp.data)
    }

    /// Poll until a run completes. Uses `waitForFinish` for long-polling.
    pub async fn wait_for_run(&self, run_id: &str) -> Result<RunData> {
        let url = format!(
            "{}/actor-runs/{run_id}?waitForFinish={WAIT_FOR_FINISH_SECS}",
            self.base_url
        );
        loop {
            let resp = self
                .client
                .get(&url)
                .bearer_auth(&self.token)
                .send()
                .await
                .map_err(|e| SiteSyncError::Network(format!("{url}: {e}")))?;

            let run: ApiResponse<RunData> = read_json(resp).await?;
            match RunState::of(&run.data.status) {
                RunState::Succeeded => return Ok(run.data),
                RunState::Failed => {
                    return Err(SiteSyncError::Crawl(format!(
                        "run {run_id} finished with status {}",
                        run.data.status
                    )));
                }
                RunState::Running => {
                    debug!(run_id, status = %run.data.status, "run still in progress");
                }
            }
        }
    }

    /// Fetch all items of a dataset.
    pub async fn dataset_items<T: DeserializeOwned>(&self, dataset_id: &str) -> Result<Vec<T>> {
        let url = format!(
            "{}/datasets/{dataset_id}/items?format=json&clean=true",
            self.base_url
        );
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| SiteSyncError::Network(format!("{url}: {e}")))?;

        read_json(resp).await
    }
}

#[async_trait]
impl CrawlSource for ApifyClient {
    #[instrument(skip_all, fields(start_url = %start_url, max_depth))]
    async fn crawl(&self, start_url: &Url, max_depth: u32) -> Result<Vec<CrawlRecord>> {
        let run = self.start_run(start_url, max_depth).await?;
        info!(run_id = %run.id, "crawler run started, polling for completion");

        let completed = self.wait_for_run(&run.id).await?;
        info!(
            run_id = %completed.id,
            dataset_id = %completed.default_dataset_id,
            "run completed, fetching results"
        );

        let records: Vec<CrawlRecord> = self.dataset_items(&completed.default_dataset_id).await?;
        info!(count = records.len(), "fetched crawl records");
        Ok(records)
    }
}

/// Check the status and decode the body, keeping the remote status on failure.
async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
    let status = resp.status();
    if !status.is_success() {
        let message = resp.text().await.unwrap_or_default();
        return Err(SiteSyncError::Api {
            status: status.as_u16(),
            message,
        });
    }

    let body = resp
        .text()
        .await
        .map_err(|e| SiteSyncError::Network(format!("failed to read body: {e}")))?;
    serde_json::from_str(&body).map_err(|e| SiteSyncError::parse(e.to_string()))
}
