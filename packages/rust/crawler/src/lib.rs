//! Site crawling and document normalization.
//!
//! This crate provides:
//! - [`CrawlSource`]: the crawl collaborator seam
//! - [`ApifyClient`]: a [`CrawlSource`] backed by the Apify website content crawler
//! - [`DocumentAdapter`]: turns crawl records into uploadable documents

pub mod apify;
pub mod documents;

use async_trait::async_trait;
use sitesync_shared::Result;
use url::Url;

pub use apify::{ApifyClient, RunData};
pub use documents::{
    CrawlMetadata, CrawlRecord, DocumentAdapter, Documents, ELLIPSIS, truncate_description,
};

/// Produces the page records of a site crawl.
///
/// Errors are fatal to the run; there is no partial crawl result.
#[async_trait]
pub trait CrawlSource: Send + Sync {
    /// Crawl from `start_url`, following links at most `max_depth` levels deep.
    async fn crawl(&self, start_url: &Url, max_depth: u32) -> Result<Vec<CrawlRecord>>;
}
