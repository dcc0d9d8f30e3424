//! Document source adapter: crawl records in, uploadable [`Document`]s out.
//!
//! The adapter never filters. A record without text still yields a document
//! with empty content; deciding what to skip is the uploader's job.

use serde::{Deserialize, Serialize};
use sitesync_shared::Document;

/// Marker appended to descriptions cut at the configured bound.
pub const ELLIPSIS: &str = "...";

// ---------------------------------------------------------------------------
// Crawl records
// ---------------------------------------------------------------------------

/// One dataset item as produced by the website content crawler.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrawlRecord {
    pub url: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub metadata: Option<CrawlMetadata>,
}

/// Page metadata captured by the crawler.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrawlMetadata {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

// ---------------------------------------------------------------------------
// Adapter
// ---------------------------------------------------------------------------

/// Normalizes crawl records into documents.
#[derive(Debug, Clone, Copy)]
pub struct DocumentAdapter {
    description_max_chars: usize,
}

impl DocumentAdapter {
    pub fn new(description_max_chars: usize) -> Self {
        Self {
            description_max_chars,
        }
    }

    /// Convert a single record.
    pub fn adapt(&self, record: CrawlRecord) -> Document {
        let metadata = record.metadata.unwrap_or_default();
        let description = metadata
            .description
            .map(|d| truncate_description(&d, self.description_max_chars))
            .unwrap_or_default();

        Document {
            content: record.text.unwrap_or_default(),
            source_url: record.url,
            title: metadata.title.unwrap_or_default(),
            description,
        }
    }

    /// Lazily adapt a sequence of records. The returned iterator consumes its
    /// input and cannot be restarted.
    pub fn documents<I>(self, records: I) -> Documents<I::IntoIter>
    where
        I: IntoIterator<Item = CrawlRecord>,
    {
        Documents {
            records: records.into_iter(),
            adapter: self,
        }
    }
}

/// Iterator returned by [`DocumentAdapter::documents`].
pub struct Documents<I> {
    records: I,
    adapter: DocumentAdapter,
}

impl<I> Iterator for Documents<I>
where
    I: Iterator<Item = CrawlRecord>,
{
    type Item = Document;

    fn next(&mut self) -> Option<Document> {
        self.records.next().map(|r| self.adapter.adapt(r))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.records.size_hint()
    }
}

impl<I> ExactSizeIterator for Documents<I> where I: ExactSizeIterator<Item = CrawlRecord> {}

/// Cut `description` to `max_chars` characters plus [`ELLIPSIS`] when it is
/// longer than `max_chars`. Counts characters, not bytes.
pub fn truncate_description(description: &str, max_chars: usize) -> String {
    match description.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{ELLIPSIS}", &description[..cut]),
        None => description.to_string(),
    }
}
