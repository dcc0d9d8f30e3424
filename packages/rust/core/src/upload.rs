//! Upload coordinator: one source plus one metadata update per document.
//!
//! Per-document failures are recorded in the [`UploadReport`] and never
//! returned as errors. Every document gets exactly one result unless the run
//! is cancelled, in which case documents not yet started are left out.

use futures::stream::{self, StreamExt};
use tracing::{debug, info, instrument, warn};

use sitesync_customgpt::{KnowledgeBase, PageMetadata, Reply};
use sitesync_shared::{Document, ProjectId, UploadReport, UploadResult, UploadStatus};

use crate::cancel::CancelSignal;
use crate::pipeline::ProgressReporter;

/// Uploads documents into a project.
#[derive(Debug, Clone)]
pub struct Uploader {
    file_extension: String,
    concurrency: usize,
}

impl Default for Uploader {
    fn default() -> Self {
        Self::new("txt", 1)
    }
}

impl Uploader {
    /// `concurrency` of 0 is treated as 1.
    pub fn new(file_extension: impl Into<String>, concurrency: usize) -> Self {
        Self {
            file_extension: file_extension.into(),
            concurrency: concurrency.max(1),
        }
    }

    /// Name the `index`-th document is uploaded under.
    pub fn file_name(&self, index: usize) -> String {
        format!("document_{index}.{}", self.file_extension)
    }

    /// Upload every document, in source order, with up to `concurrency` in flight.
    ///
    /// The report lists results by document index regardless of completion order.
    #[instrument(skip_all, fields(project_id = %project, documents = documents.len()))]
    pub async fn upload_all(
        &self,
        kb: &dyn KnowledgeBase,
        project: &ProjectId,
        documents: Vec<Document>,
        progress: &dyn ProgressReporter,
        cancel: &CancelSignal,
    ) -> UploadReport {
        let total = documents.len();
        let mut slots: Vec<Option<UploadResult>> = vec![None; total];

        let mut in_flight = stream::iter(documents.into_iter().enumerate())
            .take_while(|_| futures::future::ready(!cancel.is_cancelled()))
            .map(|(index, doc)| self.upload_one(kb, project, index, doc))
            .buffer_unordered(self.concurrency);

        let mut processed = 0;
        while let Some(result) = in_flight.next().await {
            processed += 1;
            progress.document_uploaded(&result, processed, total);
            let index = result.index;
            slots[index] = Some(result);
        }

        let report = UploadReport {
            results: slots.into_iter().flatten().collect(),
        };

        info!(
            uploaded = report.uploaded(),
            metadata_failed = report.metadata_failed(),
            failed = report.failed(),
            skipped = report.skipped(),
            "upload stage complete"
        );
        report
    }

    async fn upload_one(
        &self,
        kb: &dyn KnowledgeBase,
        project: &ProjectId,
        index: usize,
        doc: Document,
    ) -> UploadResult {
        let file_name = self.file_name(index);
        let mut result = UploadResult {
            index,
            source_url: doc.source_url.clone(),
            file_name,
            page_id: None,
            status: UploadStatus::Skipped,
        };

        if doc.is_blank() {
            debug!(url = %doc.source_url, "blank content, skipping");
            return result;
        }

        let source = match kb.create_source(project, &result.file_name, &doc.content).await {
            Ok(Reply::Success(source)) => source,
            Ok(Reply::Rejected { status }) => {
                warn!(file = %result.file_name, status, "upload rejected");
                result.status = UploadStatus::UploadFailed {
                    status: Some(status),
                };
                return result;
            }
            Err(e) => {
                warn!(file = %result.file_name, error = %e, "upload failed");
                result.status = UploadStatus::UploadFailed { status: None };
                return result;
            }
        };

        let Some(page_id) = source.page_ids.into_iter().next() else {
            warn!(file = %result.file_name, "upload created no pages, metadata not attached");
            result.status = UploadStatus::MetadataFailed { status: None };
            return result;
        };
        result.page_id = Some(page_id.clone());

        let metadata = PageMetadata {
            url: doc.source_url,
            title: doc.title,
            description: doc.description,
        };
        result.status = match kb.update_page_metadata(project, &page_id, &metadata).await {
            Ok(Reply::Success(())) => UploadStatus::Uploaded,
            Ok(Reply::Rejected { status }) => {
                warn!(file = %result.file_name, %page_id, status, "metadata update rejected");
                UploadStatus::MetadataFailed {
                    status: Some(status),
                }
            }
            Err(e) => {
                warn!(file = %result.file_name, %page_id, error = %e, "metadata update failed");
                UploadStatus::MetadataFailed { status: None }
            }
        };
        result
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::cancel::cancel_pair;
    use crate::pipeline::SilentProgress;
    use crate::testing::{Call, StubKb, page_for};

    fn doc(n: usize, content: &str) -> Document {
        Document {
            content: content.to_string(),
            source_url: format!("https://example.com/{n}"),
            title: format!("Page {n}"),
            description: String::new(),
        }
    }

    fn project() -> ProjectId {
        ProjectId::new("proj-1")
    }

    #[derive(Default)]
    struct RecordingProgress {
        events: Mutex<Vec<(usize, usize)>>,
    }

    impl ProgressReporter for RecordingProgress {
        fn phase(&self, _name: &str) {}
        fn document_uploaded(&self, _result: &UploadResult, processed: usize, total: usize) {
            self.events.lock().unwrap().push((processed, total));
        }
        fn indexing_poll(&self, _listing_page: u32, _pending: usize) {}
    }

    #[tokio::test]
    async fn one_upload_and_one_metadata_call_per_document() {
        let kb = StubKb::default();
        let docs = vec![doc(0, "alpha"), doc(1, "beta")];

        let report = Uploader::default()
            .upload_all(&kb, &project(), docs, &SilentProgress, &CancelSignal::never())
            .await;

        assert_eq!(report.uploaded(), 2);
        assert_eq!(
            kb.calls(),
            vec![
                Call::CreateSource("document_0.txt".into()),
                Call::UpdateMetadata(page_for("document_0.txt")),
                Call::CreateSource("document_1.txt".into()),
                Call::UpdateMetadata(page_for("document_1.txt")),
            ]
        );
        assert_eq!(report.results[0].page_id, Some(page_for("document_0.txt")));
    }

    #[tokio::test]
    async fn blank_documents_make_no_calls() {
        let kb = StubKb::default();
        let docs = vec![doc(0, ""), doc(1, "  \n\t")];

        let report = Uploader::default()
            .upload_all(&kb, &project(), docs, &SilentProgress, &CancelSignal::never())
            .await;

        assert_eq!(report.skipped(), 2);
        assert!(kb.calls().is_empty());
    }

    #[tokio::test]
    async fn failed_upload_does_not_stop_the_batch() {
        let mut kb = StubKb::default();
        kb.source_status.insert("document_0.txt".into(), 500);
        kb.source_transport_error.push("document_1.txt".into());

        let docs = vec![doc(0, "a"), doc(1, "b"), doc(2, "c")];
        let report = Uploader::default()
            .upload_all(&kb, &project(), docs, &SilentProgress, &CancelSignal::never())
            .await;

        assert_eq!(
            report.results[0].status,
            UploadStatus::UploadFailed { status: Some(500) }
        );
        assert_eq!(report.results[1].status, UploadStatus::UploadFailed { status: None });
        assert_eq!(report.results[2].status, UploadStatus::Uploaded);
        // No metadata update for rejected uploads
        assert_eq!(kb.count(|c| matches!(c, Call::UpdateMetadata(_))), 1);
    }

    #[tokio::test]
    async fn metadata_rejection_is_recorded_separately() {
        let mut kb = StubKb::default();
        kb.metadata_status.insert(page_for("document_0.txt"), 422);
        kb.source_without_pages.push("document_1.txt".into());

        let docs = vec![doc(0, "a"), doc(1, "b")];
        let report = Uploader::default()
            .upload_all(&kb, &project(), docs, &SilentProgress, &CancelSignal::never())
            .await;

        assert_eq!(
            report.results[0].status,
            UploadStatus::MetadataFailed { status: Some(422) }
        );
        assert_eq!(report.results[1].status, UploadStatus::MetadataFailed { status: None });
        assert_eq!(report.results[1].page_id, None);
        assert_eq!(report.metadata_failed(), 2);
        assert_eq!(report.failed(), 0);
    }

    #[tokio::test]
    async fn progress_is_reported_after_every_document() {
        let kb = StubKb::default();
        let progress = RecordingProgress::default();
        let docs = vec![doc(0, "a"), doc(1, ""), doc(2, "c")];

        Uploader::default()
            .upload_all(&kb, &project(), docs, &progress, &CancelSignal::never())
            .await;

        assert_eq!(*progress.events.lock().unwrap(), vec![(1, 3), (2, 3), (3, 3)]);
    }

    #[tokio::test]
    async fn parallel_uploads_keep_source_order() {
        let kb = StubKb::default();
        let docs: Vec<Document> = (0..12).map(|n| doc(n, "body")).collect();

        let report = Uploader::new("doc", 4)
            .upload_all(&kb, &project(), docs, &SilentProgress, &CancelSignal::never())
            .await;

        assert_eq!(report.total(), 12);
        assert_eq!(report.uploaded(), 12);
        for (i, result) in report.results.iter().enumerate() {
            assert_eq!(result.index, i);
            assert_eq!(result.file_name, format!("document_{i}.doc"));
        }
        assert_eq!(kb.count(|c| matches!(c, Call::CreateSource(_))), 12);
    }

    #[tokio::test]
    async fn cancelled_run_starts_no_uploads() {
        let kb = StubKb::default();
        let (handle, signal) = cancel_pair();
        handle.cancel();

        let report = Uploader::default()
            .upload_all(&kb, &project(), vec![doc(0, "a")], &SilentProgress, &signal)
            .await;

        assert_eq!(report.total(), 0);
        assert!(kb.calls().is_empty());
    }
}
