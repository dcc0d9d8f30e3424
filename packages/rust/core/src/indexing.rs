//! Indexing monitor: waits for every remote page to leave the `queued` state.
//!
//! The page-status listing is paginated. A listing page is re-fetched, after
//! `poll_interval`, for as long as any of its entries is queued; only a settled
//! page lets the cursor advance. The scan ends when the last page settles, the
//! poll budget runs out, or the operator cancels.

use std::time::{Duration, Instant};

use tracing::{debug, info, instrument, warn};

use sitesync_customgpt::KnowledgeBase;
use sitesync_shared::{
    FailedPagePolicy, IndexStatus, IndexingPolicy, IndexingReport, ProjectId, Result,
    SiteSyncError,
};

use crate::cancel::CancelSignal;
use crate::pipeline::ProgressReporter;

pub struct IndexingMonitor {
    policy: IndexingPolicy,
}

impl IndexingMonitor {
    pub fn new(policy: IndexingPolicy) -> Self {
        Self { policy }
    }

    /// Block until all listing pages are settled.
    ///
    /// Errors: `Fetch` on a rejected listing, `IndexingTimeout` when the poll
    /// or duration budget is spent, `IndexingFailed` under the abort policy,
    /// `Cancelled` when tripped during a wait.
    #[instrument(skip_all, fields(project_id = %project))]
    pub async fn wait_until_indexed(
        &self,
        kb: &dyn KnowledgeBase,
        project: &ProjectId,
        progress: &dyn ProgressReporter,
        cancel: &CancelSignal,
    ) -> Result<IndexingReport> {
        let start = Instant::now();
        let mut report = IndexingReport::default();
        let mut cursor: u32 = 1;
        let mut sleeps: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(SiteSyncError::Cancelled);
            }

            report.polls += 1;
            let listing = kb
                .list_pages(project, cursor, self.policy.page_size)
                .await?
                .or_status(|status| SiteSyncError::Fetch {
                    page: cursor,
                    status,
                })?;

            let pending = listing
                .entries
                .iter()
                .filter(|e| e.index_status.is_pending())
                .count();

            if pending > 0 {
                progress.indexing_poll(cursor, pending);
                self.check_budget(sleeps, start.elapsed(), report.polls)?;
                debug!(page = cursor, pending, "listing page still queued, waiting");
                sleeps += 1;
                self.sleep(cancel).await?;
                continue;
            }

            report.listing_pages += 1;
            report.pages_seen += listing.entries.len();

            let failed: Vec<String> = listing
                .entries
                .iter()
                .filter(|e| e.index_status == IndexStatus::Failed)
                .map(|e| e.page_id.clone())
                .collect();
            if !failed.is_empty() {
                match self.policy.failed_pages {
                    FailedPagePolicy::Accept => {
                        warn!(page = cursor, failed = failed.len(), "pages failed to index");
                        report.failed_pages.extend(failed);
                    }
                    FailedPagePolicy::Abort => {
                        return Err(SiteSyncError::IndexingFailed { page_ids: failed });
                    }
                }
            }

            if !listing.has_next_page {
                break;
            }
            cursor += 1;
        }

        info!(
            listing_pages = report.listing_pages,
            pages = report.pages_seen,
            failed = report.failed_pages.len(),
            polls = report.polls,
            elapsed_ms = start.elapsed().as_millis(),
            "all pages indexed"
        );
        Ok(report)
    }

    /// Refuse another wait once either bound would be exceeded.
    fn check_budget(&self, sleeps: u32, elapsed: Duration, polls: u32) -> Result<()> {
        let over_polls = sleeps >= self.policy.max_polls;
        let over_time = self
            .policy
            .max_duration
            .is_some_and(|max| elapsed + self.policy.poll_interval > max);

        if over_polls || over_time {
            return Err(SiteSyncError::IndexingTimeout { polls, elapsed });
        }
        Ok(())
    }

    async fn sleep(&self, cancel: &CancelSignal) -> Result<()> {
        tokio::select! {
            _ = tokio::time::sleep(self.policy.poll_interval) => Ok(()),
            _ = cancel.cancelled() => Err(SiteSyncError::Cancelled),
        }
    }
}
