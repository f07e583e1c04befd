//! Incremental mailbox load
//!
//! Mirrors a Gmail mailbox into the analytics sink and the relational store.
//! A forward pass picks up everything newer than the newest stored record;
//! an optional backward pass backfills everything older than the oldest.

use anyhow::Result;
use log::{info, warn};
use serde::Serialize;
use std::time::Duration;

use super::cursor::{Page, PageCursor};
use super::fetch::fetch_messages;
use super::persist::persist_batch;
use crate::error::ApiError;
use crate::gmail::{MailboxProvider, normalize_message};
use crate::models::{Extreme, NormalizedEmail, SyncBound, SyncWindow};
use crate::storage::{AnalyticsSink, EmailStore};

/// Messages listed per page; kept small to stay under Gmail's read quota
pub const PAGE_SIZE: usize = 20;

/// Upper bound on full pages processed in one invocation
pub const MAX_PAGES: usize = 50;

/// Wait before the single retry of a failed page
pub const PAUSE_AFTER_RATE_LIMIT: Duration = Duration::from_secs(10);

/// Options for a load invocation
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub page_size: usize,
    pub max_pages: usize,
    pub pause_after_rate_limit: Duration,
    /// Also backfill mail older than the oldest stored record
    pub load_before: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            page_size: PAGE_SIZE,
            max_pages: MAX_PAGES,
            pause_after_rate_limit: PAUSE_AFTER_RATE_LIMIT,
            load_before: false,
        }
    }
}

impl SyncOptions {
    pub fn load_before(mut self, load_before: bool) -> Self {
        self.load_before = load_before;
        self
    }
}

/// Result reported to the caller for progress display
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadEmailsResult {
    /// Full pages processed across both passes
    pub pages: usize,
}

/// Per-page counts, only used for logging
#[derive(Debug, Default)]
struct BatchStats {
    listed: usize,
    fetched: usize,
    published: usize,
}

/// Load new (and optionally old) mail for `owner_email`
///
/// Pages are processed strictly one after another. If a page fails, the
/// loader waits `pause_after_rate_limit` and retries it once; a second
/// failure is returned. The page budget is shared by both passes.
pub fn load_emails(
    owner_email: &str,
    provider: &dyn MailboxProvider,
    sink: &dyn AnalyticsSink,
    store: &dyn EmailStore,
    options: &SyncOptions,
) -> Result<LoadEmailsResult> {
    let loader = Loader {
        owner_email,
        provider,
        sink,
        store,
        options,
    };

    let (oldest, newest) = rayon::join(
        || sink.last_email_timestamp(owner_email, Extreme::Oldest),
        || sink.last_email_timestamp(owner_email, Extreme::Newest),
    );
    let (oldest, newest) = (oldest?, newest?);

    let mut pages = 0;

    info!("[SYNC] Loading emails after {:?} for {}", newest, owner_email);
    loader.run_pass(SyncBound::after(newest), &mut pages)?;
    info!("[SYNC] Completed emails after {:?}", newest);

    if !options.load_before {
        return Ok(LoadEmailsResult { pages });
    }

    info!("[SYNC] Loading emails before {:?} for {}", oldest, owner_email);
    loader.run_pass(SyncBound::before(oldest), &mut pages)?;
    info!("[SYNC] Completed emails before {:?}", oldest);

    Ok(LoadEmailsResult { pages })
}

struct Loader<'a> {
    owner_email: &'a str,
    provider: &'a dyn MailboxProvider,
    sink: &'a dyn AnalyticsSink,
    store: &'a dyn EmailStore,
    options: &'a SyncOptions,
}

impl Loader<'_> {
    /// Walk one direction until the listing is exhausted or the budget is spent
    fn run_pass(&self, bound: SyncBound, pages: &mut usize) -> Result<()> {
        let window = SyncWindow::new(self.owner_email, bound);
        let mut cursor = PageCursor::new(window, self.options.page_size);

        while *pages < self.options.max_pages {
            info!("[SYNC] {:?} page {}", bound, pages);

            let page = match self.save_batch(&cursor) {
                Ok(page) => page,
                Err(e) => {
                    let rate_limited = e
                        .downcast_ref::<ApiError>()
                        .is_some_and(ApiError::is_rate_limited);
                    warn!(
                        "[SYNC] Page failed (rate limited: {}): {:#}. Waiting {:?} before retrying",
                        rate_limited, e, self.options.pause_after_rate_limit
                    );
                    std::thread::sleep(self.options.pause_after_rate_limit);
                    self.save_batch(&cursor)?
                }
            };

            let full = page.is_full(self.options.page_size);
            cursor.advance(&page);

            if !full {
                break;
            }
            *pages += 1;

            if cursor.is_exhausted() {
                break;
            }
        }

        if *pages >= self.options.max_pages {
            info!("[SYNC] Reached page limit of {}", self.options.max_pages);
        }

        Ok(())
    }

    /// List, hydrate, normalize and persist the page at the cursor
    fn save_batch(&self, cursor: &PageCursor) -> Result<Page> {
        let page = cursor.fetch_page(self.provider)?;
        let messages = fetch_messages(self.provider, &page.message_ids);

        let mut stats = BatchStats {
            listed: page.message_ids.len(),
            fetched: messages.len(),
            ..Default::default()
        };

        let emails: Vec<NormalizedEmail> = messages
            .into_iter()
            .filter_map(|m| normalize_message(self.owner_email, m))
            .collect();
        stats.published = emails.len();

        persist_batch(self.sink, self.store, &emails)?;

        info!(
            "[SYNC] Batch done: listed={} fetched={} published={}",
            stats.listed, stats.fetched, stats.published
        );
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = SyncOptions::default();
        assert_eq!(options.page_size, 20);
        assert_eq!(options.max_pages, 50);
        assert_eq!(options.pause_after_rate_limit, Duration::from_secs(10));
        assert!(!options.load_before);
        assert!(options.load_before(true).load_before);
    }

    #[test]
    fn test_result_serializes_pages() {
        let json = serde_json::to_string(&LoadEmailsResult { pages: 3 }).unwrap();
        assert_eq!(json, r#"{"pages":3}"#);
    }
}
