//! Paged listing of message IDs within a sync window

use anyhow::Result;
use log::debug;

use crate::gmail::MailboxProvider;
use crate::models::SyncWindow;

/// One page of message IDs
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub message_ids: Vec<String>,
    pub next_page_token: Option<String>,
}

impl Page {
    /// A page shorter than the requested size means the listing is exhausted
    pub fn is_full(&self, page_size: usize) -> bool {
        self.message_ids.len() >= page_size
    }
}

/// Continuation state for one directional pass
///
/// [`PageCursor::fetch_page`] does not move the cursor, so a failed page can
/// be retried with the same token; [`PageCursor::advance`] moves it.
#[derive(Debug)]
pub struct PageCursor {
    window: SyncWindow,
    page_size: usize,
    page_token: Option<String>,
    exhausted: bool,
}

impl PageCursor {
    pub fn new(window: SyncWindow, page_size: usize) -> Self {
        Self {
            window,
            page_size,
            page_token: None,
            exhausted: false,
        }
    }

    pub fn page_token(&self) -> Option<&str> {
        self.page_token.as_deref()
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// List the page at the current position
    pub fn fetch_page(&self, provider: &dyn MailboxProvider) -> Result<Page> {
        let query = self.window.query();
        debug!(
            "[SYNC] Listing {} messages for {} query={:?} page_token={:?}",
            self.page_size, self.window.owner_email, query, self.page_token
        );
        let response =
            provider.list_messages(self.page_size, self.page_token.as_deref(), query.as_deref())?;

        Ok(Page {
            message_ids: response
                .messages
                .unwrap_or_default()
                .into_iter()
                .map(|m| m.id)
                .collect(),
            next_page_token: response.next_page_token,
        })
    }

    /// Move past `page`
    pub fn advance(&mut self, page: &Page) {
        self.page_token = page.next_page_token.clone();
        self.exhausted = !page.is_full(self.page_size) || self.page_token.is_none();
    }
}
