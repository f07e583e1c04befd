//! Sync engine for mirroring a Gmail mailbox
//!
//! Pipeline per page: list IDs ([`PageCursor`]) → hydrate ([`fetch_messages`])
//! → normalize → persist ([`persist_batch`]). [`load_emails`] drives the
//! pages in both directions.

mod cursor;
mod fetch;
mod load;
mod persist;

pub use cursor::{Page, PageCursor};
pub use fetch::fetch_messages;
pub use load::{
    LoadEmailsResult, MAX_PAGES, PAGE_SIZE, PAUSE_AFTER_RATE_LIMIT, SyncOptions, load_emails,
};
pub use persist::persist_batch;
