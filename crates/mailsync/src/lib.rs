//! Mailsync - Gmail mirroring and inbox maintenance
//!
//! This crate provides:
//! - Gmail API client and message normalization
//! - Storage traits with Tinybird, SQLite and in-memory backends
//! - The incremental load-emails sync engine
//! - Bulk archive of old inbox threads
//! - Sender categorization with a language model
//!
//! All I/O is synchronous (ureq, rusqlite); callers choose their own executor.

pub mod actions;
pub mod categorize;
pub mod config;
pub mod error;
pub mod gmail;
pub mod models;
pub mod storage;
pub mod sync;

pub use actions::{ArchiveResult, bulk_archive};
pub use categorize::{
    Category, CategorizeRequest, LanguageModel, OpenAiChatModel, SenderCategory, categorize_sender,
};
pub use config::Settings;
pub use error::ApiError;
pub use gmail::{GmailClient, MailboxActions, MailboxProvider, normalize_message};
pub use models::{Attachment, BodyType, Extreme, NormalizedEmail, SyncBound, SyncWindow};
pub use storage::{AnalyticsSink, EmailStore, InMemoryAnalyticsSink, SqliteEmailStore, TinybirdSink};
pub use sync::{LoadEmailsResult, SyncOptions, load_emails};
