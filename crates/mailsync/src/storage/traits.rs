//! Storage trait definitions

use anyhow::Result;

use crate::models::{Extreme, NormalizedEmail};

/// Append-only analytics destination
pub trait AnalyticsSink: Send + Sync {
    /// Publish a batch of records in a single call
    fn publish(&self, emails: &[NormalizedEmail]) -> Result<()>;

    /// Timestamp (ms) of the oldest or newest record stored for an owner
    fn last_email_timestamp(&self, owner_email: &str, extreme: Extreme) -> Result<Option<i64>>;
}

/// Relational store for synced emails, labels and attachments
pub trait EmailStore: Send + Sync {
    /// Upsert a batch of emails in one all-or-nothing transaction
    ///
    /// Labels are upserted by unique name, emails by
    /// `(owner_email, gmail_message_id)`.
    fn save_emails(&self, emails: &[NormalizedEmail]) -> Result<()>;

    /// Load a stored email by its Gmail message ID
    fn get_email(&self, owner_email: &str, gmail_message_id: &str)
    -> Result<Option<NormalizedEmail>>;

    /// Count stored emails for an owner
    fn count_emails(&self, owner_email: &str) -> Result<usize>;

    /// Count distinct labels across all owners
    fn count_labels(&self) -> Result<usize>;
}
