//! Gmail API integration
//!
//! This module provides:
//! - Gmail API response types
//! - The [`MailboxProvider`] and [`MailboxActions`] seams used by sync and actions
//! - A ureq-backed [`GmailClient`] implementing both
//! - Normalization of raw messages into [`NormalizedEmail`](crate::models::NormalizedEmail)

mod client;
mod normalize;
mod unsubscribe;

pub use client::GmailClient;
pub use normalize::{normalize_message, parse_date_header};
pub use unsubscribe::find_unsubscribe_link;

use anyhow::Result;

use api::{GmailMessage, Label, ListLabelsResponse, ListMessagesResponse, ListThreadsResponse};

/// Read access to a remote mailbox, scoped to one credential
pub trait MailboxProvider: Send + Sync {
    /// List one page of message references
    fn list_messages(
        &self,
        max_results: usize,
        page_token: Option<&str>,
        query: Option<&str>,
    ) -> Result<ListMessagesResponse>;

    /// Fetch one message in full format
    fn get_message(&self, id: &str) -> Result<GmailMessage>;
}

/// Mutating operations on a remote mailbox
pub trait MailboxActions: Send + Sync {
    /// List threads matching a query, restricted to the given labels
    fn list_threads(
        &self,
        max_results: usize,
        query: Option<&str>,
        label_ids: &[&str],
    ) -> Result<ListThreadsResponse>;

    fn list_labels(&self) -> Result<ListLabelsResponse>;

    fn create_label(&self, name: &str) -> Result<Label>;

    /// Add and remove labels on every message of a thread
    fn modify_thread(&self, thread_id: &str, add: &[&str], remove: &[&str]) -> Result<()>;
}

/// Gmail API response types
pub mod api {
    use serde::{Deserialize, Serialize};

    /// Response from listing messages
    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ListMessagesResponse {
        pub messages: Option<Vec<MessageRef>>,
        pub next_page_token: Option<String>,
    }

    /// Reference to a message (just ID and thread ID)
    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MessageRef {
        pub id: String,
        pub thread_id: Option<String>,
    }

    /// Full message from Gmail API
    #[derive(Debug, Clone, Default, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct GmailMessage {
        pub id: Option<String>,
        pub thread_id: Option<String>,
        pub label_ids: Option<Vec<String>>,
        pub payload: Option<MessagePart>,
    }

    /// Message part; the top-level payload has the same shape
    #[derive(Debug, Clone, Default, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MessagePart {
        pub mime_type: Option<String>,
        pub filename: Option<String>,
        pub headers: Option<Vec<Header>>,
        pub body: Option<MessageBody>,
        pub parts: Option<Vec<MessagePart>>,
    }

    /// Email header (name-value pair)
    #[derive(Debug, Clone, Deserialize, Serialize)]
    pub struct Header {
        pub name: String,
        pub value: String,
    }

    /// Message body (may be base64 encoded)
    #[derive(Debug, Clone, Default, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MessageBody {
        pub size: Option<i64>,
        pub data: Option<String>,
        pub attachment_id: Option<String>,
    }

    /// Response from listing threads
    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ListThreadsResponse {
        pub threads: Option<Vec<ThreadRef>>,
        pub next_page_token: Option<String>,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct ThreadRef {
        pub id: String,
    }

    /// Response from listing labels
    #[derive(Debug, Default, Deserialize)]
    pub struct ListLabelsResponse {
        pub labels: Option<Vec<Label>>,
    }

    /// Gmail label resource
    #[derive(Debug, Clone, Deserialize)]
    pub struct Label {
        pub id: Option<String>,
        pub name: String,
    }

    /// Body of `labels.create`
    #[derive(Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CreateLabelRequest<'a> {
        pub name: &'a str,
        pub label_list_visibility: &'a str,
        pub message_list_visibility: &'a str,
    }

    /// Body of `threads.modify`
    #[derive(Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ModifyThreadRequest<'a> {
        pub add_label_ids: &'a [&'a str],
        pub remove_label_ids: &'a [&'a str],
    }
}
