//! Gmail API HTTP client
//!
//! Uses synchronous HTTP (ureq) to be executor-agnostic. The client is scoped
//! to a single access token; refreshing it is the caller's concern.

use anyhow::{Context, Result};

use super::api::{
    CreateLabelRequest, GmailMessage, Label, ListLabelsResponse, ListMessagesResponse,
    ListThreadsResponse, ModifyThreadRequest,
};
use super::{MailboxActions, MailboxProvider};
use crate::error::{check_status, http_agent};

const SERVICE: &str = "Gmail";

/// Gmail API client bound to one access token
pub struct GmailClient {
    agent: ureq::Agent,
    access_token: String,
}

impl GmailClient {
    /// Gmail API base URL
    const BASE_URL: &'static str = "https://gmail.googleapis.com/gmail/v1";

    /// Create a new Gmail client
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            agent: http_agent(),
            access_token: access_token.into(),
        }
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

impl MailboxProvider for GmailClient {
    /// List message IDs from the user's mailbox
    ///
    /// # Arguments
    /// * `max_results` - Maximum number of messages to return per page (1-500)
    /// * `page_token` - Optional page token for pagination
    /// * `query` - Optional Gmail search query (e.g. `after:1700000000`)
    fn list_messages(
        &self,
        max_results: usize,
        page_token: Option<&str>,
        query: Option<&str>,
    ) -> Result<ListMessagesResponse> {
        let mut url = format!(
            "{}/users/me/messages?maxResults={}",
            Self::BASE_URL,
            max_results.clamp(1, 500)
        );

        if let Some(token) = page_token {
            url.push_str(&format!("&pageToken={}", urlencoding::encode(token)));
        }
        if let Some(q) = query {
            url.push_str(&format!("&q={}", urlencoding::encode(q)));
        }

        let mut response = check_status(
            self.agent.get(&url).header("Authorization", &self.bearer()).call(),
            SERVICE,
        )
        .context("Failed to list messages")?;

        response
            .body_mut()
            .read_json()
            .context("Failed to parse list messages response")
    }

    fn get_message(&self, id: &str) -> Result<GmailMessage> {
        let url = format!(
            "{}/users/me/messages/{}?format=full",
            Self::BASE_URL,
            urlencoding::encode(id)
        );

        let mut response = check_status(
            self.agent.get(&url).header("Authorization", &self.bearer()).call(),
            SERVICE,
        )
        .with_context(|| format!("Failed to get message {}", id))?;

        response
            .body_mut()
            .read_json()
            .context("Failed to parse message response")
    }
}

impl MailboxActions for GmailClient {
    fn list_threads(
        &self,
        max_results: usize,
        query: Option<&str>,
        label_ids: &[&str],
    ) -> Result<ListThreadsResponse> {
        let mut url = format!(
            "{}/users/me/threads?maxResults={}",
            Self::BASE_URL,
            max_results.clamp(1, 500)
        );

        if let Some(q) = query {
            url.push_str(&format!("&q={}", urlencoding::encode(q)));
        }
        for label in label_ids {
            url.push_str(&format!("&labelIds={}", urlencoding::encode(label)));
        }

        let mut response = check_status(
            self.agent.get(&url).header("Authorization", &self.bearer()).call(),
            SERVICE,
        )
        .context("Failed to list threads")?;

        response
            .body_mut()
            .read_json()
            .context("Failed to parse list threads response")
    }

    fn list_labels(&self) -> Result<ListLabelsResponse> {
        let url = format!("{}/users/me/labels", Self::BASE_URL);

        let mut response = check_status(
            self.agent.get(&url).header("Authorization", &self.bearer()).call(),
            SERVICE,
        )
        .context("Failed to list labels")?;

        response
            .body_mut()
            .read_json()
            .context("Failed to parse labels response")
    }

    fn create_label(&self, name: &str) -> Result<Label> {
        let url = format!("{}/users/me/labels", Self::BASE_URL);
        let request = CreateLabelRequest {
            name,
            label_list_visibility: "labelShow",
            message_list_visibility: "show",
        };

        let mut response = check_status(
            self.agent.post(&url)
                .header("Authorization", &self.bearer())
                .send_json(&request),
            SERVICE,
        )
        .with_context(|| format!("Failed to create label {}", name))?;

        response
            .body_mut()
            .read_json()
            .context("Failed to parse created label")
    }

    fn modify_thread(&self, thread_id: &str, add: &[&str], remove: &[&str]) -> Result<()> {
        let url = format!(
            "{}/users/me/threads/{}/modify",
            Self::BASE_URL,
            urlencoding::encode(thread_id)
        );
        let request = ModifyThreadRequest {
            add_label_ids: add,
            remove_label_ids: remove,
        };

        check_status(
            self.agent.post(&url)
                .header("Authorization", &self.bearer())
                .send_json(&request),
            SERVICE,
        )
        .with_context(|| format!("Failed to modify thread {}", thread_id))?;

        Ok(())
    }
}
