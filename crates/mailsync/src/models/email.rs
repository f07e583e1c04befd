//! Normalized email record published to the analytics sink and stored in SQLite

use serde::{Deserialize, Serialize};

use super::LabelId;

/// Placeholder body when a message has neither plain text nor HTML
pub const NO_BODY: &str = "No Body";

/// Placeholder recipient when a message has no `To` header
pub const MISSING: &str = "Missing";

/// Which representation `body` holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyType {
    #[serde(rename = "text/plain")]
    Plain,
    #[serde(rename = "text/html")]
    Html,
}

impl BodyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BodyType::Plain => "text/plain",
            BodyType::Html => "text/html",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "text/plain" => Some(BodyType::Plain),
            "text/html" => Some(BodyType::Html),
            _ => None,
        }
    }
}

/// Attachment metadata (content is never downloaded)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub filename: String,
    pub mime_type: String,
    pub size: i64,
    pub attachment_id: String,
}

/// Canonical form of one Gmail message
///
/// Built once by the normalizer and never mutated afterwards. The four
/// boolean flags are projections of `labels`; use [`NormalizedEmail::builder`]
/// so they stay consistent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedEmail {
    pub owner_email: String,
    pub thread_id: String,
    pub gmail_message_id: String,
    pub labels: Vec<String>,
    pub body_type: BodyType,
    pub body: String,
    pub from: String,
    pub from_domain: Option<String>,
    pub to: String,
    pub to_domain: Option<String>,
    pub subject: String,
    /// Milliseconds since epoch
    pub timestamp: i64,
    pub unsubscribe_link: Option<String>,
    pub read: bool,
    pub sent: bool,
    pub draft: bool,
    pub inbox: bool,
    pub attachments: Vec<Attachment>,
}

impl NormalizedEmail {
    /// Create a new builder; identity and timestamp are mandatory
    pub fn builder(
        owner_email: impl Into<String>,
        thread_id: impl Into<String>,
        gmail_message_id: impl Into<String>,
        timestamp: i64,
    ) -> NormalizedEmailBuilder {
        NormalizedEmailBuilder::new(
            owner_email.into(),
            thread_id.into(),
            gmail_message_id.into(),
            timestamp,
        )
    }
}

/// Builder for [`NormalizedEmail`]
pub struct NormalizedEmailBuilder {
    owner_email: String,
    thread_id: String,
    gmail_message_id: String,
    timestamp: i64,
    labels: Vec<String>,
    body: Option<(BodyType, String)>,
    from: Option<String>,
    to: Option<String>,
    subject: String,
    unsubscribe_link: Option<String>,
    attachments: Vec<Attachment>,
}

impl NormalizedEmailBuilder {
    fn new(owner_email: String, thread_id: String, gmail_message_id: String, timestamp: i64) -> Self {
        Self {
            owner_email,
            thread_id,
            gmail_message_id,
            timestamp,
            labels: Vec::new(),
            body: None,
            from: None,
            to: None,
            subject: String::new(),
            unsubscribe_link: None,
            attachments: Vec::new(),
        }
    }

    pub fn labels(mut self, labels: Vec<String>) -> Self {
        self.labels = labels;
        self
    }

    /// Pick the body: plain text wins over HTML
    pub fn body(mut self, text_plain: Option<String>, text_html: Option<String>) -> Self {
        self.body = match (text_plain, text_html) {
            (Some(plain), _) => Some((BodyType::Plain, plain)),
            (None, Some(html)) => Some((BodyType::Html, html)),
            (None, None) => None,
        };
        self
    }

    pub fn from(mut self, from: Option<String>) -> Self {
        self.from = from;
        self
    }

    pub fn to(mut self, to: Option<String>) -> Self {
        self.to = to;
        self
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    pub fn unsubscribe_link(mut self, link: Option<String>) -> Self {
        self.unsubscribe_link = link;
        self
    }

    pub fn attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = attachments;
        self
    }

    pub fn build(self) -> NormalizedEmail {
        let has = |label: &str| self.labels.iter().any(|l| l == label);
        let read = !has(LabelId::UNREAD);
        let sent = has(LabelId::SENT);
        let draft = has(LabelId::DRAFT);
        let inbox = has(LabelId::INBOX);

        let (body_type, body) = self
            .body
            .unwrap_or_else(|| (BodyType::Html, NO_BODY.to_string()));

        let from_domain = super::extract_domain(self.from.as_deref());
        let (to, to_domain) = match self.to {
            Some(to) => {
                let domain = super::extract_domain(Some(&to));
                (to, domain)
            }
            None => (MISSING.to_string(), Some(MISSING.to_string())),
        };

        NormalizedEmail {
            owner_email: self.owner_email,
            thread_id: self.thread_id,
            gmail_message_id: self.gmail_message_id,
            labels: self.labels,
            body_type,
            body,
            from: self.from.unwrap_or_default(),
            from_domain,
            to,
            to_domain,
            subject: self.subject,
            timestamp: self.timestamp,
            unsubscribe_link: self.unsubscribe_link,
            read,
            sent,
            draft,
            inbox,
            attachments: self.attachments,
        }
    }
}
