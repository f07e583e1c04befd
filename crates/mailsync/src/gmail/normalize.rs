//! Gmail API response normalization
//!
//! Converts full-format Gmail messages into [`NormalizedEmail`] records.

use base64::prelude::*;
use chrono::DateTime;
use log::{error, warn};

use super::api::{GmailMessage, MessagePart};
use super::find_unsubscribe_link;
use crate::models::{Attachment, NormalizedEmail};

/// Normalize a Gmail API message for `owner_email`
///
/// Returns `None` when the message lacks an ID, a thread ID, or a parseable
/// `Date` header. Such messages never reach persistence.
pub fn normalize_message(owner_email: &str, gmail_msg: GmailMessage) -> Option<NormalizedEmail> {
    let (Some(id), Some(thread_id)) = (gmail_msg.id, gmail_msg.thread_id) else {
        warn!("[NORMALIZE] Skipping message without id or thread id");
        return None;
    };

    let empty = MessagePart::default();
    let payload = gmail_msg.payload.as_ref().unwrap_or(&empty);

    let date = extract_header(payload, "Date");
    let Some(timestamp) = date.as_deref().and_then(parse_date_header) else {
        error!(
            "[NORMALIZE] No timestamp for email owner={} message={} date={:?}",
            owner_email, id, date
        );
        return None;
    };

    let text_plain = find_body(payload, "text/plain");
    let text_html = find_body(payload, "text/html");

    let unsubscribe_link = find_unsubscribe_link(text_html.as_deref())
        .or_else(|| extract_header(payload, "List-Unsubscribe"));

    let mut attachments = Vec::new();
    collect_attachments(payload, &mut attachments);

    Some(
        NormalizedEmail::builder(owner_email, thread_id, id, timestamp)
            .labels(gmail_msg.label_ids.unwrap_or_default())
            .from(extract_header(payload, "From"))
            .to(extract_header(payload, "To"))
            .subject(extract_header(payload, "Subject").unwrap_or_default())
            .unsubscribe_link(unsubscribe_link)
            .attachments(attachments)
            .body(text_plain, text_html)
            .build(),
    )
}

/// Parse a `Date` header into milliseconds since epoch
///
/// Accepts RFC 2822 (with or without a trailing comment such as `(UTC)`)
/// and RFC 3339. A zero timestamp is treated as unparseable.
pub fn parse_date_header(value: &str) -> Option<i64> {
    let value = value.trim();
    let without_comment = match value.rfind('(') {
        Some(idx) if value.ends_with(')') => value[..idx].trim_end(),
        _ => value,
    };

    let parsed = DateTime::parse_from_rfc2822(without_comment)
        .or_else(|_| DateTime::parse_from_rfc3339(without_comment))
        .ok()?;

    let millis = parsed.timestamp_millis();
    (millis != 0).then_some(millis)
}

/// Extract a header value by name
fn extract_header(payload: &MessagePart, name: &str) -> Option<String> {
    payload.headers.as_ref()?.iter().find_map(|h| {
        if h.name.eq_ignore_ascii_case(name) {
            Some(h.value.clone())
        } else {
            None
        }
    })
}

/// Find the first inline body of the given MIME type, depth first
fn find_body(part: &MessagePart, mime_type: &str) -> Option<String> {
    if is_attachment(part) {
        return None;
    }

    if part
        .mime_type
        .as_ref()
        .is_some_and(|m| m.starts_with(mime_type))
        && let Some(body) = &part.body
        && let Some(data) = &body.data
        && let Some(text) = decode_base64_body(data)
    {
        return Some(text);
    }

    part.parts
        .as_ref()?
        .iter()
        .find_map(|nested| find_body(nested, mime_type))
}

fn is_attachment(part: &MessagePart) -> bool {
    part.filename.as_ref().is_some_and(|f| !f.is_empty())
}

/// Collect attachment metadata from every part with a filename
fn collect_attachments(part: &MessagePart, out: &mut Vec<Attachment>) {
    if let Some(filename) = part.filename.as_ref().filter(|f| !f.is_empty()) {
        let body = part.body.as_ref();
        out.push(Attachment {
            filename: filename.clone(),
            mime_type: part.mime_type.clone().unwrap_or_default(),
            size: body.and_then(|b| b.size).unwrap_or(0),
            attachment_id: body
                .and_then(|b| b.attachment_id.clone())
                .unwrap_or_default(),
        });
    }

    for nested in part.parts.iter().flatten() {
        collect_attachments(nested, out);
    }
}

/// Decode base64-encoded body data
///
/// Gmail uses URL-safe base64 but padding can vary, so we try multiple decoders.
fn decode_base64_body(data: &str) -> Option<String> {
    use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE};

    let decoders: &[&base64::engine::GeneralPurpose] =
        &[&BASE64_URL_SAFE_NO_PAD, &URL_SAFE, &STANDARD, &STANDARD_NO_PAD];

    decoders
        .iter()
        .find_map(|decoder| decoder.decode(data).ok())
        .and_then(|decoded| String::from_utf8(decoded).ok())
}
