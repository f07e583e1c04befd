//! Integration tests for the load-emails flow
//!
//! A scripted mailbox stands in for Gmail; the analytics sink is in memory
//! and the relational store is a real SQLite file.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::{Result, anyhow, bail};
use base64::prelude::*;
use chrono::DateTime;
use mailsync::gmail::api::{
    GmailMessage, Header, ListMessagesResponse, MessageBody, MessagePart, MessageRef,
};
use mailsync::models::{BodyType, Extreme, NormalizedEmail};
use mailsync::storage::{AnalyticsSink, EmailStore, InMemoryAnalyticsSink, SqliteEmailStore};
use mailsync::{ApiError, MailboxProvider, SyncOptions, load_emails};
use tempfile::TempDir;

const OWNER: &str = "me@example.com";
const BASE_TS: i64 = 1_700_000_000_000;

enum Step {
    Page {
        ids: Vec<String>,
        next_page_token: Option<String>,
    },
    Fail(u16),
}

/// Mailbox that answers list calls from a script, in order
#[derive(Default)]
struct ScriptedProvider {
    steps: Mutex<VecDeque<Step>>,
    messages: HashMap<String, GmailMessage>,
    list_calls: Mutex<Vec<(Option<String>, Option<String>)>>,
}

impl ScriptedProvider {
    fn new() -> Self {
        Self::default()
    }

    /// Add a page of messages dated one second apart starting at `first_ts`
    fn page(mut self, ids: &[&str], first_ts: i64, next_page_token: Option<&str>) -> Self {
        for (i, id) in ids.iter().enumerate() {
            let date = DateTime::from_timestamp_millis(first_ts + i as i64 * 1000)
                .unwrap()
                .to_rfc2822();
            self.messages
                .insert(id.to_string(), gmail_message(id, &date));
        }
        self.steps.get_mut().unwrap().push_back(Step::Page {
            ids: ids.iter().map(|id| id.to_string()).collect(),
            next_page_token: next_page_token.map(String::from),
        });
        self
    }

    /// Add `count` full pages of `page_size` messages, each with a next token
    fn full_pages(mut self, count: usize, page_size: usize) -> Self {
        for p in 0..count {
            let ids: Vec<String> = (0..page_size).map(|i| format!("p{}-m{}", p, i)).collect();
            let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
            let token = format!("tok-{}", p + 1);
            self = self.page(&refs, BASE_TS + (p * page_size) as i64 * 1000, Some(&token));
        }
        self
    }

    fn fail(mut self, status: u16) -> Self {
        self.steps.get_mut().unwrap().push_back(Step::Fail(status));
        self
    }

    fn with_message(mut self, message: GmailMessage) -> Self {
        let id = message.id.clone().unwrap();
        self.messages.insert(id, message);
        self
    }

    fn list_calls(&self) -> Vec<(Option<String>, Option<String>)> {
        self.list_calls.lock().unwrap().clone()
    }

    fn remaining_steps(&self) -> usize {
        self.steps.lock().unwrap().len()
    }
}

impl MailboxProvider for ScriptedProvider {
    fn list_messages(
        &self,
        _max_results: usize,
        page_token: Option<&str>,
        query: Option<&str>,
    ) -> Result<ListMessagesResponse> {
        self.list_calls
            .lock()
            .unwrap()
            .push((page_token.map(String::from), query.map(String::from)));

        match self.steps.lock().unwrap().pop_front() {
            None => Ok(ListMessagesResponse::default()),
            Some(Step::Fail(status)) => Err(ApiError {
                service: "Gmail",
                status,
                reason: None,
            }
            .into()),
            Some(Step::Page {
                ids,
                next_page_token,
            }) => Ok(ListMessagesResponse {
                messages: Some(
                    ids.into_iter()
                        .map(|id| MessageRef {
                            id,
                            thread_id: None,
                        })
                        .collect(),
                ),
                next_page_token,
            }),
        }
    }

    fn get_message(&self, id: &str) -> Result<GmailMessage> {
        self.messages
            .get(id)
            .cloned()
            .ok_or_else(|| anyhow!("message {} not found", id))
    }
}

fn header(name: &str, value: &str) -> Header {
    Header {
        name: name.to_string(),
        value: value.to_string(),
    }
}

fn gmail_message(id: &str, date: &str) -> GmailMessage {
    GmailMessage {
        id: Some(id.to_string()),
        thread_id: Some(format!("t-{}", id)),
        label_ids: Some(vec!["INBOX".to_string(), "UNREAD".to_string()]),
        payload: Some(MessagePart {
            mime_type: Some("text/plain".to_string()),
            headers: Some(vec![
                header("From", "Weekly News <news@Example.COM>"),
                header("To", OWNER),
                header("Subject", &format!("Subject {}", id)),
                header("Date", date),
            ]),
            body: Some(MessageBody {
                data: Some(BASE64_URL_SAFE_NO_PAD.encode(format!("Body of {}", id))),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn options(page_size: usize) -> SyncOptions {
    SyncOptions {
        page_size,
        pause_after_rate_limit: Duration::ZERO,
        ..Default::default()
    }
}

fn sqlite_store(dir: &TempDir) -> SqliteEmailStore {
    SqliteEmailStore::new(dir.path().join("mailsync.sqlite")).unwrap()
}

struct BrokenSink;

impl AnalyticsSink for BrokenSink {
    fn publish(&self, _emails: &[NormalizedEmail]) -> Result<()> {
        bail!("ingest endpoint unavailable")
    }

    fn last_email_timestamp(&self, _owner: &str, _extreme: Extreme) -> Result<Option<i64>> {
        Ok(None)
    }
}

struct BrokenStore;

impl EmailStore for BrokenStore {
    fn save_emails(&self, _emails: &[NormalizedEmail]) -> Result<()> {
        bail!("database is locked")
    }

    fn get_email(&self, _owner: &str, _id: &str) -> Result<Option<NormalizedEmail>> {
        Ok(None)
    }

    fn count_emails(&self, _owner: &str) -> Result<usize> {
        Ok(0)
    }

    fn count_labels(&self) -> Result<usize> {
        Ok(0)
    }
}

#[test]
fn test_first_sync_persists_to_both_destinations() {
    let dir = TempDir::new().unwrap();
    let store = sqlite_store(&dir);
    let sink = InMemoryAnalyticsSink::new();
    let provider = ScriptedProvider::new()
        .page(&["m1", "m2", "m3", "m4", "bad"], BASE_TS, None)
        .with_message(gmail_message("bad", "not a date"));

    let result = load_emails(OWNER, &provider, &sink, &store, &options(20)).unwrap();

    assert_eq!(result.pages, 0);
    assert_eq!(provider.list_calls(), vec![(None, None)]);

    let records = sink.records();
    assert_eq!(records.len(), 4);
    assert!(records.iter().all(|r| r.gmail_message_id != "bad"));
    assert_eq!(store.count_emails(OWNER).unwrap(), 4);

    let stored = store.get_email(OWNER, "m1").unwrap().unwrap();
    assert_eq!(stored.thread_id, "t-m1");
    assert_eq!(stored.timestamp, BASE_TS);
    assert_eq!(stored.body_type, BodyType::Plain);
    assert_eq!(stored.body, "Body of m1");
    assert_eq!(stored.from_domain.as_deref(), Some("example.com"));
    assert_eq!(stored.to, OWNER);
    assert!(stored.inbox);
    assert!(!stored.read);
    assert!(!stored.sent);
    assert_eq!(stored.labels, vec!["INBOX", "UNREAD"]);
    assert!(store.get_email(OWNER, "bad").unwrap().is_none());
}

#[test]
fn test_page_cap_stops_before_trailing_short_page() {
    let dir = TempDir::new().unwrap();
    let store = sqlite_store(&dir);
    let sink = InMemoryAnalyticsSink::new();
    let provider = ScriptedProvider::new()
        .full_pages(50, 2)
        .page(&["tail"], BASE_TS - 1000, None);

    let result = load_emails(OWNER, &provider, &sink, &store, &options(2)).unwrap();

    assert_eq!(result.pages, 50);
    assert_eq!(provider.list_calls().len(), 50);
    assert_eq!(provider.remaining_steps(), 1);
    assert_eq!(sink.records().len(), 100);
}

#[test]
fn test_endless_full_pages_stop_at_limit() {
    let dir = TempDir::new().unwrap();
    let store = sqlite_store(&dir);
    let sink = InMemoryAnalyticsSink::new();
    let provider = ScriptedProvider::new().full_pages(60, 1);

    let result = load_emails(OWNER, &provider, &sink, &store, &options(1)).unwrap();

    assert_eq!(result.pages, 50);
    assert_eq!(provider.list_calls().len(), 50);
    assert_eq!(store.count_emails(OWNER).unwrap(), 50);
}

#[test]
fn test_short_page_ends_pass() {
    let dir = TempDir::new().unwrap();
    let store = sqlite_store(&dir);
    let sink = InMemoryAnalyticsSink::new();
    let provider = ScriptedProvider::new()
        .full_pages(3, 2)
        .page(&["last"], BASE_TS + 60_000, Some("tok-ignored"));

    let result = load_emails(OWNER, &provider, &sink, &store, &options(2)).unwrap();

    assert_eq!(result.pages, 3);
    let tokens: Vec<Option<String>> = provider.list_calls().into_iter().map(|c| c.0).collect();
    assert_eq!(
        tokens,
        vec![
            None,
            Some("tok-1".to_string()),
            Some("tok-2".to_string()),
            Some("tok-3".to_string()),
        ]
    );
    assert_eq!(sink.records().len(), 7);
}

#[test]
fn test_failed_page_is_retried_with_same_token() {
    let dir = TempDir::new().unwrap();
    let store = sqlite_store(&dir);
    let sink = InMemoryAnalyticsSink::new();
    let provider = ScriptedProvider::new()
        .full_pages(1, 2)
        .fail(429)
        .page(&["m1"], BASE_TS + 60_000, None);

    let result = load_emails(OWNER, &provider, &sink, &store, &options(2)).unwrap();

    assert_eq!(result.pages, 1);
    let tokens: Vec<Option<String>> = provider.list_calls().into_iter().map(|c| c.0).collect();
    assert_eq!(
        tokens,
        vec![None, Some("tok-1".to_string()), Some("tok-1".to_string())]
    );
    assert_eq!(sink.records().len(), 3);
}

#[test]
fn test_retry_waits_for_backoff_once() {
    let dir = TempDir::new().unwrap();
    let store = sqlite_store(&dir);
    let sink = InMemoryAnalyticsSink::new();
    let provider = ScriptedProvider::new()
        .fail(429)
        .full_pages(1, 2)
        .page(&["m1"], BASE_TS + 60_000, None);
    let pause = Duration::from_millis(200);
    let options = SyncOptions {
        pause_after_rate_limit: pause,
        ..options(2)
    };

    let started = Instant::now();
    let result = load_emails(OWNER, &provider, &sink, &store, &options).unwrap();
    let elapsed = started.elapsed();

    assert_eq!(result.pages, 1);
    assert_eq!(provider.list_calls().len(), 3);
    assert!(elapsed >= pause, "retried after {:?}", elapsed);
    assert!(elapsed < pause * 2, "waited more than once: {:?}", elapsed);
}

#[test]
fn test_no_backoff_without_failure() {
    let dir = TempDir::new().unwrap();
    let store = sqlite_store(&dir);
    let sink = InMemoryAnalyticsSink::new();
    let provider = ScriptedProvider::new().page(&["m1"], BASE_TS, None);
    let pause = Duration::from_millis(200);
    let options = SyncOptions {
        pause_after_rate_limit: pause,
        ..options(20)
    };

    let started = Instant::now();
    load_emails(OWNER, &provider, &sink, &store, &options).unwrap();

    assert!(started.elapsed() < pause);
}

#[test]
fn test_second_failure_is_returned() {
    let dir = TempDir::new().unwrap();
    let store = sqlite_store(&dir);
    let sink = InMemoryAnalyticsSink::new();
    let provider = ScriptedProvider::new().fail(429).fail(403);

    let err = load_emails(OWNER, &provider, &sink, &store, &options(2)).unwrap_err();

    let api = err.downcast_ref::<ApiError>().unwrap();
    assert_eq!(api.status, 403);
    assert!(!api.is_rate_limited());
    assert_eq!(provider.list_calls().len(), 2);
    assert_eq!(sink.publish_calls(), 0);
}

#[test]
fn test_forward_pass_resumes_after_newest_record() {
    let dir = TempDir::new().unwrap();
    let store = sqlite_store(&dir);
    let sink = InMemoryAnalyticsSink::new();
    sink.publish(&[
        NormalizedEmail::builder(OWNER, "t0", "m0", BASE_TS).build(),
        NormalizedEmail::builder("other@example.com", "t9", "m9", BASE_TS + 5_000_000).build(),
    ])
    .unwrap();
    let provider = ScriptedProvider::new().page(&["m1"], BASE_TS + 1000, None);

    load_emails(OWNER, &provider, &sink, &store, &options(20)).unwrap();

    assert_eq!(
        provider.list_calls(),
        vec![(None, Some("after:1699999999".to_string()))]
    );
}

#[test]
fn test_backward_pass_only_with_load_before() {
    let dir = TempDir::new().unwrap();
    let sink = InMemoryAnalyticsSink::new();
    sink.publish(&[
        NormalizedEmail::builder(OWNER, "t0", "old", 1_600_000_000_000).build(),
        NormalizedEmail::builder(OWNER, "t1", "new", BASE_TS).build(),
    ])
    .unwrap();

    let forward_only = ScriptedProvider::new().page(&["m1"], BASE_TS + 1000, None);
    let store = sqlite_store(&dir);
    load_emails(OWNER, &forward_only, &sink, &store, &options(2)).unwrap();
    assert_eq!(forward_only.list_calls().len(), 1);

    let both = ScriptedProvider::new()
        .page(&["m2", "m3"], BASE_TS + 10_000, Some("fwd-2"))
        .page(&["m4"], BASE_TS + 20_000, None)
        .page(&["m5"], 1_500_000_000_000, None);
    let result = load_emails(OWNER, &both, &sink, &store, &options(2).load_before(true)).unwrap();

    assert_eq!(result.pages, 1);
    assert_eq!(
        both.list_calls(),
        vec![
            (None, Some("after:1700000000".to_string())),
            (Some("fwd-2".to_string()), Some("after:1700000000".to_string())),
            (None, Some("before:1600000001".to_string())),
        ]
    );
    assert!(store.get_email(OWNER, "m5").unwrap().is_some());
}

#[test]
fn test_page_budget_is_shared_between_passes() {
    let dir = TempDir::new().unwrap();
    let store = sqlite_store(&dir);
    let sink = InMemoryAnalyticsSink::new();
    let provider = ScriptedProvider::new().full_pages(3, 1);
    let options = SyncOptions {
        max_pages: 2,
        ..options(1).load_before(true)
    };

    let result = load_emails(OWNER, &provider, &sink, &store, &options).unwrap();

    assert_eq!(result.pages, 2);
    assert_eq!(provider.list_calls().len(), 2);
}

#[test]
fn test_store_failure_does_not_fail_sync() {
    let sink = InMemoryAnalyticsSink::new();
    let provider = ScriptedProvider::new().page(&["m1", "m2"], BASE_TS, None);

    let result = load_emails(OWNER, &provider, &sink, &BrokenStore, &options(20)).unwrap();

    assert_eq!(result.pages, 0);
    assert_eq!(sink.records().len(), 2);
}

#[test]
fn test_sink_failure_is_fatal_after_retry() {
    let dir = TempDir::new().unwrap();
    let store = sqlite_store(&dir);
    let provider = ScriptedProvider::new()
        .page(&["m1"], BASE_TS, None)
        .page(&["m1"], BASE_TS, None);

    let err = load_emails(OWNER, &provider, &BrokenSink, &store, &options(20)).unwrap_err();

    assert!(format!("{:#}", err).contains("ingest endpoint unavailable"));
    assert_eq!(provider.list_calls().len(), 2);
    assert_eq!(store.count_emails(OWNER).unwrap(), 0);
}

#[test]
fn test_repeated_sync_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let store = sqlite_store(&dir);
    let sink = InMemoryAnalyticsSink::new();

    for _ in 0..2 {
        let provider = ScriptedProvider::new().page(&["m1"], BASE_TS, None);
        load_emails(OWNER, &provider, &sink, &store, &options(20)).unwrap();
    }

    assert_eq!(store.count_emails(OWNER).unwrap(), 1);
    assert_eq!(store.count_labels().unwrap(), 2);
    assert_eq!(sink.records().len(), 2);
}
