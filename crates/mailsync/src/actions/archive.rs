//! Bulk archive of old inbox threads

use anyhow::{Context, Result};
use log::info;
use serde::Serialize;
use std::time::Duration;

use crate::gmail::MailboxActions;
use crate::models::LabelId;

/// Label applied to every thread archived in bulk
pub const ARCHIVED_LABEL: &str = "Inbox Zero/Archived";

/// Most threads Gmail returns from one list call
const MAX_THREADS: usize = 500;

/// Gmail allows roughly 25 thread modifications per second
const PAUSE_BETWEEN_THREADS: Duration = Duration::from_millis(40);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ArchiveResult {
    pub count: usize,
}

/// Find a user label by name, creating it if needed; returns its ID
pub fn get_or_create_label(actions: &dyn MailboxActions, name: &str) -> Result<String> {
    let existing = actions
        .list_labels()?
        .labels
        .unwrap_or_default()
        .into_iter()
        .find(|l| l.name == name);

    let label = match existing {
        Some(label) => label,
        None => {
            info!("Creating label {}", name);
            actions.create_label(name)?
        }
    };

    label
        .id
        .with_context(|| format!("Failed to get or create label {}", name))
}

/// Archive inbox threads older than `days_ago` days
///
/// Each thread gets the archived label and loses INBOX. Only the first page
/// of matching threads is processed per call.
pub fn bulk_archive(actions: &dyn MailboxActions, days_ago: u32) -> Result<ArchiveResult> {
    bulk_archive_with_pause(actions, days_ago, PAUSE_BETWEEN_THREADS)
}

fn bulk_archive_with_pause(
    actions: &dyn MailboxActions,
    days_ago: u32,
    pause: Duration,
) -> Result<ArchiveResult> {
    let query = format!("older_than:{}d", days_ago);
    let threads = actions
        .list_threads(MAX_THREADS, Some(&query), &[LabelId::INBOX])?
        .threads
        .unwrap_or_default();

    info!("Archiving {} threads", threads.len());

    let archived_label = get_or_create_label(actions, ARCHIVED_LABEL)?;

    for thread in &threads {
        actions.modify_thread(&thread.id, &[&archived_label], &[LabelId::INBOX])?;
        std::thread::sleep(pause);
    }

    Ok(ArchiveResult {
        count: threads.len(),
    })
}
