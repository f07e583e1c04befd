//! Batch persistence to the analytics sink and the relational store

use anyhow::{Context, Result};
use log::{error, info};

use crate::models::NormalizedEmail;
use crate::storage::{AnalyticsSink, EmailStore};

/// Write one batch to both destinations
///
/// The analytics sink is authoritative: a publish failure is returned to the
/// caller. The relational store is best-effort: a failed transaction is
/// logged and the batch is dropped for that store only.
pub fn persist_batch(
    sink: &dyn AnalyticsSink,
    store: &dyn EmailStore,
    emails: &[NormalizedEmail],
) -> Result<()> {
    info!("[SYNC] Publishing {} emails", emails.len());

    sink.publish(emails)
        .context("Failed to publish batch to analytics sink")?;

    match store.save_emails(emails) {
        Ok(()) => info!("[STORE] Saved batch of {} emails", emails.len()),
        Err(e) => error!("[STORE] Error saving batch of {} emails: {:#}", emails.len(), e),
    }

    Ok(())
}
