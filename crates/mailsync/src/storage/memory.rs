//! In-memory analytics sink
//!
//! Keeps every published record in publish order. Used by tests and for
//! exercising the sync engine without a network.

use anyhow::{Result, anyhow};
use std::sync::RwLock;

use super::AnalyticsSink;
use crate::models::{Extreme, NormalizedEmail};

#[derive(Default)]
pub struct InMemoryAnalyticsSink {
    records: RwLock<Vec<NormalizedEmail>>,
    publish_calls: RwLock<usize>,
}

impl InMemoryAnalyticsSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all published records
    pub fn records(&self) -> Vec<NormalizedEmail> {
        self.records.read().map(|r| r.clone()).unwrap_or_default()
    }

    /// Number of `publish` calls, including empty batches
    pub fn publish_calls(&self) -> usize {
        self.publish_calls.read().map(|c| *c).unwrap_or(0)
    }
}

impl AnalyticsSink for InMemoryAnalyticsSink {
    fn publish(&self, emails: &[NormalizedEmail]) -> Result<()> {
        let mut records = self
            .records
            .write()
            .map_err(|_| anyhow!("analytics sink lock poisoned"))?;
        records.extend_from_slice(emails);

        let mut calls = self
            .publish_calls
            .write()
            .map_err(|_| anyhow!("analytics sink lock poisoned"))?;
        *calls += 1;
        Ok(())
    }

    fn last_email_timestamp(&self, owner_email: &str, extreme: Extreme) -> Result<Option<i64>> {
        let records = self
            .records
            .read()
            .map_err(|_| anyhow!("analytics sink lock poisoned"))?;
        let owned = records
            .iter()
            .filter(|e| e.owner_email == owner_email)
            .map(|e| e.timestamp);

        Ok(match extreme {
            Extreme::Oldest => owned.min(),
            Extreme::Newest => owned.max(),
        })
    }
}
