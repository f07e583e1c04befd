//! Persistence backends
//!
//! Two destinations receive every synced batch: an append-only analytics
//! sink (authoritative for sync progress) and a relational store written on
//! a best-effort basis. Both sit behind traits so the sync engine can be
//! driven against in-memory doubles.

mod memory;
mod sqlite;
mod tinybird;
mod traits;

pub use memory::InMemoryAnalyticsSink;
pub use sqlite::SqliteEmailStore;
pub use tinybird::{DEFAULT_BASE_URL as TINYBIRD_BASE_URL, TinybirdSink};
pub use traits::{AnalyticsSink, EmailStore};
