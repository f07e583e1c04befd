//! Mailbox mutations

mod archive;

pub use archive::{ARCHIVED_LABEL, ArchiveResult, bulk_archive, get_or_create_label};
