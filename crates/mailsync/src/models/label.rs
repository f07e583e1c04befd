//! Gmail label identifiers

/// Well-known Gmail system label IDs
pub struct LabelId;

impl LabelId {
    pub const INBOX: &'static str = "INBOX";
    pub const SENT: &'static str = "SENT";
    pub const DRAFT: &'static str = "DRAFT";
    pub const UNREAD: &'static str = "UNREAD";
}
