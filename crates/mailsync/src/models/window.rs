//! Time window bounding one sync pass

/// Which end of the stored mailbox to look at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extreme {
    Oldest,
    Newest,
}

impl Extreme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Extreme::Oldest => "oldest",
            Extreme::Newest => "newest",
        }
    }
}

/// A single time bound, in milliseconds since epoch
///
/// `After` and `Before` are mutually exclusive by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncBound {
    /// Unbounded listing (nothing stored yet)
    None,
    After(i64),
    Before(i64),
}

impl SyncBound {
    /// Forward bound from the newest stored timestamp
    ///
    /// A missing or zero timestamp means there is nothing to resume from.
    pub fn after(newest: Option<i64>) -> Self {
        match newest {
            Some(ms) if ms > 0 => SyncBound::After(ms),
            _ => SyncBound::None,
        }
    }

    /// Backward bound from the oldest stored timestamp
    pub fn before(oldest: Option<i64>) -> Self {
        match oldest {
            Some(ms) if ms > 0 => SyncBound::Before(ms),
            _ => SyncBound::None,
        }
    }

    /// Gmail search query for this bound
    ///
    /// Gmail compares in whole seconds and excludes the boundary itself, so
    /// the bound is widened by one second in the direction of travel.
    pub fn to_query(&self) -> Option<String> {
        match *self {
            SyncBound::None => None,
            SyncBound::After(ms) => Some(format!("after:{}", ms.div_euclid(1000) - 1)),
            SyncBound::Before(ms) => Some(format!("before:{}", ms.div_euclid(1000) + 1)),
        }
    }
}

/// Owner plus bound for one pass over the mailbox
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncWindow {
    pub owner_email: String,
    pub bound: SyncBound,
}

impl SyncWindow {
    pub fn new(owner_email: impl Into<String>, bound: SyncBound) -> Self {
        Self {
            owner_email: owner_email.into(),
            bound,
        }
    }

    pub fn query(&self) -> Option<String> {
        self.bound.to_query()
    }
}
