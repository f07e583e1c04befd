//! Message hydration

use log::warn;
use rayon::prelude::*;

use crate::gmail::MailboxProvider;
use crate::gmail::api::GmailMessage;

/// Fetch full messages for `ids`, in order, skipping any that fail
///
/// Requests are issued concurrently; a page is at most a few dozen IDs.
pub fn fetch_messages(provider: &dyn MailboxProvider, ids: &[String]) -> Vec<GmailMessage> {
    ids.par_iter()
        .filter_map(|id| match provider.get_message(id) {
            Ok(message) => Some(message),
            Err(e) => {
                warn!("[SYNC] Error fetching message {}: {:#}", id, e);
                None
            }
        })
        .collect()
}
