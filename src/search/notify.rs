//! Notification hook for search results.

use super::engine::SearchResult;
use crate::Result;
use serde::Serialize;

/// Outcome of notifying the suppliers in a [`SearchResult`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NotifyReport {
    /// Suppliers sent a new request for quotation.
    pub requested: Vec<String>,
    /// Suppliers that already had a pending offer for this user.
    pub already_pending: Vec<String>,
    /// Suppliers without a usable contact email.
    pub skipped_no_contact: Vec<String>,
    /// Suppliers whose message could not be sent. No offer is kept for them.
    pub failed: Vec<String>,
}

impl NotifyReport {
    /// Total rows considered.
    #[must_use]
    pub fn total(&self) -> usize {
        self.requested.len()
            + self.already_pending.len()
            + self.skipped_no_contact.len()
            + self.failed.len()
    }
}

/// Receives search results unmodified and contacts the suppliers in them.
///
/// # Implementor Notes
///
/// - Each row maps to at most one outbound request per requesting user
/// - Rows without a usable contact must be skipped, not failed
/// - A row whose delivery fails must not block a later retry
/// - Retry and backoff are the implementor's concern
pub trait Notifier {
    /// Notifies every supplier in `result` on behalf of `requester`.
    ///
    /// # Errors
    ///
    /// Returns an error if recording or sending fails.
    fn notify(&self, requester: &str, result: &SearchResult) -> Result<NotifyReport>;
}
