//! Offer ledger.

use crate::Result;
use crate::models::{OfferId, OfferRecord, OfferStatus, OfferTerms};

/// A supplier about to be asked for a quotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewOffer<'a> {
    /// Requesting user.
    pub username: &'a str,
    /// Supplier name.
    pub supplier_name: &'a str,
    /// Supplier country, if known.
    pub supplier_country: Option<&'a str>,
    /// Supplier contact email.
    pub supplier_email: &'a str,
}

/// Result of [`OfferLedger::record_pending`].
#[derive(Debug, Clone, PartialEq)]
pub struct PendingOutcome {
    /// The stored offer.
    pub record: OfferRecord,
    /// True if this call created the record.
    pub created: bool,
}

/// Trait for offer backends.
///
/// Offers are unique per (user, supplier name, supplier email). Emails are
/// compared case-insensitively.
pub trait OfferLedger: Send + Sync {
    /// Records a pending offer unless one already exists for the same key.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn record_pending(&self, offer: &NewOffer<'_>) -> Result<PendingOutcome>;

    /// Retrieves an offer by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn get(&self, id: &OfferId) -> Result<Option<OfferRecord>>;

    /// Lists a user's offers, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn list_for_user(&self, username: &str) -> Result<Vec<OfferRecord>>;

    /// Lists a user's offers addressed to `email`, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn find_by_email(&self, username: &str, email: &str) -> Result<Vec<OfferRecord>>;

    /// Moves an offer from `from` to `to`, replacing its terms when given.
    ///
    /// Returns false, changing nothing, if the offer is not currently in
    /// `from`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn update_status(
        &self,
        id: &OfferId,
        from: OfferStatus,
        to: OfferStatus,
        terms: Option<&OfferTerms>,
    ) -> Result<bool>;

    /// Deletes an offer that is still pending.
    ///
    /// Returns false if the offer is missing or has left `pending`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn withdraw_pending(&self, id: &OfferId) -> Result<bool>;
}

/// Normalizes an email for use as a ledger key.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}
