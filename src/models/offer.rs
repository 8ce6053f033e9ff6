//! Offer records and their lifecycle.
//!
//! ```text
//! Pending ──reply──▶ OfferReceived ──accept──▶ Accepted
//! ```
//!
//! No other transition exists.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of an offer record (`UUIDv7`, time ordered).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OfferId(String);

impl OfferId {
    /// Creates an id from an existing string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh id.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::now_v7().to_string())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OfferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Status of a supplier offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferStatus {
    /// Request sent, no reply yet.
    #[default]
    Pending,
    /// Supplier replied with terms.
    OfferReceived,
    /// Requesting user accepted the offer.
    Accepted,
}

impl OfferStatus {
    /// Returns the status as stored.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::OfferReceived => "offer_received",
            Self::Accepted => "accepted",
        }
    }

    /// Parses a stored status.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "offer_received" => Some(Self::OfferReceived),
            "accepted" => Some(Self::Accepted),
            _ => None,
        }
    }

    /// Checks that `self → next` is a permitted transition.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTransition`] otherwise.
    pub fn transition_to(self, next: Self) -> Result<Self> {
        match (self, next) {
            (Self::Pending, Self::OfferReceived) | (Self::OfferReceived, Self::Accepted) => {
                Ok(next)
            },
            _ => Err(Error::InvalidTransition {
                from: self.as_str(),
                to: next.as_str(),
            }),
        }
    }
}

impl fmt::Display for OfferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Terms extracted from a supplier reply. Every field is optional because
/// replies rarely state all of them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OfferTerms {
    /// Quoted unit price.
    pub unit_price: Option<f64>,
    /// Currency of `unit_price` (ISO code when stated).
    pub currency: Option<String>,
    /// Quantity offered.
    pub quantity: Option<u64>,
    /// Delivery lead time in days.
    pub delivery_days: Option<u32>,
    /// Anything else worth keeping.
    pub notes: Option<String>,
}

impl OfferTerms {
    /// Returns true if nothing was extracted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A persisted offer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferRecord {
    /// Offer id.
    pub id: OfferId,
    /// User who requested the quotation.
    pub username: String,
    /// Supplier name.
    pub supplier_name: String,
    /// Supplier country.
    pub supplier_country: Option<String>,
    /// Address the request went to.
    pub supplier_email: String,
    /// Current status.
    pub status: OfferStatus,
    /// Terms, once a reply has been processed.
    pub terms: Option<OfferTerms>,
    /// Creation time (Unix seconds).
    pub created_at: i64,
    /// Last status change (Unix seconds).
    pub updated_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(OfferStatus::Pending, OfferStatus::OfferReceived ; "reply")]
    #[test_case(OfferStatus::OfferReceived, OfferStatus::Accepted ; "accept")]
    fn test_allowed_transitions(from: OfferStatus, to: OfferStatus) {
        assert_eq!(from.transition_to(to).unwrap(), to);
    }

    #[test_case(OfferStatus::Pending, OfferStatus::Accepted ; "skip reply")]
    #[test_case(OfferStatus::Pending, OfferStatus::Pending ; "pending again")]
    #[test_case(OfferStatus::OfferReceived, OfferStatus::Pending ; "back to pending")]
    #[test_case(OfferStatus::OfferReceived, OfferStatus::OfferReceived ; "second reply")]
    #[test_case(OfferStatus::Accepted, OfferStatus::OfferReceived ; "reopen")]
    fn test_rejected_transitions(from: OfferStatus, to: OfferStatus) {
        assert!(matches!(
            from.transition_to(to),
            Err(Error::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_status_roundtrip() {
        for status in [
            OfferStatus::Pending,
            OfferStatus::OfferReceived,
            OfferStatus::Accepted,
        ] {
            assert_eq!(OfferStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(OfferStatus::parse("declined"), None);
    }

    #[test]
    fn test_terms_is_empty() {
        assert!(OfferTerms::default().is_empty());
        let terms = OfferTerms {
            delivery_days: Some(14),
            ..OfferTerms::default()
        };
        assert!(!terms.is_empty());
    }

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(OfferId::generate(), OfferId::generate());
    }
}
