//! Storage traits.
//!
//! Services depend on these rather than on the `SQLite` types so tests can
//! substitute in-memory fakes.

mod credentials;
mod offers;

pub use credentials::{CredentialStore, StoredCredential};
pub use offers::{NewOffer, OfferLedger, PendingOutcome, normalize_email};
