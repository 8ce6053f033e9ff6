//! Storage layer.
//!
//! Tender data, credentials and offers live in one `SQLite` database. The
//! traits in [`traits`] are the seams services depend on.

// Connection guards are held for the duration of one statement or transaction.
#![allow(clippy::significant_drop_tightening)]

pub mod sqlite;
pub mod traits;

pub use sqlite::{SqliteOfferStore, SqliteTenderStore, SqliteUserStore};
pub use traits::{CredentialStore, NewOffer, OfferLedger, PendingOutcome, StoredCredential};
