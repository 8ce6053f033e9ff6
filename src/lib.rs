//! # Tenderscope
//!
//! Procurement analytics and supplier search over tender records.
//!
//! Tenderscope authenticates users against a credentials table, pages through
//! bidders and their tenders, aggregates spend by year, country and bidder,
//! and finds suppliers for a sourcing request through a constraint-relaxing
//! search that never invents a fuzzy match.
//!
//! ## Features
//!
//! - Constrained search engine with a declarative relaxation ladder
//! - SQLite-backed tender, credential and offer stores
//! - LLM extraction of search filters and offer terms
//! - Request-for-quotation notification with idempotent pending offers
//!
//! ## Example
//!
//! ```rust,ignore
//! use tenderscope::search::{ConstrainedSearchEngine, FilterSet};
//! use tenderscope::storage::SqliteTenderStore;
//!
//! let store = SqliteTenderStore::new("tenders.db", TableNames::default())?;
//! let filters = FilterSet::builder()
//!     .buyer_country("us")
//!     .keywords("medicine")
//!     .max_price(50.0)
//!     .build()?;
//! let result = ConstrainedSearchEngine::default().search(&filters, &store)?;
//! println!("matched at step {}", result.step.name());
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

pub mod config;
pub mod llm;
pub mod models;
pub mod observability;
pub mod search;
pub mod services;
pub mod storage;

pub use config::TenderscopeConfig;
pub use llm::LlmProvider;
pub use models::{OfferRecord, OfferStatus, OfferTerms, Role, Session};
pub use search::{
    AggregateRow, ConstrainedSearchEngine, FilterSet, QueryableAggregateStore, RelaxationStep,
    SearchResult,
};
pub use services::{AnalyticsService, AuthService, BidderService, OfferService, SupplierFinder};
pub use storage::{SqliteOfferStore, SqliteTenderStore, SqliteUserStore};

/// Error type for tenderscope operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `Validation` | A filter field is malformed (bad country code, negative price) |
/// | `QueryFailed` | The aggregate store fails while running a relaxation step |
/// | `InvalidInput` | Missing parameters, page 0, bad table names, unparsable CLI values |
/// | `OperationFailed` | `SQLite`, HTTP, JSON, CSV or filesystem errors |
/// | `Unauthorized` | Login failed or the session lacks access |
/// | `NotFound` | An offer or record does not exist |
/// | `InvalidTransition` | An offer status change outside pending → received → accepted |
#[derive(Debug, ThisError)]
pub enum Error {
    /// A search filter field failed validation. No query was issued.
    #[error("invalid filter field '{field}': {reason}")]
    Validation {
        /// The offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// The aggregate store failed while running a relaxation step.
    ///
    /// The engine never retries and never falls through to a looser step
    /// after this error.
    #[error("query failed at step '{step}': {cause}")]
    QueryFailed {
        /// Name of the relaxation step that was running.
        step: &'static str,
        /// The underlying cause.
        cause: String,
    },

    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An operation failed.
    ///
    /// Raised when:
    /// - `SQLite` statements fail
    /// - LLM requests fail or return unparsable output
    /// - Filesystem or CSV I/O fails
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// Authentication or authorization failed.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// A requested record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// An offer status change that the offer lifecycle does not allow.
    #[error("cannot move offer from '{from}' to '{to}'")]
    InvalidTransition {
        /// Current status.
        from: &'static str,
        /// Requested status.
        to: &'static str,
    },
}

/// Result type alias for tenderscope operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Returns the current Unix timestamp in seconds.
///
/// Falls back to 0 if the system clock is before the Unix epoch.
#[must_use]
pub fn current_timestamp() -> i64 {
    chrono::Utc::now().timestamp().max(0)
}
