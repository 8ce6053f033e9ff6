//! Data models for tenderscope.
//!
//! Plain records shared by storage, services and the CLI.

mod analytics;
mod offer;
mod tender;
mod user;

pub use analytics::{AnalysisKind, Metric, SeriesPoint};
pub use offer::{OfferId, OfferRecord, OfferStatus, OfferTerms};
pub use tender::{BidderPage, TENDER_COLUMNS, TenderRecord, TenderTable, display_column_name};
pub use user::{Role, Session};
