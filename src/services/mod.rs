//! Business logic services.
//!
//! Services combine the stores, the search engine and the LLM client into
//! the operations the CLI exposes. Each takes its dependencies as `Arc`s so
//! one store can back several services.

mod analytics;
pub mod auth;
mod bidders;
mod offers;
mod rfq;
mod supplier_finder;

pub use analytics::{AnalyticsService, render_csv};
pub use auth::{AuthService, DEFAULT_HASH_COST, hash_password, verify_password};
pub use bidders::{BidderService, DEFAULT_PAGE_SIZE};
pub use offers::OfferService;
pub use rfq::{LogMailer, Mailer, OutboundMessage, RfqNotifier};
pub use supplier_finder::{FinderOutcome, SourcingRequest, SupplierFinder};
