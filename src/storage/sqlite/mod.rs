//! `SQLite` stores.
//!
//! Each store owns its own `Mutex<Connection>`. Stores opened on the same
//! file share the database through `SQLite`'s WAL mode.
//!
//! - [`SqliteTenderStore`]: tender, bidder and `user_bidders` tables
//! - [`SqliteUserStore`]: the `users` table
//! - [`SqliteOfferStore`]: the `offers` table

mod connection;
mod metrics;
mod offers;
mod sql;
mod tender;
mod users;

pub use connection::{acquire_lock, configure_connection, open_connection, open_in_memory};
pub use metrics::{record_operation_metrics, timed};
pub use offers::SqliteOfferStore;
pub use sql::{build_aggregate_sql, build_filter_clause_numbered, escape_like_wildcards};
pub use tender::{SqliteTenderStore, TOP_BIDDER_LIMIT};
pub use users::SqliteUserStore;
