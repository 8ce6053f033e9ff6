//! Constraint-relaxing supplier search.
//!
//! A [`FilterSet`] goes in, a [`SearchResult`] comes out. In between, the
//! [`ConstrainedSearchEngine`] walks the [`RELAXATION_LADDER`] and asks a
//! [`QueryableAggregateStore`] for grouped supplier rows at each step until
//! one step returns something.
//!
//! ```rust,ignore
//! use tenderscope::search::{ConstrainedSearchEngine, FilterSet, InMemoryTenderStore};
//!
//! let store = InMemoryTenderStore::new(rows);
//! let filters = FilterSet::builder().buyer_country("US").keywords("gloves").build()?;
//! let result = ConstrainedSearchEngine::default().search(&filters, &store)?;
//! for dropped in &result.dropped {
//!     println!("relaxed: {dropped}");
//! }
//! ```

mod engine;
mod filter;
mod ladder;
mod memory;
mod notify;
mod store;

pub use engine::{ConstrainedSearchEngine, DEFAULT_MAX_ROWS, SearchPolicy, SearchResult};
pub use filter::{CountryCode, FilterSet, FilterSetBuilder};
pub use ladder::{Dimension, DimensionSet, RELAXATION_LADDER, RelaxationStep};
pub use memory::InMemoryTenderStore;
pub use notify::{Notifier, NotifyReport};
pub use store::{AggregateQuery, AggregateRow, BoundValues, QueryableAggregateStore, compare_rows};
