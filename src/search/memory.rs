//! In-memory aggregate store.
//!
//! Holds tender rows in a `Vec` and groups them on every call. Used by tests
//! and benchmarks in place of the `SQLite` store; the matching rules mirror
//! the SQL built by `storage::sqlite::build_aggregate_sql`.

use super::store::{AggregateQuery, AggregateRow, BoundValues, QueryableAggregateStore};
use crate::Result;
use crate::models::TenderRecord;
use std::collections::BTreeMap;

/// A tender store backed by a vector.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTenderStore {
    rows: Vec<TenderRecord>,
}

impl InMemoryTenderStore {
    /// Creates a store holding `rows`.
    #[must_use]
    pub const fn new(rows: Vec<TenderRecord>) -> Self {
        Self { rows }
    }

    /// Adds a row.
    pub fn push(&mut self, row: TenderRecord) {
        self.rows.push(row);
    }

    /// Number of stored rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the store holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

type GroupKey = (String, Option<String>, Option<String>);

#[derive(Default)]
struct Group {
    count: u64,
    price_sum: f64,
    priced: u64,
}

impl QueryableAggregateStore for InMemoryTenderStore {
    fn aggregate(&self, query: &AggregateQuery<'_>) -> Result<Vec<AggregateRow>> {
        let mut groups: BTreeMap<GroupKey, Group> = BTreeMap::new();

        for row in self.rows.iter().filter(|r| matches(r, &query.values)) {
            let Some(name) = row.bidder_name.clone() else {
                continue;
            };
            let group = groups
                .entry((name, row.bidder_country.clone(), row.bidder_email.clone()))
                .or_default();
            group.count += 1;
            if let Some(price) = row.final_price_usd {
                group.price_sum += price;
                group.priced += 1;
            }
        }

        #[allow(clippy::cast_precision_loss)]
        let rows = groups
            .into_iter()
            .map(|((name, country, email), g)| AggregateRow {
                supplier_name: name,
                supplier_country: country,
                contact_email: email,
                match_count: g.count,
                mean_price: (g.priced > 0).then(|| g.price_sum / g.priced as f64),
            })
            .collect();
        Ok(rows)
    }
}

fn matches(row: &TenderRecord, values: &BoundValues<'_>) -> bool {
    if let Some(code) = values.buyer_country {
        if !same_country(row.buyer_country.as_deref(), code) {
            return false;
        }
    }
    if let Some(code) = values.bidder_country {
        if !same_country(row.bidder_country.as_deref(), code) {
            return false;
        }
    }
    if let Some(min) = values.year_min {
        if row.year.is_none_or(|y| y < min) {
            return false;
        }
    }
    if let Some(max) = values.year_max {
        if row.year.is_none_or(|y| y > max) {
            return false;
        }
    }
    if let Some(ceiling) = values.max_price {
        if row.final_price_usd.is_none_or(|p| p > ceiling) {
            return false;
        }
    }
    if let Some(keywords) = values.keywords {
        let needle = keywords.to_ascii_lowercase();
        let hit = [row.title.as_deref(), row.description.as_deref()]
            .into_iter()
            .flatten()
            .any(|text| text.to_ascii_lowercase().contains(&needle));
        if !hit {
            return false;
        }
    }
    true
}

/// Trims spaces only, matching SQL `TRIM()`.
fn same_country(stored: Option<&str>, code: &str) -> bool {
    stored.is_some_and(|s| s.trim_matches(' ').eq_ignore_ascii_case(code))
}
