//! The aggregate store seam.
//!
//! The engine never builds queries itself. It hands an [`AggregateQuery`]
//! (which dimensions are active plus their bound values) to a
//! [`QueryableAggregateStore`] and gets back grouped supplier rows.
//!
//! # Implementor Notes
//!
//! - `aggregate` must be read-only and deterministic for identical store state
//! - Only the values present in [`BoundValues`] constrain the query; the
//!   engine leaves inactive dimensions unbound
//! - Country comparisons must be case-insensitive
//! - Keyword matching is a case-insensitive substring test on title or
//!   description
//! - `limit` is a hint; the engine re-ranks and truncates whatever comes back

use super::filter::FilterSet;
use super::ladder::{Dimension, DimensionSet, RelaxationStep};
use crate::Result;
use serde::Serialize;
use std::cmp::Ordering;

/// Values bound for one aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundValues<'a> {
    /// Buyer country (uppercase). Bound at every step when supplied.
    pub buyer_country: Option<&'a str>,
    /// Bidder country (uppercase).
    pub bidder_country: Option<&'a str>,
    /// Inclusive lower year bound.
    pub year_min: Option<i32>,
    /// Inclusive upper year bound.
    pub year_max: Option<i32>,
    /// Inclusive price ceiling.
    pub max_price: Option<f64>,
    /// Title/description substring.
    pub keywords: Option<&'a str>,
}

/// One grouped aggregation request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregateQuery<'a> {
    /// Dimensions active at the current step.
    pub active: DimensionSet,
    /// Bound values. Inactive dimensions are always `None`.
    pub values: BoundValues<'a>,
    /// Maximum rows the caller will keep.
    pub limit: usize,
}

impl<'a> AggregateQuery<'a> {
    /// Binds the values of `filters` that are active at `step`.
    #[must_use]
    pub fn bind(filters: &'a FilterSet, step: &RelaxationStep, limit: usize) -> Self {
        let active = step.active();
        let year_active = active.contains(Dimension::YearRange);
        let values = BoundValues {
            buyer_country: filters.buyer_country().map(|c| c.as_str()),
            bidder_country: filters
                .bidder_country()
                .filter(|_| active.contains(Dimension::BidderCountry))
                .map(|c| c.as_str()),
            year_min: filters.year_min().filter(|_| year_active),
            year_max: filters.year_max().filter(|_| year_active),
            max_price: filters
                .max_price()
                .filter(|_| active.contains(Dimension::MaxPrice)),
            keywords: filters
                .keywords()
                .filter(|_| active.contains(Dimension::Keywords)),
        };
        Self {
            active,
            values,
            limit,
        }
    }
}

/// One supplier grouped by its identifying attributes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateRow {
    /// Supplier (bidder) name.
    pub supplier_name: String,
    /// Supplier country, as stored.
    pub supplier_country: Option<String>,
    /// Contact email, as stored.
    pub contact_email: Option<String>,
    /// Number of tender rows in the group.
    pub match_count: u64,
    /// Mean price over the group's non-null prices.
    pub mean_price: Option<f64>,
}

impl AggregateRow {
    /// The grouping key: name, country, contact.
    #[must_use]
    pub fn key(&self) -> (&str, Option<&str>, Option<&str>) {
        (
            self.supplier_name.as_str(),
            self.supplier_country.as_deref(),
            self.contact_email.as_deref(),
        )
    }

    /// Returns the contact email if it looks deliverable.
    #[must_use]
    pub fn usable_contact(&self) -> Option<&str> {
        self.contact_email
            .as_deref()
            .map(str::trim)
            .filter(|e| e.contains('@') && !e.starts_with('@') && !e.ends_with('@'))
    }
}

/// Result ordering: `match_count` descending, then identifying key ascending.
#[must_use]
pub fn compare_rows(a: &AggregateRow, b: &AggregateRow) -> Ordering {
    b.match_count
        .cmp(&a.match_count)
        .then_with(|| a.key().cmp(&b.key()))
}

/// A data source able to run a grouped, filtered supplier aggregation.
pub trait QueryableAggregateStore {
    /// Runs one aggregation.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store fails. The engine reports
    /// it as [`crate::Error::QueryFailed`] tagged with the running step.
    fn aggregate(&self, query: &AggregateQuery<'_>) -> Result<Vec<AggregateRow>>;
}

impl<T: QueryableAggregateStore + ?Sized> QueryableAggregateStore for &T {
    fn aggregate(&self, query: &AggregateQuery<'_>) -> Result<Vec<AggregateRow>> {
        (**self).aggregate(query)
    }
}

impl<T: QueryableAggregateStore + ?Sized> QueryableAggregateStore for Box<T> {
    fn aggregate(&self, query: &AggregateQuery<'_>) -> Result<Vec<AggregateRow>> {
        (**self).aggregate(query)
    }
}
