//! Constrained search engine.

use super::filter::FilterSet;
use super::ladder::{Dimension, DimensionSet, RELAXATION_LADDER, RelaxationStep};
use super::store::{AggregateQuery, AggregateRow, QueryableAggregateStore, compare_rows};
use crate::{Error, Result};
use serde::Serialize;

/// Default cap on returned supplier rows.
///
/// Bounds downstream notification volume. Configurable through
/// [`SearchPolicy`] and the `[search] max_rows` config key.
pub const DEFAULT_MAX_ROWS: usize = 10;

/// Tunables for the search engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchPolicy {
    max_rows: usize,
}

impl SearchPolicy {
    /// Creates a policy returning at most `max_rows` rows (minimum 1).
    #[must_use]
    pub const fn with_max_rows(max_rows: usize) -> Self {
        Self {
            max_rows: if max_rows == 0 { 1 } else { max_rows },
        }
    }

    /// Maximum rows returned per search.
    #[must_use]
    pub const fn max_rows(&self) -> usize {
        self.max_rows
    }
}

impl Default for SearchPolicy {
    fn default() -> Self {
        Self::with_max_rows(DEFAULT_MAX_ROWS)
    }
}

/// Rows produced by a search, tagged with the step that produced them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    /// The step whose query produced `rows`. For an empty result this is
    /// always the fully relaxed step.
    #[serde(serialize_with = "serialize_step")]
    pub step: RelaxationStep,
    /// Ranked supplier rows, at most `max_rows`.
    pub rows: Vec<AggregateRow>,
    /// Dimensions the caller supplied that `step` did not apply.
    pub dropped: Vec<Dimension>,
    /// Queries issued against the store.
    pub queries_issued: usize,
}

impl SearchResult {
    /// Returns true if no supplier matched at any relaxation level.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns true if some supplied constraint had to be dropped.
    #[must_use]
    pub fn is_relaxed(&self) -> bool {
        !self.dropped.is_empty()
    }
}

fn serialize_step<S: serde::Serializer>(
    step: &RelaxationStep,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(step.name())
}

/// Finds suppliers by relaxing constraints one dimension at a time.
///
/// Steps run in [`RELAXATION_LADDER`] order and the first non-empty step
/// wins. Results are never merged or ranked across steps. A store failure
/// stops the search immediately with [`Error::QueryFailed`]; only an empty
/// successful result moves on to the next step.
///
/// A step whose effective constraints (active dimensions that carry a value)
/// match the previously attempted step is skipped, since it would repeat the
/// same query. At most one query per ladder step is issued.
///
/// The engine is a pure function of the filters and the store state. It
/// does not log, retry or write. Each step reads the store independently,
/// so if other writers touch the store during a search, a later step may
/// see a different snapshot than an earlier one. That weak consistency is
/// accepted.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstrainedSearchEngine {
    policy: SearchPolicy,
}

impl ConstrainedSearchEngine {
    /// Creates an engine with the given policy.
    #[must_use]
    pub const fn new(policy: SearchPolicy) -> Self {
        Self { policy }
    }

    /// The engine's policy.
    #[must_use]
    pub const fn policy(&self) -> SearchPolicy {
        self.policy
    }

    /// Runs the relaxation ladder against `source`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::QueryFailed`] naming the step at which `source`
    /// failed. An empty result at every level is not an error.
    pub fn search<S>(&self, filters: &FilterSet, source: &S) -> Result<SearchResult>
    where
        S: QueryableAggregateStore + ?Sized,
    {
        let supplied = filters.supplied_dimensions();
        let mut previous: Option<DimensionSet> = None;
        let mut queries_issued = 0;

        for step in &RELAXATION_LADDER {
            let effective = step.active().intersection(supplied);
            if previous == Some(effective) {
                continue;
            }
            previous = Some(effective);

            let query = AggregateQuery::bind(filters, step, self.policy.max_rows);
            queries_issued += 1;
            let mut rows = source.aggregate(&query).map_err(|e| Error::QueryFailed {
                step: step.name(),
                cause: e.to_string(),
            })?;

            if !rows.is_empty() {
                rows.sort_by(compare_rows);
                rows.truncate(self.policy.max_rows);
                return Ok(SearchResult {
                    step: *step,
                    rows,
                    dropped: dropped_dimensions(supplied, step),
                    queries_issued,
                });
            }
        }

        let last = RelaxationStep::last();
        Ok(SearchResult {
            step: last,
            rows: Vec::new(),
            dropped: dropped_dimensions(supplied, &last),
            queries_issued,
        })
    }
}

fn dropped_dimensions(supplied: DimensionSet, step: &RelaxationStep) -> Vec<Dimension> {
    supplied.iter().filter(|d| !step.active().contains(*d)).collect()
}
