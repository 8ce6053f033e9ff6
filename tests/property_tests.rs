//! Property-based tests for the constrained search engine.
//!
//! Uses proptest to verify invariants across random tender sets and filters:
//! - Searching twice gives the same result
//! - Rows are ranked by match count, then by key
//! - The winning step is the first non-empty one
//! - Relaxed results only drop dimensions the caller supplied
//! - The row cap is honored

// Property tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used)]

use proptest::prelude::*;
use tenderscope::models::TenderRecord;
use tenderscope::search::{
    AggregateQuery, ConstrainedSearchEngine, FilterSet, FilterSetBuilder, InMemoryTenderStore,
    QueryableAggregateStore, RELAXATION_LADDER, SearchPolicy, compare_rows,
};

const COUNTRIES: [&str; 3] = ["US", "DE", "FR"];
const BIDDERS: [&str; 4] = ["Acme", "Bolt", "Corta", "Dyne"];
const WORDS: [&str; 3] = ["beds", "gloves", "vaccines"];

fn tender_strategy() -> impl Strategy<Value = TenderRecord> {
    (
        0usize..1000,
        prop::sample::select(WORDS.to_vec()),
        prop::option::of(2015i32..2025),
        prop::sample::select(COUNTRIES.to_vec()),
        prop::option::of(prop::sample::select(BIDDERS.to_vec())),
        prop::sample::select(COUNTRIES.to_vec()),
        prop::option::of(0.0f64..5000.0),
    )
        .prop_map(|(id, word, year, buyer, bidder, bidder_country, price)| {
            TenderRecord {
                tender_id: format!("T-{id}"),
                title: Some(format!("Supply of {word}")),
                description: None,
                year,
                buyer_country: Some(buyer.to_string()),
                bidder_name: bidder.map(str::to_string),
                bidder_country: Some(bidder_country.to_string()),
                bidder_email: bidder.map(|b| format!("sales@{}.example", b.to_lowercase())),
                final_price_usd: price,
            }
        })
}

fn filter_strategy() -> impl Strategy<Value = FilterSet> {
    (
        prop::option::of(prop::sample::select(COUNTRIES.to_vec())),
        prop::option::of(prop::sample::select(COUNTRIES.to_vec())),
        prop::option::of(2015i32..2025),
        prop::option::of(2015i32..2025),
        prop::option::of(0.0f64..5000.0),
        prop::option::of(prop::sample::select(WORDS.to_vec())),
    )
        .prop_map(|(buyer, bidder, year_min, year_max, max_price, keywords)| {
            FilterSetBuilder {
                buyer_country: buyer.map(str::to_string),
                bidder_country: bidder.map(str::to_string),
                year_min,
                year_max,
                max_price,
                keywords: keywords.map(str::to_string),
            }
            .build()
            .expect("generated filters are valid")
        })
}

proptest! {
    /// Property: the same filters against the same data give the same result.
    #[test]
    fn prop_search_is_deterministic(
        rows in prop::collection::vec(tender_strategy(), 0..40),
        filters in filter_strategy(),
    ) {
        let store = InMemoryTenderStore::new(rows);
        let engine = ConstrainedSearchEngine::default();
        let first = engine.search(&filters, &store).unwrap();
        let second = engine.search(&filters, &store).unwrap();
        prop_assert_eq!(first, second);
    }

    /// Property: rows are sorted by match count desc, then key asc.
    #[test]
    fn prop_rows_are_ranked(
        rows in prop::collection::vec(tender_strategy(), 0..40),
        filters in filter_strategy(),
    ) {
        let store = InMemoryTenderStore::new(rows);
        let result = ConstrainedSearchEngine::default().search(&filters, &store).unwrap();
        for pair in result.rows.windows(2) {
            prop_assert!(compare_rows(&pair[0], &pair[1]).is_lt());
        }
    }

    /// Property: every step before the winning one matches nothing.
    #[test]
    fn prop_first_non_empty_step_wins(
        rows in prop::collection::vec(tender_strategy(), 0..40),
        filters in filter_strategy(),
    ) {
        let store = InMemoryTenderStore::new(rows);
        let result = ConstrainedSearchEngine::default().search(&filters, &store).unwrap();

        for step in RELAXATION_LADDER.iter().take_while(|s| s.ordinal() < result.step.ordinal()) {
            let query = AggregateQuery::bind(&filters, step, 10);
            prop_assert!(store.aggregate(&query).unwrap().is_empty());
        }
        if result.is_empty() {
            prop_assert!(result.step.is_unconstrained());
        }
    }

    /// Property: dropped dimensions were supplied and inactive at the step.
    #[test]
    fn prop_dropped_dimensions_were_supplied(
        rows in prop::collection::vec(tender_strategy(), 0..40),
        filters in filter_strategy(),
    ) {
        let store = InMemoryTenderStore::new(rows);
        let result = ConstrainedSearchEngine::default().search(&filters, &store).unwrap();
        let supplied = filters.supplied_dimensions();
        for dim in &result.dropped {
            prop_assert!(supplied.contains(*dim));
            prop_assert!(!result.step.active().contains(*dim));
        }
    }

    /// Property: a buyer country absent from the data never matches.
    #[test]
    fn prop_unknown_buyer_country_yields_nothing(
        rows in prop::collection::vec(tender_strategy(), 0..40),
    ) {
        let store = InMemoryTenderStore::new(rows);
        let filters = FilterSet::builder().buyer_country("JP").keywords("beds").build().unwrap();
        let result = ConstrainedSearchEngine::default().search(&filters, &store).unwrap();
        prop_assert!(result.is_empty());
        prop_assert_eq!(result.step.name(), "unconstrained");
    }

    /// Property: the policy's row cap bounds the result.
    #[test]
    fn prop_row_cap_is_honored(
        rows in prop::collection::vec(tender_strategy(), 0..60),
        cap in 1usize..5,
    ) {
        let store = InMemoryTenderStore::new(rows);
        let engine = ConstrainedSearchEngine::new(SearchPolicy::with_max_rows(cap));
        let result = engine.search(&FilterSet::default(), &store).unwrap();
        prop_assert!(result.rows.len() <= cap);
    }

    /// Property: the number of queries never exceeds the ladder length.
    #[test]
    fn prop_at_most_one_query_per_step(
        rows in prop::collection::vec(tender_strategy(), 0..20),
        filters in filter_strategy(),
    ) {
        let store = InMemoryTenderStore::new(rows);
        let result = ConstrainedSearchEngine::default().search(&filters, &store).unwrap();
        prop_assert!(result.queries_issued >= 1);
        prop_assert!(result.queries_issued <= RELAXATION_LADDER.len());
    }

    /// Property: country codes are case-insensitive.
    #[test]
    fn prop_country_code_case_insensitive(
        code in prop::sample::select(COUNTRIES.to_vec()),
    ) {
        let lower = FilterSet::builder().buyer_country(code.to_lowercase()).build().unwrap();
        let upper = FilterSet::builder().buyer_country(code).build().unwrap();
        prop_assert_eq!(lower, upper);
    }
}
