//! Benchmarks for the constrained search engine.
//!
//! Measures a full ladder walk at different store sizes:
//! - exact hit (one query)
//! - hit after relaxing keywords and price
//! - miss at every step (worst case)

// Criterion macros generate items without docs - this is expected for benchmarks
// Benchmarks use expect/unwrap for simplicity - panics are acceptable in benchmarks
#![allow(missing_docs)]
#![allow(clippy::expect_used, clippy::unwrap_used, clippy::cast_precision_loss)]

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use tenderscope::config::TableNames;
use tenderscope::models::TenderRecord;
use tenderscope::search::{ConstrainedSearchEngine, FilterSet, InMemoryTenderStore};
use tenderscope::storage::SqliteTenderStore;

const COUNTRIES: [&str; 5] = ["US", "DE", "FR", "GB", "IT"];
const WORDS: [&str; 4] = ["beds", "gloves", "syringes", "masks"];

fn tenders(count: usize) -> Vec<TenderRecord> {
    (0..count)
        .map(|i| TenderRecord {
            tender_id: format!("T-{i}"),
            title: Some(format!("Supply of {}", WORDS[i % WORDS.len()])),
            description: None,
            year: Some(2015 + i32::try_from(i % 10).unwrap()),
            buyer_country: Some(COUNTRIES[i % COUNTRIES.len()].to_string()),
            bidder_name: Some(format!("Bidder {}", i % 97)),
            bidder_country: Some(COUNTRIES[(i / 7) % COUNTRIES.len()].to_string()),
            bidder_email: Some(format!("bidder{}@example.com", i % 97)),
            final_price_usd: Some((i % 1000) as f64),
        })
        .collect()
}

fn filter_cases() -> Vec<(&'static str, FilterSet)> {
    vec![
        (
            "exact",
            FilterSet::builder()
                .buyer_country("US")
                .keywords("beds")
                .build()
                .unwrap(),
        ),
        (
            "relaxed",
            FilterSet::builder()
                .buyer_country("US")
                .keywords("vaccines")
                .max_price(0.5)
                .build()
                .unwrap(),
        ),
        (
            "miss",
            FilterSet::builder()
                .buyer_country("JP")
                .keywords("beds")
                .max_price(10.0)
                .bidder_country("DE")
                .year_min(2016)
                .build()
                .unwrap(),
        ),
    ]
}

fn bench_in_memory(c: &mut Criterion) {
    let mut group = c.benchmark_group("search_in_memory");
    let engine = ConstrainedSearchEngine::default();

    for size in [100usize, 1_000, 10_000] {
        let store = InMemoryTenderStore::new(tenders(size));
        for (name, filters) in filter_cases() {
            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, _| {
                b.iter(|| engine.search(black_box(&filters), &store).unwrap());
            });
        }
    }
    group.finish();
}

fn bench_sqlite(c: &mut Criterion) {
    let mut group = c.benchmark_group("search_sqlite");
    let engine = ConstrainedSearchEngine::default();

    for size in [1_000usize, 10_000] {
        let store = SqliteTenderStore::in_memory(TableNames::default()).unwrap();
        store.insert_tenders(&tenders(size)).unwrap();
        for (name, filters) in filter_cases() {
            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, _| {
                b.iter(|| engine.search(black_box(&filters), &store).unwrap());
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_in_memory, bench_sqlite);
criterion_main!(benches);
