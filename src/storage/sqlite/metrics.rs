//! Operation metrics for the `SQLite` stores.

use std::time::Instant;

/// Records the count and latency of one store operation.
///
/// Emits `storage_operations_total` (counter) and
/// `storage_operation_duration_ms` (histogram), both labelled with the store,
/// the operation and `"success"` or `"error"`.
pub fn record_operation_metrics(
    store: &'static str,
    operation: &'static str,
    start: Instant,
    status: &'static str,
) {
    metrics::counter!(
        "storage_operations_total",
        "store" => store,
        "operation" => operation,
        "status" => status
    )
    .increment(1);
    metrics::histogram!(
        "storage_operation_duration_ms",
        "store" => store,
        "operation" => operation,
        "status" => status
    )
    .record(start.elapsed().as_secs_f64() * 1000.0);
}

/// Runs `f`, recording its outcome under `store`/`operation`.
pub fn timed<T, E>(
    store: &'static str,
    operation: &'static str,
    f: impl FnOnce() -> std::result::Result<T, E>,
) -> std::result::Result<T, E> {
    let start = Instant::now();
    let result = f();
    let status = if result.is_ok() { "success" } else { "error" };
    record_operation_metrics(store, operation, start, status);
    result
}
