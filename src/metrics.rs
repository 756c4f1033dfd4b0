use tracing::trace;

// Trace-level counters; a subscriber filtering on `covers.metrics` can turn
// these into real metrics without pulling an exporter into the binary.

pub fn retry_backoff(attempt: u32, delay_ms: u128) {
    trace!(
        target = "covers.metrics",
        attempt = attempt,
        delay_ms = delay_ms as u64,
        "retry_backoff"
    );
}

pub fn outcome_recorded(bucket: &'static str) {
    trace!(target = "covers.metrics", bucket = bucket, "outcomes_total_inc");
}

pub fn isbn_elapsed(isbn: &str, elapsed_ms: u128) {
    trace!(
        target = "covers.metrics",
        isbn = isbn,
        elapsed_ms = elapsed_ms as u64,
        "isbn_elapsed"
    );
}
