//! Metrics collection.
//!
//! # Metrics
//! - `requester_transport_attempts_total` (counter): physical calls by method, outcome
//! - `requester_retries_total` (counter): attempts re-issued after a failure
//! - `requester_dedup_joins_total` (counter): callers that joined an in-flight operation
//! - `requester_interruptions_total` (counter): operations cancelled by `interrupt()`
//! - `requester_resumed_total` (counter): journal rows replayed by `resume()`
//! - `requester_journal_rows` (gauge): pending journal rows
//! - `requester_cache_lookups_total` (counter): reuse cache lookups by result
//!
//! # Design Decisions
//! - Recorded through the `metrics` facade; the library installs no exporter
//! - Labels are low-cardinality (no routes)

use metrics::{counter, describe_counter, describe_gauge, gauge};

/// Register metric descriptions with the installed recorder.
pub fn describe_metrics() {
    describe_counter!(
        "requester_transport_attempts_total",
        "Physical transport calls by method and outcome"
    );
    describe_counter!("requester_retries_total", "Transport attempts re-issued after a failure");
    describe_counter!(
        "requester_dedup_joins_total",
        "Callers that joined an operation already in flight"
    );
    describe_counter!("requester_interruptions_total", "Operations cancelled by interrupt");
    describe_counter!("requester_resumed_total", "Journal rows replayed by resume");
    describe_gauge!("requester_journal_rows", "Pending journal rows");
    describe_counter!("requester_cache_lookups_total", "Reuse cache lookups by result");
}

pub fn record_transport_attempt(method: &'static str, outcome: &'static str) {
    counter!("requester_transport_attempts_total", "method" => method, "outcome" => outcome)
        .increment(1);
}

pub fn record_retry(method: &'static str) {
    counter!("requester_retries_total", "method" => method).increment(1);
}

pub fn record_dedup_join() {
    counter!("requester_dedup_joins_total").increment(1);
}

pub fn record_interruptions(count: usize) {
    counter!("requester_interruptions_total").increment(count as u64);
}

pub fn record_resumed(outcome: &'static str) {
    counter!("requester_resumed_total", "outcome" => outcome).increment(1);
}

pub fn record_journal_rows(rows: usize) {
    gauge!("requester_journal_rows").set(rows as f64);
}

pub fn record_cache_lookup(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    counter!("requester_cache_lookups_total", "result" => result).increment(1);
}
