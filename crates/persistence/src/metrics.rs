//! Store metrics collection.
//!
//! Records operation timings and counts through the `metrics` facade; which
//! exporter (if any) consumes them is up to the embedding application.

use metrics::{counter, histogram};
use std::time::Instant;

/// Record the duration of a store operation.
pub fn record_op_duration(op: &str, duration_secs: f64) {
    histogram!(
        "store_op_duration_seconds",
        "op" => op.to_string()
    )
    .record(duration_secs);
}

/// Record one store mutation.
pub fn record_write(op: &str) {
    counter!("store_writes_total", "op" => op.to_string()).increment(1);
}

/// A helper to time store operations and record metrics.
pub struct OpTimer {
    op: String,
    start: Instant,
}

impl OpTimer {
    pub fn new(op: impl Into<String>) -> Self {
        Self {
            op: op.into(),
            start: Instant::now(),
        }
    }

    /// Record the elapsed duration to metrics.
    pub fn record(self) {
        let duration = self.start.elapsed().as_secs_f64();
        record_op_duration(&self.op, duration);
    }
}
