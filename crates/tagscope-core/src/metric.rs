//! Metric handle contracts.
//!
//! Handles are obtained from a [`Scope`](crate::Scope) and forward to the
//! backend behind it. Every method is fire-and-forget and safe to call from
//! many threads at once; synchronization belongs to the backend.

use std::time::Duration;

use crate::stopwatch::Stopwatch;

pub trait Counter: Send + Sync {
    /// Add `delta`, which may be negative.
    fn inc(&self, delta: i64);
}

pub trait Gauge: Send + Sync {
    /// Set the absolute value.
    fn update(&self, value: f64);
}

/// Gauge with exact integer arithmetic.
pub trait IntegerGauge: Send + Sync {
    fn update(&self, value: i64);
    fn inc(&self, delta: i64);
    fn dec(&self, delta: i64);
}

pub trait Timer: Send + Sync {
    fn record(&self, value: Duration);

    /// Capture now; the returned stopwatch records into this timer.
    fn start(&self) -> Stopwatch;
}

pub trait Histogram: Send + Sync {
    /// Record against the configured value buckets.
    fn record_value(&self, value: f64);

    /// Record against the configured duration buckets.
    fn record_duration(&self, value: Duration);

    /// Capture now; stopping records a duration into this histogram.
    fn start(&self) -> Stopwatch;
}
