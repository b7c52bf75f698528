//! Backend boundary: the trait a [`Scope`](crate::Scope) delegates to, and the
//! no-op backend.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::buckets::Buckets;
use crate::capabilities::Capabilities;
use crate::metric::{Counter, Gauge, Histogram, IntegerGauge, Timer};
use crate::stopwatch::{Stopwatch, StopwatchRecorder};

/// Tag key -> value. Ordered so identities hash and render deterministically.
pub type Tags = BTreeMap<String, String>;

/// Fully qualified metric identity: prefixed name plus effective tags.
///
/// Two handles with equal ids report to the same underlying metric.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MetricId {
    pub name: String,
    pub tags: Tags,
}

impl MetricId {
    pub fn new(name: impl Into<String>, tags: Tags) -> Self {
        Self { name: name.into(), tags }
    }
}

/// A metrics backend.
///
/// Implementations own aggregation, synchronization and export. They must
/// absorb their own failures; none of these calls can fail.
pub trait Reporter: Send + Sync {
    fn capabilities(&self) -> Capabilities;
    fn counter(&self, id: &MetricId) -> Arc<dyn Counter>;
    fn gauge(&self, id: &MetricId) -> Arc<dyn Gauge>;
    fn integer_gauge(&self, id: &MetricId) -> Arc<dyn IntegerGauge>;
    fn timer(&self, id: &MetricId) -> Arc<dyn Timer>;
    fn histogram(&self, id: &MetricId, buckets: &Buckets) -> Arc<dyn Histogram>;
}

/// Backend that drops everything and advertises [`Capabilities::NONE`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

#[derive(Debug, Clone, Copy, Default)]
struct Noop;

impl Counter for Noop {
    fn inc(&self, _delta: i64) {}
}

impl Gauge for Noop {
    fn update(&self, _value: f64) {}
}

impl IntegerGauge for Noop {
    fn update(&self, _value: i64) {}
    fn inc(&self, _delta: i64) {}
    fn dec(&self, _delta: i64) {}
}

impl StopwatchRecorder for Noop {
    fn record_stopwatch(&self, _start: Instant) {}
}

impl Timer for Noop {
    fn record(&self, _value: Duration) {}

    fn start(&self) -> Stopwatch {
        Stopwatch::new(Instant::now(), Arc::new(Noop))
    }
}

impl Histogram for Noop {
    fn record_value(&self, _value: f64) {}
    fn record_duration(&self, _value: Duration) {}

    fn start(&self) -> Stopwatch {
        Stopwatch::new(Instant::now(), Arc::new(Noop))
    }
}

impl Reporter for NullReporter {
    fn capabilities(&self) -> Capabilities {
        Capabilities::NONE
    }

    fn counter(&self, _id: &MetricId) -> Arc<dyn Counter> {
        Arc::new(Noop)
    }

    fn gauge(&self, _id: &MetricId) -> Arc<dyn Gauge> {
        Arc::new(Noop)
    }

    fn integer_gauge(&self, _id: &MetricId) -> Arc<dyn IntegerGauge> {
        Arc::new(Noop)
    }

    fn timer(&self, _id: &MetricId) -> Arc<dyn Timer> {
        Arc::new(Noop)
    }

    fn histogram(&self, _id: &MetricId, _buckets: &Buckets) -> Arc<dyn Histogram> {
        Arc::new(Noop)
    }
}
