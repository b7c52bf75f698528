//! In-process metrics registry implementing [`Reporter`].
//!
//! Every metric identity maps to one atomic cell stored in a `DashMap`, so
//! handles obtained twice for the same identity share state. Cells are never
//! removed. Histogram bucket placement follows `(lower, upper]` semantics.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use tagscope_core::{
    BucketKind, Buckets, Capabilities, Counter, Gauge, Histogram, IntegerGauge, MetricId, Reporter,
    Stopwatch, StopwatchRecorder, Tags, Timer,
};

use crate::clock::{Clock, SystemClock};
use crate::snapshot::{
    BucketCount, CounterSnapshot, GaugeSnapshot, HistogramSnapshot, IntegerGaugeSnapshot, Snapshot,
    TimerSnapshot,
};

fn duration_nanos(d: Duration) -> u64 {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}

fn add_f64(bits: &AtomicU64, v: f64) {
    let _ = bits.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |b| {
        Some((f64::from_bits(b) + v).to_bits())
    });
}

#[derive(Default)]
struct CounterCell {
    value: AtomicI64,
}

impl Counter for CounterCell {
    fn inc(&self, delta: i64) {
        self.value.fetch_add(delta, Ordering::Relaxed);
    }
}

#[derive(Default)]
struct GaugeCell {
    bits: AtomicU64,
}

impl Gauge for GaugeCell {
    fn update(&self, value: f64) {
        self.bits.store(value.to_bits(), Ordering::Relaxed);
    }
}

#[derive(Default)]
struct IntegerGaugeCell {
    value: AtomicI64,
}

impl IntegerGauge for IntegerGaugeCell {
    fn update(&self, value: i64) {
        self.value.store(value, Ordering::Relaxed);
    }

    fn inc(&self, delta: i64) {
        self.value.fetch_add(delta, Ordering::Relaxed);
    }

    fn dec(&self, delta: i64) {
        self.value.fetch_sub(delta, Ordering::Relaxed);
    }
}

struct TimerCell {
    clock: Arc<dyn Clock>,
    count: AtomicU64,
    sum_nanos: AtomicU64,
    max_nanos: AtomicU64,
}

impl TimerCell {
    fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            count: AtomicU64::new(0),
            sum_nanos: AtomicU64::new(0),
            max_nanos: AtomicU64::new(0),
        }
    }

    fn record(&self, value: Duration) {
        let nanos = duration_nanos(value);
        self.count.fetch_add(1, Ordering::Relaxed);
        self.sum_nanos.fetch_add(nanos, Ordering::Relaxed);
        self.max_nanos.fetch_max(nanos, Ordering::Relaxed);
    }
}

impl StopwatchRecorder for TimerCell {
    fn record_stopwatch(&self, start: Instant) {
        self.record(self.clock.now().saturating_duration_since(start));
    }
}

struct TimerHandle(Arc<TimerCell>);

impl Timer for TimerHandle {
    fn record(&self, value: Duration) {
        self.0.record(value);
    }

    fn start(&self) -> Stopwatch {
        Stopwatch::new(self.0.clock.now(), self.0.clone())
    }
}

struct HistogramCell {
    clock: Arc<dyn Clock>,
    buckets: Buckets,
    values: Vec<f64>,
    durations: Vec<Duration>,
    // One slot per bucket pair: len(boundaries) + 1.
    counts: Vec<AtomicU64>,
    count: AtomicU64,
    sum_bits: AtomicU64,
    mismatch_warned: AtomicBool,
}

impl HistogramCell {
    fn new(clock: Arc<dyn Clock>, buckets: &Buckets) -> Self {
        Self {
            clock,
            buckets: buckets.clone(),
            values: buckets.as_values(),
            durations: buckets.as_durations(),
            counts: (0..=buckets.len()).map(|_| AtomicU64::new(0)).collect(),
            count: AtomicU64::new(0),
            sum_bits: AtomicU64::new(0f64.to_bits()),
            mismatch_warned: AtomicBool::new(false),
        }
    }

    fn bump(&self, idx: usize, sum: f64) {
        if let Some(slot) = self.counts.get(idx) {
            slot.fetch_add(1, Ordering::Relaxed);
        }
        self.count.fetch_add(1, Ordering::Relaxed);
        add_f64(&self.sum_bits, sum);
    }

    fn record_value(&self, value: f64) {
        let idx = self.values.partition_point(|b| *b < value);
        self.bump(idx, value);
    }

    fn record_duration(&self, value: Duration) {
        let secs = value.as_secs_f64();
        // Value boundaries below zero have no duration form; compare in seconds.
        let idx = match self.buckets.kind() {
            BucketKind::Values => self.values.partition_point(|b| *b < secs),
            BucketKind::Durations => self.durations.partition_point(|b| *b < value),
        };
        self.bump(idx, secs);
    }
}

impl StopwatchRecorder for HistogramCell {
    fn record_stopwatch(&self, start: Instant) {
        self.record_duration(self.clock.now().saturating_duration_since(start));
    }
}

struct HistogramHandle(Arc<HistogramCell>);

impl Histogram for HistogramHandle {
    fn record_value(&self, value: f64) {
        self.0.record_value(value);
    }

    fn record_duration(&self, value: Duration) {
        self.0.record_duration(value);
    }

    fn start(&self) -> Stopwatch {
        Stopwatch::new(self.0.clock.now(), self.0.clone())
    }
}

/// Aggregating in-memory backend.
pub struct MemoryReporter {
    tagging: bool,
    clock: Arc<dyn Clock>,
    tags_dropped: AtomicBool,
    counters: DashMap<MetricId, Arc<CounterCell>>,
    gauges: DashMap<MetricId, Arc<GaugeCell>>,
    integer_gauges: DashMap<MetricId, Arc<IntegerGaugeCell>>,
    timers: DashMap<MetricId, Arc<TimerCell>>,
    histograms: DashMap<MetricId, Arc<HistogramCell>>,
}

impl Default for MemoryReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Reporter whose timers and histograms measure stopwatches with `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            tagging: true,
            clock,
            tags_dropped: AtomicBool::new(false),
            counters: DashMap::new(),
            gauges: DashMap::new(),
            integer_gauges: DashMap::new(),
            timers: DashMap::new(),
            histograms: DashMap::new(),
        }
    }

    /// Toggle tag support. Without it, tags are stripped from identities and
    /// differently tagged metrics of the same name aggregate together.
    pub fn with_tagging(mut self, tagging: bool) -> Self {
        self.tagging = tagging;
        self
    }

    fn identity(&self, id: &MetricId) -> MetricId {
        if self.tagging || id.tags.is_empty() {
            return id.clone();
        }
        if !self.tags_dropped.swap(true, Ordering::Relaxed) {
            tracing::warn!(metric = %id.name, "reporter has no tagging support; dropping tags");
        }
        MetricId::new(id.name.clone(), Tags::new())
    }

    fn cell<T>(
        &self,
        map: &DashMap<MetricId, Arc<T>>,
        id: &MetricId,
        kind: &'static str,
        make: impl FnOnce() -> T,
    ) -> Arc<T> {
        let id = self.identity(id);
        if let Some(cell) = map.get(&id) {
            return Arc::clone(cell.value());
        }
        match map.entry(id) {
            Entry::Occupied(e) => Arc::clone(e.get()),
            Entry::Vacant(e) => {
                tracing::debug!(metric = %e.key().name, tags = e.key().tags.len(), kind, "registered metric");
                let cell = Arc::new(make());
                e.insert(Arc::clone(&cell));
                cell
            }
        }
    }

    /// Point-in-time copy of every metric, sorted by identity.
    pub fn snapshot(&self) -> Snapshot {
        let mut counters: Vec<_> = self
            .counters
            .iter()
            .map(|r| CounterSnapshot {
                name: r.key().name.clone(),
                tags: r.key().tags.clone(),
                value: r.value().value.load(Ordering::Relaxed),
            })
            .collect();
        counters.sort_by(|a, b| (&a.name, &a.tags).cmp(&(&b.name, &b.tags)));

        let mut gauges: Vec<_> = self
            .gauges
            .iter()
            .map(|r| GaugeSnapshot {
                name: r.key().name.clone(),
                tags: r.key().tags.clone(),
                value: f64::from_bits(r.value().bits.load(Ordering::Relaxed)),
            })
            .collect();
        gauges.sort_by(|a, b| (&a.name, &a.tags).cmp(&(&b.name, &b.tags)));

        let mut integer_gauges: Vec<_> = self
            .integer_gauges
            .iter()
            .map(|r| IntegerGaugeSnapshot {
                name: r.key().name.clone(),
                tags: r.key().tags.clone(),
                value: r.value().value.load(Ordering::Relaxed),
            })
            .collect();
        integer_gauges.sort_by(|a, b| (&a.name, &a.tags).cmp(&(&b.name, &b.tags)));

        let mut timers: Vec<_> = self
            .timers
            .iter()
            .map(|r| {
                let t = r.value();
                TimerSnapshot {
                    name: r.key().name.clone(),
                    tags: r.key().tags.clone(),
                    count: t.count.load(Ordering::Relaxed),
                    sum_nanos: t.sum_nanos.load(Ordering::Relaxed),
                    max_nanos: t.max_nanos.load(Ordering::Relaxed),
                }
            })
            .collect();
        timers.sort_by(|a, b| (&a.name, &a.tags).cmp(&(&b.name, &b.tags)));

        let mut histograms: Vec<_> = self
            .histograms
            .iter()
            .map(|r| {
                let h = r.value();
                let buckets = h
                    .buckets
                    .pairs()
                    .iter()
                    .zip(h.counts.iter())
                    .map(|(pair, c)| {
                        let upper = pair.upper_bound_value();
                        BucketCount {
                            upper: upper.is_finite().then_some(upper),
                            count: c.load(Ordering::Relaxed),
                        }
                    })
                    .collect();
                HistogramSnapshot {
                    name: r.key().name.clone(),
                    tags: r.key().tags.clone(),
                    bounds: h.buckets.to_string(),
                    buckets,
                    count: h.count.load(Ordering::Relaxed),
                    sum: f64::from_bits(h.sum_bits.load(Ordering::Relaxed)),
                }
            })
            .collect();
        histograms.sort_by(|a, b| (&a.name, &a.tags).cmp(&(&b.name, &b.tags)));

        Snapshot {
            counters,
            gauges,
            integer_gauges,
            timers,
            histograms,
        }
    }

    /// Render all metrics in Prometheus text exposition format.
    pub fn render_prometheus(&self) -> String {
        self.snapshot().render_prometheus()
    }
}

impl Reporter for MemoryReporter {
    fn capabilities(&self) -> Capabilities {
        Capabilities::new(true, self.tagging)
    }

    fn counter(&self, id: &MetricId) -> Arc<dyn Counter> {
        self.cell::<CounterCell>(&self.counters, id, "counter", CounterCell::default)
    }

    fn gauge(&self, id: &MetricId) -> Arc<dyn Gauge> {
        self.cell::<GaugeCell>(&self.gauges, id, "gauge", GaugeCell::default)
    }

    fn integer_gauge(&self, id: &MetricId) -> Arc<dyn IntegerGauge> {
        self.cell::<IntegerGaugeCell>(
            &self.integer_gauges,
            id,
            "integer_gauge",
            IntegerGaugeCell::default,
        )
    }

    fn timer(&self, id: &MetricId) -> Arc<dyn Timer> {
        let cell = self.cell(&self.timers, id, "timer", || {
            TimerCell::new(Arc::clone(&self.clock))
        });
        Arc::new(TimerHandle(cell))
    }

    fn histogram(&self, id: &MetricId, buckets: &Buckets) -> Arc<dyn Histogram> {
        let cell = self.cell(&self.histograms, id, "histogram", || {
            HistogramCell::new(Arc::clone(&self.clock), buckets)
        });
        if cell.buckets != *buckets && !cell.mismatch_warned.swap(true, Ordering::Relaxed) {
            tracing::warn!(
                metric = %id.name,
                registered = %cell.buckets,
                requested = %buckets,
                "histogram already registered with different buckets; keeping the first"
            );
        }
        Arc::new(HistogramHandle(cell))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tagscope_core::ValueBuckets;

    #[test]
    fn histogram_places_values_in_upper_inclusive_buckets() {
        let buckets: Buckets = ValueBuckets::new(vec![1.0, 2.0, 4.0]).unwrap().into();
        let cell = HistogramCell::new(Arc::new(SystemClock), &buckets);
        for v in [0.5, 1.0, 1.5, 2.0, 3.9, 4.0, 100.0] {
            cell.record_value(v);
        }
        let counts: Vec<u64> = cell.counts.iter().map(|c| c.load(Ordering::Relaxed)).collect();
        assert_eq!(counts, vec![2, 2, 2, 1]);
        assert_eq!(cell.count.load(Ordering::Relaxed), 7);
    }

    #[test]
    fn duration_recorded_against_negative_value_buckets() {
        let buckets: Buckets = ValueBuckets::new(vec![-5.0, -1.0, 3.0]).unwrap().into();
        let cell = HistogramCell::new(Arc::new(SystemClock), &buckets);
        cell.record_duration(Duration::ZERO);
        cell.record_value(0.0);
        let counts: Vec<u64> = cell.counts.iter().map(|c| c.load(Ordering::Relaxed)).collect();
        assert_eq!(counts, vec![0, 0, 2, 0]);
    }

    #[test]
    fn bucket_mismatch_is_flagged_once() {
        let reporter = MemoryReporter::new();
        let id = MetricId::new("latency", Tags::new());
        let first: Buckets = ValueBuckets::new(vec![1.0]).unwrap().into();
        let other: Buckets = ValueBuckets::new(vec![2.0]).unwrap().into();
        reporter.histogram(&id, &first);
        reporter.histogram(&id, &first);
        let cell = reporter.histograms.get(&id).map(|c| Arc::clone(c.value())).unwrap();
        assert!(!cell.mismatch_warned.load(Ordering::Relaxed));
        reporter.histogram(&id, &other);
        reporter.histogram(&id, &other);
        assert!(cell.mismatch_warned.load(Ordering::Relaxed));
        assert_eq!(cell.buckets, first);
    }

    #[test]
    fn timer_tracks_count_sum_and_max() {
        let cell = TimerCell::new(Arc::new(SystemClock));
        cell.record(Duration::from_millis(5));
        cell.record(Duration::from_millis(20));
        assert_eq!(cell.count.load(Ordering::Relaxed), 2);
        assert_eq!(cell.sum_nanos.load(Ordering::Relaxed), 25_000_000);
        assert_eq!(cell.max_nanos.load(Ordering::Relaxed), 20_000_000);
    }
}
