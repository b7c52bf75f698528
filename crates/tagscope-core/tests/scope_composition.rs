//! Scope name/tag composition against a reporter that records identities.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tagscope_core::{
    Buckets, Capabilities, Counter, Gauge, Histogram, IntegerGauge, MetricId, Reporter, Scope,
    Stopwatch, Tags, Timer, ValueBuckets,
};

#[derive(Default)]
struct Recording {
    ids: Mutex<Vec<(&'static str, MetricId)>>,
    buckets: Mutex<Vec<Buckets>>,
}

struct Sink;

impl Counter for Sink {
    fn inc(&self, _delta: i64) {}
}
impl Gauge for Sink {
    fn update(&self, _value: f64) {}
}
impl IntegerGauge for Sink {
    fn update(&self, _value: i64) {}
    fn inc(&self, _delta: i64) {}
    fn dec(&self, _delta: i64) {}
}
impl Timer for Sink {
    fn record(&self, _value: Duration) {}
    fn start(&self) -> Stopwatch {
        Scope::noop().timer("sink").start()
    }
}
impl Histogram for Sink {
    fn record_value(&self, _value: f64) {}
    fn record_duration(&self, _value: Duration) {}
    fn start(&self) -> Stopwatch {
        Scope::noop().timer("sink").start()
    }
}

impl Recording {
    fn push(&self, kind: &'static str, id: &MetricId) {
        self.ids.lock().unwrap().push((kind, id.clone()));
    }

    fn last(&self) -> (&'static str, MetricId) {
        self.ids.lock().unwrap().last().cloned().expect("no metric recorded")
    }
}

impl Reporter for Recording {
    fn capabilities(&self) -> Capabilities {
        Capabilities::new(true, true)
    }
    fn counter(&self, id: &MetricId) -> Arc<dyn Counter> {
        self.push("counter", id);
        Arc::new(Sink)
    }
    fn gauge(&self, id: &MetricId) -> Arc<dyn Gauge> {
        self.push("gauge", id);
        Arc::new(Sink)
    }
    fn integer_gauge(&self, id: &MetricId) -> Arc<dyn IntegerGauge> {
        self.push("integer_gauge", id);
        Arc::new(Sink)
    }
    fn timer(&self, id: &MetricId) -> Arc<dyn Timer> {
        self.push("timer", id);
        Arc::new(Sink)
    }
    fn histogram(&self, id: &MetricId, buckets: &Buckets) -> Arc<dyn Histogram> {
        self.push("histogram", id);
        self.buckets.lock().unwrap().push(buckets.clone());
        Arc::new(Sink)
    }
}

fn tags(pairs: &[(&str, &str)]) -> Tags {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

fn root() -> (Arc<Recording>, Scope) {
    let rec = Arc::new(Recording::default());
    let scope = Scope::builder(rec.clone())
        .prefix("svc")
        .tags([("env", "prod"), ("region", "eu")])
        .build();
    (rec, scope)
}

#[test]
fn tagged_merges_with_later_tags_winning() {
    let (_rec, s) = root();
    let child = s.tagged([("region", "us"), ("host", "a")]);
    let grandchild = child.tagged([("host", "b")]);

    assert_eq!(
        grandchild.tags(),
        &tags(&[("env", "prod"), ("region", "us"), ("host", "b")])
    );
    assert_eq!(grandchild.prefix(), "svc");
}

#[test]
fn tagged_does_not_mutate_parent() {
    let (_rec, s) = root();
    let _child = s.tagged([("env", "dev")]);
    assert_eq!(s.tags(), &tags(&[("env", "prod"), ("region", "eu")]));
}

#[test]
fn sub_scope_joins_prefix_and_keeps_tags() {
    let (_rec, s) = root();
    let child = s.sub_scope("a").sub_scope("b");
    assert_eq!(child.prefix(), "svc.a.b");
    assert_eq!(child.tags(), s.tags());
    assert_eq!(s.prefix(), "svc");
}

#[test]
fn sub_scope_of_unprefixed_root_has_no_leading_separator() {
    let s = Scope::noop();
    assert_eq!(s.sub_scope("a").prefix(), "a");
    assert_eq!(s.qualified_name("x"), "x");
    assert_eq!(s.sub_scope("a").qualified_name("x"), "a.x");
}

#[test]
fn handles_carry_qualified_identity() {
    let (rec, s) = root();
    let scoped = s.sub_scope("http").tagged([("route", "/v1")]);

    scoped.gauge("inflight");
    let (kind, id) = rec.last();
    assert_eq!(kind, "gauge");
    assert_eq!(id.name, "svc.http.inflight");
    assert_eq!(id.tags.get("route").map(String::as_str), Some("/v1"));
    assert_eq!(id.tags.get("env").map(String::as_str), Some("prod"));

    scoped.integer_gauge("conns");
    assert_eq!(rec.last().0, "integer_gauge");
    scoped.timer("latency");
    assert_eq!(rec.last(), ("timer", MetricId::new("svc.http.latency", id.tags.clone())));
}

#[test]
fn repeated_counter_lookups_share_identity() {
    let (rec, s) = root();
    s.counter("x");
    let (_, first) = rec.last();
    s.counter("x");
    let (_, second) = rec.last();
    assert_eq!(first, second);
}

#[test]
fn histogram_without_buckets_uses_scope_default() {
    let rec = Arc::new(Recording::default());
    let custom: Buckets = ValueBuckets::linear(0.0, 10.0, 5).unwrap().into();
    let s = Scope::builder(rec.clone()).default_buckets(custom.clone()).build();

    s.sub_scope("child").histogram("h", None);
    let explicit: Buckets = ValueBuckets::new(vec![1.0]).unwrap().into();
    s.histogram("h2", Some(explicit.clone()));

    let seen = rec.buckets.lock().unwrap().clone();
    assert_eq!(seen, vec![custom, explicit]);
}

#[test]
fn noop_scope_advertises_nothing() {
    let s = Scope::noop();
    assert_eq!(s.capabilities(), Capabilities::NONE);
    assert!(!s.capabilities().reporting());
    assert!(!s.capabilities().tagging());

    // Every call is accepted and dropped.
    s.counter("c").inc(1);
    s.gauge("g").update(1.0);
    s.integer_gauge("i").dec(2);
    s.timer("t").start().stop();
    s.histogram("h", None).record_duration(Duration::from_millis(3));
}

#[test]
fn scopes_derive_concurrently() {
    let (rec, s) = root();
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let s = s.clone();
            std::thread::spawn(move || {
                s.sub_scope(&format!("w{i}"))
                    .tagged([("worker", i.to_string())])
                    .counter("jobs")
                    .inc(1);
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(rec.ids.lock().unwrap().len(), 8);
    assert_eq!(s.tags().len(), 2);
}
