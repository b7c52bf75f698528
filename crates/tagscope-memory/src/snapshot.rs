//! Point-in-time metric snapshots and their text renderings.
//!
//! Prometheus names only allow `[a-zA-Z0-9_:]`, so the `.` separator of
//! qualified names is rendered as `_`. Duration histograms and timers are
//! rendered in seconds.

use std::collections::{HashMap, HashSet};
use std::fmt::Write;
use std::time::Duration;

use serde::Serialize;
use tagscope_core::error::{Result, TagScopeError};
use tagscope_core::Tags;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CounterSnapshot {
    pub name: String,
    pub tags: Tags,
    pub value: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GaugeSnapshot {
    pub name: String,
    pub tags: Tags,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntegerGaugeSnapshot {
    pub name: String,
    pub tags: Tags,
    pub value: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimerSnapshot {
    pub name: String,
    pub tags: Tags,
    pub count: u64,
    pub sum_nanos: u64,
    pub max_nanos: u64,
}

impl TimerSnapshot {
    pub fn sum(&self) -> Duration {
        Duration::from_nanos(self.sum_nanos)
    }

    pub fn max(&self) -> Duration {
        Duration::from_nanos(self.max_nanos)
    }
}

/// Non-cumulative count of one `(lower, upper]` bucket. `upper` is `None`
/// for the unbounded tail.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketCount {
    pub upper: Option<f64>,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramSnapshot {
    pub name: String,
    pub tags: Tags,
    /// Configured boundaries as text, e.g. `[1ms, 2ms, 4ms]`.
    pub bounds: String,
    pub buckets: Vec<BucketCount>,
    pub count: u64,
    pub sum: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Snapshot {
    pub counters: Vec<CounterSnapshot>,
    pub gauges: Vec<GaugeSnapshot>,
    pub integer_gauges: Vec<IntegerGaugeSnapshot>,
    pub timers: Vec<TimerSnapshot>,
    pub histograms: Vec<HistogramSnapshot>,
}

fn find<'a, T>(items: &'a [T], name: &str, tags: &Tags, key: impl Fn(&T) -> (&str, &Tags)) -> Option<&'a T> {
    items.iter().find(|i| key(i) == (name, tags))
}

impl Snapshot {
    pub fn counter(&self, name: &str, tags: &Tags) -> Option<&CounterSnapshot> {
        find(&self.counters, name, tags, |c| (c.name.as_str(), &c.tags))
    }

    pub fn gauge(&self, name: &str, tags: &Tags) -> Option<&GaugeSnapshot> {
        find(&self.gauges, name, tags, |g| (g.name.as_str(), &g.tags))
    }

    pub fn integer_gauge(&self, name: &str, tags: &Tags) -> Option<&IntegerGaugeSnapshot> {
        find(&self.integer_gauges, name, tags, |g| (g.name.as_str(), &g.tags))
    }

    pub fn timer(&self, name: &str, tags: &Tags) -> Option<&TimerSnapshot> {
        find(&self.timers, name, tags, |t| (t.name.as_str(), &t.tags))
    }

    pub fn histogram(&self, name: &str, tags: &Tags) -> Option<&HistogramSnapshot> {
        find(&self.histograms, name, tags, |h| (h.name.as_str(), &h.tags))
    }

    pub fn render_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| TagScopeError::Internal(format!("snapshot serialization failed: {e}")))
    }

    /// Render in Prometheus text exposition format.
    ///
    /// Each rendered name carries one `# TYPE` line. Gauges and integer
    /// gauges share the gauge family, and a float gauge wins over an integer
    /// gauge with the same identity. A name already rendered as another type
    /// is skipped.
    pub fn render_prometheus(&self) -> String {
        let mut out = String::new();
        let mut families = Families::default();

        for c in &self.counters {
            let name = metric_name(&c.name);
            if families.claim(&mut out, &name, "counter") {
                let _ = writeln!(out, "{}{} {}", name, labels(&c.tags, None), c.value);
            }
        }

        let mut gauges: Vec<(&str, &Tags, String)> = self
            .gauges
            .iter()
            .map(|g| (g.name.as_str(), &g.tags, g.value.to_string()))
            .chain(
                self.integer_gauges
                    .iter()
                    .map(|g| (g.name.as_str(), &g.tags, g.value.to_string())),
            )
            .collect();
        gauges.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
        gauges.dedup_by(|later, first| (later.0, later.1) == (first.0, first.1));
        for (raw, tags, value) in &gauges {
            let name = metric_name(raw);
            if families.claim(&mut out, &name, "gauge") {
                let _ = writeln!(out, "{}{} {}", name, labels(tags, None), value);
            }
        }

        for t in &self.timers {
            let name = metric_name(&t.name);
            if !families.claim(&mut out, &name, "summary") {
                continue;
            }
            let label_str = labels(&t.tags, None);
            let _ = writeln!(out, "{}_sum{} {}", name, label_str, t.sum().as_secs_f64());
            let _ = writeln!(out, "{}_count{} {}", name, label_str, t.count);
        }

        for h in &self.histograms {
            let name = metric_name(&h.name);
            if !families.claim(&mut out, &name, "histogram") {
                continue;
            }
            // Cumulative buckets.
            let mut running = 0u64;
            for b in &h.buckets {
                running += b.count;
                let le = match b.upper {
                    Some(v) => v.to_string(),
                    None => "+Inf".to_string(),
                };
                let _ = writeln!(out, "{}_bucket{} {}", name, labels(&h.tags, Some(&le)), running);
            }
            let label_str = labels(&h.tags, None);
            let _ = writeln!(out, "{}_sum{} {}", name, label_str, h.sum);
            let _ = writeln!(out, "{}_count{} {}", name, label_str, h.count);
        }

        out
    }
}

/// Rendered metric families by name. Emits `# TYPE` once per name.
#[derive(Default)]
struct Families {
    kinds: HashMap<String, &'static str>,
    skipped: HashSet<String>,
}

impl Families {
    /// Returns false when `name` already belongs to a different type.
    fn claim(&mut self, out: &mut String, name: &str, kind: &'static str) -> bool {
        match self.kinds.get(name) {
            Some(taken) if *taken == kind => true,
            Some(taken) => {
                if self.skipped.insert(name.to_string()) {
                    tracing::warn!(
                        metric = name,
                        rendered = *taken,
                        skipped = kind,
                        "metric name already rendered as another type; skipping"
                    );
                }
                false
            }
            None => {
                let _ = writeln!(out, "# TYPE {} {}", name, kind);
                self.kinds.insert(name.to_string(), kind);
                true
            }
        }
    }
}

/// Helper to escape label values.
fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn sanitize(raw: &str, allow_colon: bool) -> String {
    let mut s: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || (allow_colon && c == ':') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if s.is_empty() || s.starts_with(|c: char| c.is_ascii_digit()) {
        s.insert(0, '_');
    }
    s
}

fn metric_name(raw: &str) -> String {
    sanitize(raw, true)
}

fn labels(tags: &Tags, le: Option<&str>) -> String {
    let mut parts: Vec<String> = tags
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", sanitize(k, false), escape_label(v)))
        .collect();
    if let Some(le) = le {
        parts.push(format!("le=\"{le}\""));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!("{{{}}}", parts.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_and_labels_are_sanitized() {
        assert_eq!(metric_name("svc.http.requests"), "svc_http_requests");
        assert_eq!(metric_name("9lives"), "_9lives");
        let mut tags = Tags::new();
        tags.insert("route-name".into(), "say \"hi\"".into());
        assert_eq!(labels(&tags, None), "{route_name=\"say \\\"hi\\\"\"}");
        assert_eq!(labels(&Tags::new(), None), "");
        assert_eq!(labels(&Tags::new(), Some("+Inf")), "{le=\"+Inf\"}");
    }

    #[test]
    fn shared_names_get_a_single_type_line() {
        let snap = Snapshot {
            counters: vec![CounterSnapshot { name: "y".into(), tags: Tags::new(), value: 3 }],
            gauges: vec![
                GaugeSnapshot { name: "x".into(), tags: Tags::new(), value: 1.5 },
                GaugeSnapshot { name: "y".into(), tags: Tags::new(), value: 9.0 },
            ],
            integer_gauges: vec![IntegerGaugeSnapshot { name: "x".into(), tags: Tags::new(), value: 2 }],
            ..Snapshot::default()
        };
        let text = snap.render_prometheus();
        assert_eq!(text.matches("# TYPE x ").count(), 1);
        assert_eq!(text.matches("# TYPE y ").count(), 1);
        assert!(text.contains("# TYPE y counter\ny 3\n"));
        assert!(!text.contains("y 9"));
        assert!(text.contains("x 1.5\n"));
        assert!(!text.contains("x 2\n"));
    }
}
