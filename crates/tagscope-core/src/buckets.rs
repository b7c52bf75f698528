//! Histogram bucket boundaries.
//!
//! A bucket set is a sorted, duplicate-free sequence of upper bounds held
//! either as plain values ([`ValueBuckets`]) or as durations
//! ([`DurationBuckets`]). The float unit for durations is the second:
//! `1.5` converts to 1.5s and back. Durations keep nanosecond precision.
//!
//! All constructors validate their input and fail with
//! [`TagScopeError::InvalidBucketSpec`]; a bucket set that exists is always
//! strictly ascending.

use std::cmp::Ordering;
use std::fmt;
use std::time::Duration;

use crate::error::{Result, TagScopeError};

/// Convert a value in seconds to a duration, saturating at both ends.
fn value_to_duration(v: f64) -> Duration {
    if v.is_nan() || v <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(v).unwrap_or(Duration::MAX)
}

fn check_count(count: usize) -> Result<()> {
    if count == 0 {
        return Err(TagScopeError::bucket_spec("bucket count must be >= 1"));
    }
    Ok(())
}

fn ensure_strictly_ascending<T: PartialOrd + fmt::Debug>(bounds: &[T]) -> Result<()> {
    match bounds.windows(2).find(|w| w[0].partial_cmp(&w[1]) != Some(Ordering::Less)) {
        Some(w) => Err(TagScopeError::bucket_spec(format!(
            "boundaries must be strictly ascending, found {:?} then {:?}",
            w[0], w[1]
        ))),
        None => Ok(()),
    }
}

/// Bucket boundaries expressed as plain values.
///
/// Ordered lexicographically with `f64::total_cmp`; bounds are always finite.
#[derive(Debug, Clone, Default)]
pub struct ValueBuckets {
    bounds: Vec<f64>,
}

impl ValueBuckets {
    /// Explicit boundaries. Input order does not matter; the set is sorted
    /// before use. Non-finite or duplicate boundaries are rejected.
    pub fn new(bounds: impl Into<Vec<f64>>) -> Result<Self> {
        let mut bounds = bounds.into();
        if let Some(bad) = bounds.iter().find(|b| !b.is_finite()) {
            return Err(TagScopeError::bucket_spec(format!(
                "boundary must be finite, got {bad}"
            )));
        }
        bounds.sort_by(f64::total_cmp);
        ensure_strictly_ascending(&bounds)?;
        Ok(Self { bounds })
    }

    /// `count` boundaries `start, start + width, start + 2*width, ...`.
    pub fn linear(start: f64, width: f64, count: usize) -> Result<Self> {
        check_count(count)?;
        if !start.is_finite() {
            return Err(TagScopeError::bucket_spec(format!(
                "linear start must be finite, got {start}"
            )));
        }
        if !(width > 0.0 && width.is_finite()) {
            return Err(TagScopeError::bucket_spec(format!(
                "linear width must be > 0, got {width}"
            )));
        }
        let bounds = (0..count).map(|i| start + width * i as f64).collect();
        Self::generated(bounds)
    }

    /// `count` boundaries `start, start*factor, start*factor^2, ...`.
    pub fn exponential(start: f64, factor: f64, count: usize) -> Result<Self> {
        check_count(count)?;
        if !(start > 0.0 && start.is_finite()) {
            return Err(TagScopeError::bucket_spec(format!(
                "exponential start must be > 0, got {start}"
            )));
        }
        if !(factor > 1.0 && factor.is_finite()) {
            return Err(TagScopeError::bucket_spec(format!(
                "exponential factor must be > 1, got {factor}"
            )));
        }
        let mut bounds = Vec::with_capacity(count);
        let mut curr = start;
        for _ in 0..count {
            bounds.push(curr);
            curr *= factor;
        }
        Self::generated(bounds)
    }

    fn generated(bounds: Vec<f64>) -> Result<Self> {
        if let Some(bad) = bounds.iter().find(|b| !b.is_finite()) {
            return Err(TagScopeError::bucket_spec(format!(
                "generated boundary overflowed to {bad}"
            )));
        }
        ensure_strictly_ascending(&bounds)?;
        Ok(Self { bounds })
    }

    pub fn bounds(&self) -> &[f64] {
        &self.bounds
    }

    pub fn len(&self) -> usize {
        self.bounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bounds.is_empty()
    }

    pub fn as_values(&self) -> Vec<f64> {
        self.bounds.clone()
    }

    /// Values interpreted as seconds. Negative values map to zero.
    pub fn as_durations(&self) -> Vec<Duration> {
        self.bounds.iter().copied().map(value_to_duration).collect()
    }
}

fn cmp_values(a: &[f64], b: &[f64]) -> Ordering {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| x.total_cmp(y))
        .find(|o| *o != Ordering::Equal)
        .unwrap_or_else(|| a.len().cmp(&b.len()))
}

impl PartialEq for ValueBuckets {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ValueBuckets {}

impl PartialOrd for ValueBuckets {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ValueBuckets {
    fn cmp(&self, other: &Self) -> Ordering {
        cmp_values(&self.bounds, &other.bounds)
    }
}

impl fmt::Display for ValueBuckets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, b) in self.bounds.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{b}")?;
        }
        f.write_str("]")
    }
}

/// Bucket boundaries expressed as durations.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct DurationBuckets {
    bounds: Vec<Duration>,
}

impl DurationBuckets {
    /// Explicit boundaries, sorted before use. Duplicates are rejected.
    pub fn new(bounds: impl Into<Vec<Duration>>) -> Result<Self> {
        let mut bounds = bounds.into();
        bounds.sort();
        ensure_strictly_ascending(&bounds)?;
        Ok(Self { bounds })
    }

    /// `count` boundaries `start, start + width, ...`.
    pub fn linear(start: Duration, width: Duration, count: usize) -> Result<Self> {
        check_count(count)?;
        if width.is_zero() {
            return Err(TagScopeError::bucket_spec("linear width must be > 0"));
        }
        let bounds = (0..count)
            .map(|i| {
                u32::try_from(i)
                    .ok()
                    .and_then(|i| width.checked_mul(i))
                    .and_then(|step| start.checked_add(step))
                    .ok_or_else(|| {
                        TagScopeError::bucket_spec(format!(
                            "linear duration boundary {i} overflows"
                        ))
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { bounds })
    }

    /// `count` boundaries `start, start*factor, ...`, each rounded to the
    /// nearest nanosecond.
    pub fn exponential(start: Duration, factor: f64, count: usize) -> Result<Self> {
        check_count(count)?;
        if start.is_zero() {
            return Err(TagScopeError::bucket_spec("exponential start must be > 0"));
        }
        if !(factor > 1.0 && factor.is_finite()) {
            return Err(TagScopeError::bucket_spec(format!(
                "exponential factor must be > 1, got {factor}"
            )));
        }
        let limit = u64::MAX as f64;
        let mut bounds = Vec::with_capacity(count);
        bounds.push(start);
        let mut curr = start.as_nanos() as f64;
        for i in 1..count {
            curr = (curr * factor).round();
            if curr >= limit {
                return Err(TagScopeError::bucket_spec(format!(
                    "exponential duration boundary {i} overflows"
                )));
            }
            bounds.push(Duration::from_nanos(curr as u64));
        }
        ensure_strictly_ascending(&bounds)?;
        Ok(Self { bounds })
    }

    pub fn bounds(&self) -> &[Duration] {
        &self.bounds
    }

    pub fn len(&self) -> usize {
        self.bounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bounds.is_empty()
    }

    /// Durations expressed in seconds.
    pub fn as_values(&self) -> Vec<f64> {
        self.bounds.iter().map(Duration::as_secs_f64).collect()
    }

    pub fn as_durations(&self) -> Vec<Duration> {
        self.bounds.clone()
    }
}

impl fmt::Display for DurationBuckets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, b) in self.bounds.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{b:?}")?;
        }
        f.write_str("]")
    }
}

/// Which representation a bucket set was built in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketKind {
    Values,
    Durations,
}

/// A histogram bucket set in either representation.
///
/// `Default` is the exponential duration set starting at 1ms, doubling over
/// 16 boundaries (1ms up to ~32.8s).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Buckets {
    Values(ValueBuckets),
    Durations(DurationBuckets),
}

impl Buckets {
    pub fn kind(&self) -> BucketKind {
        match self {
            Buckets::Values(_) => BucketKind::Values,
            Buckets::Durations(_) => BucketKind::Durations,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Buckets::Values(b) => b.len(),
            Buckets::Durations(b) => b.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_values(&self) -> Vec<f64> {
        match self {
            Buckets::Values(b) => b.as_values(),
            Buckets::Durations(b) => b.as_values(),
        }
    }

    pub fn as_durations(&self) -> Vec<Duration> {
        match self {
            Buckets::Values(b) => b.as_durations(),
            Buckets::Durations(b) => b.as_durations(),
        }
    }

    /// Adjacent `(lower, upper]` pairs, one more than there are boundaries.
    pub fn pairs(&self) -> Vec<BucketPair> {
        bucket_pairs(Some(self))
    }
}

impl Default for Buckets {
    fn default() -> Self {
        Buckets::Durations(DurationBuckets {
            bounds: (0..16).map(|i| Duration::from_millis(1 << i)).collect(),
        })
    }
}

impl PartialOrd for Buckets {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Buckets {
    /// Lexicographic by boundary value in seconds. Ties order values before
    /// durations, then fall back to the exact boundaries.
    fn cmp(&self, other: &Self) -> Ordering {
        cmp_values(&self.as_values(), &other.as_values()).then_with(|| match (self, other) {
            (Buckets::Values(a), Buckets::Values(b)) => a.cmp(b),
            (Buckets::Durations(a), Buckets::Durations(b)) => a.cmp(b),
            (Buckets::Values(_), Buckets::Durations(_)) => Ordering::Less,
            (Buckets::Durations(_), Buckets::Values(_)) => Ordering::Greater,
        })
    }
}

impl fmt::Display for Buckets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Buckets::Values(b) => b.fmt(f),
            Buckets::Durations(b) => b.fmt(f),
        }
    }
}

impl From<ValueBuckets> for Buckets {
    fn from(b: ValueBuckets) -> Self {
        Buckets::Values(b)
    }
}

impl From<DurationBuckets> for Buckets {
    fn from(b: DurationBuckets) -> Self {
        Buckets::Durations(b)
    }
}

/// Lower and upper bound of one derived bucket, in both representations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketPair {
    lower_value: f64,
    upper_value: f64,
    lower_duration: Duration,
    upper_duration: Duration,
}

impl BucketPair {
    /// The single bucket covering everything.
    pub const UNBOUNDED: BucketPair = BucketPair {
        lower_value: f64::NEG_INFINITY,
        upper_value: f64::INFINITY,
        lower_duration: Duration::ZERO,
        upper_duration: Duration::MAX,
    };

    pub fn lower_bound_value(&self) -> f64 {
        self.lower_value
    }

    pub fn upper_bound_value(&self) -> f64 {
        self.upper_value
    }

    pub fn lower_bound_duration(&self) -> Duration {
        self.lower_duration
    }

    pub fn upper_bound_duration(&self) -> Duration {
        self.upper_duration
    }
}

/// Derive the `len + 1` adjacent pairs of a bucket set.
///
/// The first pair is open below (`-inf`, or zero for durations), the last is
/// open above (`+inf`, or `Duration::MAX`). `None` yields the single
/// unbounded pair.
pub fn bucket_pairs(buckets: Option<&Buckets>) -> Vec<BucketPair> {
    let Some(buckets) = buckets else {
        return vec![BucketPair::UNBOUNDED];
    };
    let values = buckets.as_values();
    let durations = buckets.as_durations();

    let mut pairs = Vec::with_capacity(values.len() + 1);
    let mut lower_value = f64::NEG_INFINITY;
    let mut lower_duration = Duration::ZERO;
    for (&upper_value, &upper_duration) in values.iter().zip(durations.iter()) {
        pairs.push(BucketPair {
            lower_value,
            upper_value,
            lower_duration,
            upper_duration,
        });
        lower_value = upper_value;
        lower_duration = upper_duration;
    }
    pairs.push(BucketPair {
        lower_value,
        upper_value: f64::INFINITY,
        lower_duration,
        upper_duration: Duration::MAX,
    });
    pairs
}
