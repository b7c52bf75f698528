//! tagscope core: backend-agnostic metrics facade.
//!
//! Application code emits through a [`Scope`] and the handles it produces
//! ([`Counter`], [`Gauge`], [`IntegerGauge`], [`Timer`], [`Histogram`]).
//! Scopes qualify names and tags, then delegate to a [`Reporter`]. This crate
//! carries no backend of its own beyond [`NullReporter`].
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here. The only fallible
//! paths are bucket construction, which surface as `TagScopeError`; emission
//! never fails.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod buckets;
pub mod capabilities;
pub mod error;
pub mod metric;
pub mod reporter;
pub mod scope;
pub mod stopwatch;

pub use buckets::{bucket_pairs, BucketKind, BucketPair, Buckets, DurationBuckets, ValueBuckets};
pub use capabilities::Capabilities;
pub use error::{ErrorKind, Result, TagScopeError};
pub use metric::{Counter, Gauge, Histogram, IntegerGauge, Timer};
pub use reporter::{MetricId, NullReporter, Reporter, Tags};
pub use scope::{Scope, ScopeBuilder, SEPARATOR};
pub use stopwatch::{Stopwatch, StopwatchRecorder};
