//! tagscope in-memory backend.
//!
//! Provides [`MemoryReporter`], an aggregating [`Reporter`](tagscope_core::Reporter)
//! that renders Prometheus text and JSON snapshots, plus the YAML config
//! layer that builds a root scope over it. Intended for tests, local tools and
//! scrape endpoints owned by the embedding application.

pub mod clock;
pub mod config;
pub mod registry;
pub mod runtime;
pub mod snapshot;

pub use clock::{Clock, ManualClock, SystemClock};
pub use registry::MemoryReporter;
pub use runtime::MetricsRuntime;
pub use snapshot::Snapshot;
