use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;
use tagscope_core::error::{Result, TagScopeError};
use tagscope_core::{Buckets, DurationBuckets, ValueBuckets, SEPARATOR};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TagScopeConfig {
    pub version: u32,

    #[serde(default)]
    pub scope: ScopeSection,

    #[serde(default)]
    pub reporter: ReporterSection,
}

impl TagScopeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(TagScopeError::InvalidConfig(format!(
                "unsupported config version {}",
                self.version
            )));
        }
        self.scope.validate()?;
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScopeSection {
    #[serde(default)]
    pub prefix: String,

    #[serde(default)]
    pub tags: BTreeMap<String, String>,

    /// Buckets for histograms requested without explicit buckets.
    #[serde(default)]
    pub default_buckets: Option<BucketsConfig>,
}

impl ScopeSection {
    pub fn validate(&self) -> Result<()> {
        if self.prefix.starts_with(SEPARATOR) || self.prefix.ends_with(SEPARATOR) {
            return Err(TagScopeError::InvalidConfig(format!(
                "scope.prefix must not start or end with '{SEPARATOR}'"
            )));
        }
        if self.tags.keys().any(|k| k.is_empty()) {
            return Err(TagScopeError::InvalidConfig(
                "scope.tags keys must not be empty".into(),
            ));
        }
        // Surfaces InvalidBucketSpec at load time rather than first use.
        self.buckets()?;
        Ok(())
    }

    /// Configured default buckets, or the built-in default.
    pub fn buckets(&self) -> Result<Buckets> {
        match &self.default_buckets {
            Some(b) => b.build(),
            None => Ok(Buckets::default()),
        }
    }
}

/// Histogram bucket spec. Duration variants are in milliseconds.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum BucketsConfig {
    Values { bounds: Vec<f64> },
    DurationsMs { bounds: Vec<u64> },
    LinearValues { start: f64, width: f64, count: usize },
    LinearDurationsMs { start: u64, width: u64, count: usize },
    ExponentialValues { start: f64, factor: f64, count: usize },
    ExponentialDurationsMs { start: u64, factor: f64, count: usize },
}

impl BucketsConfig {
    pub fn build(&self) -> Result<Buckets> {
        let buckets: Buckets = match self {
            BucketsConfig::Values { bounds } => ValueBuckets::new(bounds.clone())?.into(),
            BucketsConfig::DurationsMs { bounds } => {
                let bounds: Vec<Duration> = bounds.iter().map(|ms| Duration::from_millis(*ms)).collect();
                DurationBuckets::new(bounds)?.into()
            }
            BucketsConfig::LinearValues { start, width, count } => {
                ValueBuckets::linear(*start, *width, *count)?.into()
            }
            BucketsConfig::LinearDurationsMs { start, width, count } => DurationBuckets::linear(
                Duration::from_millis(*start),
                Duration::from_millis(*width),
                *count,
            )?
            .into(),
            BucketsConfig::ExponentialValues { start, factor, count } => {
                ValueBuckets::exponential(*start, *factor, *count)?.into()
            }
            BucketsConfig::ExponentialDurationsMs { start, factor, count } => {
                DurationBuckets::exponential(Duration::from_millis(*start), *factor, *count)?.into()
            }
        };
        Ok(buckets)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReporterKind {
    /// Aggregate in process (`MemoryReporter`).
    #[default]
    Memory,
    /// Drop everything.
    Noop,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReporterSection {
    #[serde(default)]
    pub kind: ReporterKind,

    #[serde(default = "default_tagging")]
    pub tagging: bool,
}

impl Default for ReporterSection {
    fn default() -> Self {
        Self {
            kind: ReporterKind::default(),
            tagging: default_tagging(),
        }
    }
}

fn default_tagging() -> bool {
    true
}
