//! Root scope wiring from config.

use std::sync::Arc;

use tagscope_core::error::Result;
use tagscope_core::{NullReporter, Reporter, Scope};

use crate::clock::{Clock, SystemClock};
use crate::config::{ReporterKind, TagScopeConfig};
use crate::registry::MemoryReporter;

/// A root scope plus the in-memory backend behind it, when there is one.
#[derive(Clone)]
pub struct MetricsRuntime {
    scope: Scope,
    memory: Option<Arc<MemoryReporter>>,
}

impl MetricsRuntime {
    /// Build from config with the system clock.
    pub fn new(cfg: &TagScopeConfig) -> Result<Self> {
        Self::with_clock(cfg, Arc::new(SystemClock))
    }

    pub fn with_clock(cfg: &TagScopeConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        cfg.validate()?;

        let memory = match cfg.reporter.kind {
            ReporterKind::Memory => Some(Arc::new(
                MemoryReporter::with_clock(clock).with_tagging(cfg.reporter.tagging),
            )),
            ReporterKind::Noop => {
                tracing::warn!("noop reporter configured; metrics will be dropped");
                None
            }
        };
        let reporter: Arc<dyn Reporter> = match &memory {
            Some(m) => Arc::clone(m) as Arc<dyn Reporter>,
            None => Arc::new(NullReporter),
        };

        let scope = Scope::builder(reporter)
            .prefix(cfg.scope.prefix.clone())
            .tags(cfg.scope.tags.clone())
            .default_buckets(cfg.scope.buckets()?)
            .build();

        Ok(Self { scope, memory })
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn memory(&self) -> Option<Arc<MemoryReporter>> {
        self.memory.clone()
    }

    /// Prometheus text for everything recorded so far. Empty for the noop
    /// reporter.
    pub fn render(&self) -> String {
        self.memory
            .as_ref()
            .map(|m| m.render_prometheus())
            .unwrap_or_default()
    }
}
