//! Scope hierarchy: name-prefix and tag composition.
//!
//! A [`Scope`] is an immutable value. [`Scope::tagged`] and
//! [`Scope::sub_scope`] return new scopes and leave the receiver untouched,
//! so scopes can be shared and derived from any thread without locking.
//!
//! Qualified names join prefix segments with [`SEPARATOR`]:
//! `root.sub_scope("http").sub_scope("client").counter("errors")` reports as
//! `<root prefix>.http.client.errors`. A root without a prefix contributes
//! nothing to the name.

use std::fmt;
use std::sync::Arc;

use crate::buckets::Buckets;
use crate::capabilities::Capabilities;
use crate::metric::{Counter, Gauge, Histogram, IntegerGauge, Timer};
use crate::reporter::{MetricId, NullReporter, Reporter, Tags};

/// Joins name prefix segments.
pub const SEPARATOR: &str = ".";

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}{SEPARATOR}{name}")
    }
}

/// Namespace over a [`Reporter`]: every handle it produces carries this
/// scope's prefix and tags.
#[derive(Clone)]
pub struct Scope {
    prefix: Arc<str>,
    tags: Arc<Tags>,
    default_buckets: Arc<Buckets>,
    reporter: Arc<dyn Reporter>,
}

impl Scope {
    /// Root scope with no prefix, no tags and default buckets.
    pub fn new(reporter: Arc<dyn Reporter>) -> Self {
        Self::builder(reporter).build()
    }

    /// Root scope over [`NullReporter`].
    pub fn noop() -> Self {
        Self::new(Arc::new(NullReporter))
    }

    pub fn builder(reporter: Arc<dyn Reporter>) -> ScopeBuilder {
        ScopeBuilder {
            prefix: String::new(),
            tags: Tags::new(),
            default_buckets: Buckets::default(),
            reporter,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn tags(&self) -> &Tags {
        &self.tags
    }

    /// Buckets applied by `histogram(name, None)`.
    pub fn default_buckets(&self) -> &Buckets {
        &self.default_buckets
    }

    /// `name` with this scope's prefix applied.
    pub fn qualified_name(&self, name: &str) -> String {
        join(&self.prefix, name)
    }

    fn id(&self, name: &str) -> MetricId {
        MetricId::new(self.qualified_name(name), (*self.tags).clone())
    }

    pub fn counter(&self, name: &str) -> Arc<dyn Counter> {
        self.reporter.counter(&self.id(name))
    }

    pub fn gauge(&self, name: &str) -> Arc<dyn Gauge> {
        self.reporter.gauge(&self.id(name))
    }

    pub fn integer_gauge(&self, name: &str) -> Arc<dyn IntegerGauge> {
        self.reporter.integer_gauge(&self.id(name))
    }

    pub fn timer(&self, name: &str) -> Arc<dyn Timer> {
        self.reporter.timer(&self.id(name))
    }

    /// Histogram over `buckets`, or this scope's default buckets when `None`.
    pub fn histogram(&self, name: &str, buckets: Option<Buckets>) -> Arc<dyn Histogram> {
        let id = self.id(name);
        match buckets {
            Some(b) => self.reporter.histogram(&id, &b),
            None => self.reporter.histogram(&id, &self.default_buckets),
        }
    }

    /// Child scope with `tags` overlaid on this scope's tags. Colliding keys
    /// take the new value. The prefix is unchanged.
    pub fn tagged<I, K, V>(&self, tags: I) -> Scope
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut merged = (*self.tags).clone();
        merged.extend(tags.into_iter().map(|(k, v)| (k.into(), v.into())));
        Scope {
            tags: Arc::new(merged),
            ..self.clone()
        }
    }

    /// Child scope whose prefix is this prefix joined with `name`. Tags are
    /// inherited unchanged.
    pub fn sub_scope(&self, name: &str) -> Scope {
        Scope {
            prefix: join(&self.prefix, name).into(),
            ..self.clone()
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        self.reporter.capabilities()
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("prefix", &self.prefix)
            .field("tags", &self.tags)
            .field("default_buckets", &self.default_buckets)
            .finish_non_exhaustive()
    }
}

/// Configures a root [`Scope`].
pub struct ScopeBuilder {
    prefix: String,
    tags: Tags,
    default_buckets: Buckets,
    reporter: Arc<dyn Reporter>,
}

impl ScopeBuilder {
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn tags<I, K, V>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.tags
            .extend(tags.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn default_buckets(mut self, buckets: impl Into<Buckets>) -> Self {
        self.default_buckets = buckets.into();
        self
    }

    pub fn build(self) -> Scope {
        let caps = self.reporter.capabilities();
        tracing::debug!(
            prefix = %self.prefix,
            tags = self.tags.len(),
            default_buckets = %self.default_buckets,
            reporting = caps.reporting(),
            tagging = caps.tagging(),
            "root scope built"
        );
        Scope {
            prefix: self.prefix.into(),
            tags: Arc::new(self.tags),
            default_buckets: Arc::new(self.default_buckets),
            reporter: self.reporter,
        }
    }
}
