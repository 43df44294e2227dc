//! Route definition: one entry in the routing table.

use std::fmt;
use std::sync::Arc;

use crate::backend::Backend;
use crate::condition::RouteCondition;
use crate::errors::Error;
use crate::matcher::{Matcher, PatternKind};
use crate::rewriter::PathRewriter;

/// A routing rule: pattern, kind, backend, priority, and the optional
/// condition and rewriter.
///
/// Routes are assembled with [`Route::builder`] and handed to a router,
/// which compiles the pattern at insertion time. Cloning a route clones
/// cheap handles; the backend, condition, and rewriter are shared.
#[derive(Clone)]
pub struct Route {
    pattern: String,
    kind: PatternKind,
    backend: Arc<dyn Backend>,
    priority: i32,
    condition: Option<Arc<dyn RouteCondition>>,
    rewriter: Option<Arc<dyn PathRewriter>>,
    failover: Option<Arc<dyn Backend>>,
    pub(crate) compiled: Option<Matcher>,
}

impl Route {
    /// Start building a route for `pattern`. Kind defaults to
    /// [`PatternKind::Prefix`] and priority to 0.
    pub fn builder(pattern: impl Into<String>) -> RouteBuilder {
        RouteBuilder {
            pattern: pattern.into(),
            kind: PatternKind::Prefix,
            backend: None,
            priority: 0,
            condition: None,
            rewriter: None,
            failover: None,
        }
    }

    /// Shorthand for a prefix route with default priority.
    pub fn new(pattern: impl Into<String>, backend: Arc<dyn Backend>) -> Self {
        Self {
            pattern: pattern.into(),
            kind: PatternKind::Prefix,
            backend,
            priority: 0,
            condition: None,
            rewriter: None,
            failover: None,
            compiled: None,
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn kind(&self) -> PatternKind {
        self.kind
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn condition(&self) -> Option<&Arc<dyn RouteCondition>> {
        self.condition.as_ref()
    }

    pub fn rewriter(&self) -> Option<&Arc<dyn PathRewriter>> {
        self.rewriter.as_ref()
    }

    /// Secondary backend reserved for failover dispatch; the core
    /// dispatcher does not consult it.
    pub fn failover(&self) -> Option<&Arc<dyn Backend>> {
        self.failover.as_ref()
    }

    /// True if the compiled matcher accepts `path`. Routes that have
    /// not been inserted yet have no matcher and match nothing.
    pub(crate) fn matches(&self, path: &str) -> bool {
        self.compiled.as_ref().is_some_and(|m| m.matches(path))
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("pattern", &self.pattern)
            .field("kind", &self.kind)
            .field("priority", &self.priority)
            .field("condition", &self.condition.is_some())
            .field("rewriter", &self.rewriter.is_some())
            .field("failover", &self.failover.is_some())
            .finish()
    }
}

/// Builder for [`Route`]. `build` fails with [`Error::NilBackend`] when
/// no backend was supplied.
pub struct RouteBuilder {
    pattern: String,
    kind: PatternKind,
    backend: Option<Arc<dyn Backend>>,
    priority: i32,
    condition: Option<Arc<dyn RouteCondition>>,
    rewriter: Option<Arc<dyn PathRewriter>>,
    failover: Option<Arc<dyn Backend>>,
}

impl RouteBuilder {
    /// Target backend for the route. Required.
    pub fn backend(mut self, backend: Arc<dyn Backend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// How the pattern is interpreted.
    pub fn kind(mut self, kind: PatternKind) -> Self {
        self.kind = kind;
        self
    }

    /// Match order: higher priorities are consulted first.
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Metadata predicate that must also hold for the route to apply.
    pub fn condition(mut self, condition: Arc<dyn RouteCondition>) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Path transformation applied before dispatch.
    pub fn rewriter(mut self, rewriter: Arc<dyn PathRewriter>) -> Self {
        self.rewriter = Some(rewriter);
        self
    }

    /// Secondary backend reserved for failover dispatch.
    pub fn failover(mut self, backend: Arc<dyn Backend>) -> Self {
        self.failover = Some(backend);
        self
    }

    pub fn build(self) -> Result<Route, Error> {
        let backend = self.backend.ok_or(Error::NilBackend)?;
        Ok(Route {
            pattern: self.pattern,
            kind: self.kind,
            backend,
            priority: self.priority,
            condition: self.condition,
            rewriter: self.rewriter,
            failover: self.failover,
            compiled: None,
        })
    }
}
