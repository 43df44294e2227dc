//! Route table and lookup.
//!
//! The table is the only shared mutable state in the core. A single
//! reader-writer lock protects it: mutation takes the writer side for
//! the duration of insert/remove plus re-sort, lookups take the reader
//! side only while scanning. Backend calls never happen under the lock.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::backend::{Backend, Metadata};
use crate::errors::{Error, Result};
use crate::matcher::Matcher;
use crate::route::Route;

/// Routing decisions over an ordered route table.
///
/// Implemented by [`TableRouter`]; embedders may install their own
/// implementation on the facade.
#[async_trait]
pub trait Router: Send + Sync {
    /// Add a routing rule. Compiles the pattern, rejects duplicates of
    /// the same (pattern, kind) pair, and re-sorts by priority. A
    /// failed add leaves the table unchanged.
    async fn add_route(&self, route: Route) -> Result<()>;

    /// Remove the first rule whose pattern string equals `pattern`,
    /// regardless of kind. [`Error::NoRoute`] if none matches.
    async fn remove_route(&self, pattern: &str) -> Result<()>;

    /// Backend of the first route matching `path`, ignoring conditions.
    async fn route(&self, path: &str) -> Result<Arc<dyn Backend>>;

    /// First route whose pattern matches `path` and whose condition
    /// (if any) accepts `(path, meta)`.
    async fn route_with_info(&self, path: &str, meta: Option<&Metadata>) -> Result<Route>;

    /// Defensive snapshot of the current table, in match order.
    async fn routes(&self) -> Vec<Route>;
}

/// Default router: a priority-ordered table scanned linearly.
///
/// Sorted by priority descending; insertion order breaks ties. Linear
/// scan is deliberate: tables are small and the ordering guarantees are
/// easier to audit than in an index.
#[derive(Debug, Default)]
pub struct TableRouter {
    routes: RwLock<Vec<Route>>,
}

impl TableRouter {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Router for TableRouter {
    async fn add_route(&self, mut route: Route) -> Result<()> {
        // Compile outside the writer lock; a bad pattern never touches
        // the table.
        let matcher = Matcher::compile(route.pattern(), route.kind())?;
        route.compiled = Some(matcher);

        let mut routes = self.routes.write().await;
        if routes
            .iter()
            .any(|r| r.pattern() == route.pattern() && r.kind() == route.kind())
        {
            return Err(Error::DuplicateRoute);
        }

        tracing::debug!(
            "route added: {} ({}, priority {})",
            route.pattern(),
            route.kind(),
            route.priority()
        );
        routes.push(route);
        // Stable sort: equal priorities keep insertion order
        routes.sort_by(|a, b| b.priority().cmp(&a.priority()));
        Ok(())
    }

    async fn remove_route(&self, pattern: &str) -> Result<()> {
        let mut routes = self.routes.write().await;
        match routes.iter().position(|r| r.pattern() == pattern) {
            Some(idx) => {
                routes.remove(idx);
                tracing::debug!("route removed: {}", pattern);
                Ok(())
            }
            None => Err(Error::NoRoute),
        }
    }

    async fn route(&self, path: &str) -> Result<Arc<dyn Backend>> {
        let routes = self.routes.read().await;
        routes
            .iter()
            .find(|r| r.matches(path))
            .map(|r| Arc::clone(r.backend()))
            .ok_or(Error::NoRoute)
    }

    async fn route_with_info(&self, path: &str, meta: Option<&Metadata>) -> Result<Route> {
        let routes = self.routes.read().await;
        for route in routes.iter() {
            if !route.matches(path) {
                continue;
            }
            if let Some(condition) = route.condition() {
                if !condition.evaluate(path, meta) {
                    continue;
                }
            }
            return Ok(route.clone());
        }
        Err(Error::NoRoute)
    }

    async fn routes(&self) -> Vec<Route> {
        self.routes.read().await.clone()
    }
}
