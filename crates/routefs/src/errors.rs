//! Error identities for routing and dispatch.
//!
//! Routing errors are distinguished variants compared with `matches!`;
//! backend errors ride through unchanged in [`Error::Backend`].

use std::io;

use thiserror::Error;

/// Result type for router and facade operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Routing and dispatch errors.
#[derive(Debug, Error)]
pub enum Error {
    /// No route matches the path and no default backend is configured.
    /// Also raised by route removal when the pattern is absent.
    #[error("no route found for path")]
    NoRoute,

    /// A route was assembled without a backend.
    #[error("route has no backend")]
    NilBackend,

    /// Pattern failed grammar-specific validation.
    #[error("invalid route pattern")]
    InvalidPattern,

    /// A route with the same (pattern, kind) pair is already registered.
    #[error("route with pattern already exists")]
    DuplicateRoute,

    /// An operation spanning multiple backends that the implementation
    /// declines to emulate.
    #[error("operation spans multiple backends")]
    CrossBackendOperation,

    /// Primary and failover backends both failed. Reserved for failover
    /// dispatch; the core dispatcher never raises it.
    #[error("all backends failed")]
    AllBackendsFailed,

    /// Backend error, passed through unchanged.
    #[error(transparent)]
    Backend(#[from] io::Error),
}
