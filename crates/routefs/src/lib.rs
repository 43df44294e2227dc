//! routefs: a path-routing virtual filesystem facade.
//!
//! One filesystem surface composed of several independent backends.
//! Each operation names an absolute path; the facade selects exactly
//! one backend per call by matching the path against an ordered route
//! table, optionally constrained by file metadata and optionally
//! rewritten before dispatch.
//!
//! - **Matchers**: prefix, glob (`*`, `**`, classes, braces), regex
//! - **Conditions**: size, mtime, and kind predicates with And/Or/Not
//! - **Rewriters**: prefix strip/add/replace, regex, static map, chains
//! - **Router**: priority-ordered table, insertion order breaks ties
//! - **Facade**: [`RouteFs`], including cross-backend copy-then-delete
//!   moves for rename
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use routefs::{MemoryFs, PatternKind, Route, RouteFs};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> routefs::Result<()> {
//! let scratch = Arc::new(MemoryFs::new());
//! let archive = Arc::new(MemoryFs::new());
//!
//! let fs = RouteFs::builder()
//!     .route(
//!         Route::builder("/scratch")
//!             .backend(scratch.clone())
//!             .priority(10)
//!             .build()?,
//!     )
//!     .route(
//!         Route::builder("**/*.bak")
//!             .backend(archive.clone())
//!             .kind(PatternKind::Glob)
//!             .priority(20)
//!             .build()?,
//!     )
//!     .build()
//!     .await?;
//!
//! fs.mkdir_all("/scratch/logs", 0o755).await?;
//! assert!(fs.exists("/scratch/logs").await);
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod condition;
mod errors;
mod facade;
mod local;
mod matcher;
mod memory;
pub mod paths;
pub mod rewriter;
mod route;
mod router;

pub use backend::{Backend, DirEntry, EntryType, FileHandle, Metadata, OpenFlags};
pub use condition::RouteCondition;
pub use errors::{Error, Result};
pub use facade::{RouteFs, RouteFsBuilder};
pub use local::LocalFs;
pub use matcher::PatternKind;
pub use memory::MemoryFs;
pub use rewriter::PathRewriter;
pub use route::{Route, RouteBuilder};
pub use router::{Router, TableRouter};
