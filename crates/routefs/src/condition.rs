//! Route-eligibility predicates over optional file metadata.
//!
//! A condition narrows a route after its pattern matches. When no
//! metadata is available the engine cannot prove exclusion, so every
//! built-in leaf condition treats absent metadata as a match.

use std::sync::Arc;
use std::time::SystemTime;

use crate::backend::Metadata;

/// Predicate consulted by the router after a pattern matches.
pub trait RouteCondition: Send + Sync {
    /// True if the route should apply to `path` given `meta`.
    fn evaluate(&self, path: &str, meta: Option<&Metadata>) -> bool;
}

struct SizeCondition {
    min_size: u64,
    max_size: u64,
}

impl RouteCondition for SizeCondition {
    fn evaluate(&self, _path: &str, meta: Option<&Metadata>) -> bool {
        let Some(meta) = meta else {
            return true;
        };
        if self.min_size > 0 && meta.size < self.min_size {
            return false;
        }
        if self.max_size > 0 && meta.size > self.max_size {
            return false;
        }
        true
    }
}

/// Matches files of at least `bytes` bytes.
pub fn min_size(bytes: u64) -> Arc<dyn RouteCondition> {
    Arc::new(SizeCondition {
        min_size: bytes,
        max_size: 0,
    })
}

/// Matches files of at most `bytes` bytes.
pub fn max_size(bytes: u64) -> Arc<dyn RouteCondition> {
    Arc::new(SizeCondition {
        min_size: 0,
        max_size: bytes,
    })
}

/// Matches files whose size falls within `[min_bytes, max_bytes]`.
/// A zero bound means unbounded on that side.
pub fn size_range(min_bytes: u64, max_bytes: u64) -> Arc<dyn RouteCondition> {
    Arc::new(SizeCondition {
        min_size: min_bytes,
        max_size: max_bytes,
    })
}

struct TimeCondition {
    older_than: Option<SystemTime>,
    newer_than: Option<SystemTime>,
}

impl RouteCondition for TimeCondition {
    fn evaluate(&self, _path: &str, meta: Option<&Metadata>) -> bool {
        let Some(meta) = meta else {
            return true;
        };
        // Backends without mtime tracking cannot be excluded either
        let Some(modified) = meta.modified else {
            return true;
        };
        if matches!(self.older_than, Some(bound) if modified > bound) {
            return false;
        }
        if matches!(self.newer_than, Some(bound) if modified < bound) {
            return false;
        }
        true
    }
}

/// Matches files last modified at or before `t`.
pub fn older_than(t: SystemTime) -> Arc<dyn RouteCondition> {
    Arc::new(TimeCondition {
        older_than: Some(t),
        newer_than: None,
    })
}

/// Matches files last modified at or after `t`.
pub fn newer_than(t: SystemTime) -> Arc<dyn RouteCondition> {
    Arc::new(TimeCondition {
        older_than: None,
        newer_than: Some(t),
    })
}

/// Matches files last modified within `[start, end]`, inclusive.
pub fn modified_between(start: SystemTime, end: SystemTime) -> Arc<dyn RouteCondition> {
    Arc::new(TimeCondition {
        older_than: Some(end),
        newer_than: Some(start),
    })
}

struct DirectoryCondition {
    directories_only: bool,
}

impl RouteCondition for DirectoryCondition {
    fn evaluate(&self, _path: &str, meta: Option<&Metadata>) -> bool {
        let Some(meta) = meta else {
            return true;
        };
        if self.directories_only {
            meta.is_dir
        } else {
            !meta.is_dir
        }
    }
}

/// Matches only directories.
pub fn directories_only() -> Arc<dyn RouteCondition> {
    Arc::new(DirectoryCondition {
        directories_only: true,
    })
}

/// Matches only regular files.
pub fn files_only() -> Arc<dyn RouteCondition> {
    Arc::new(DirectoryCondition {
        directories_only: false,
    })
}

struct AndCondition {
    conditions: Vec<Arc<dyn RouteCondition>>,
}

impl RouteCondition for AndCondition {
    fn evaluate(&self, path: &str, meta: Option<&Metadata>) -> bool {
        self.conditions.iter().all(|c| c.evaluate(path, meta))
    }
}

/// All conditions must hold; the empty conjunction is true.
pub fn and(conditions: Vec<Arc<dyn RouteCondition>>) -> Arc<dyn RouteCondition> {
    Arc::new(AndCondition { conditions })
}

struct OrCondition {
    conditions: Vec<Arc<dyn RouteCondition>>,
}

impl RouteCondition for OrCondition {
    fn evaluate(&self, path: &str, meta: Option<&Metadata>) -> bool {
        self.conditions.iter().any(|c| c.evaluate(path, meta))
    }
}

/// At least one condition must hold; the empty disjunction is false.
pub fn or(conditions: Vec<Arc<dyn RouteCondition>>) -> Arc<dyn RouteCondition> {
    Arc::new(OrCondition { conditions })
}

struct NotCondition {
    condition: Arc<dyn RouteCondition>,
}

impl RouteCondition for NotCondition {
    fn evaluate(&self, path: &str, meta: Option<&Metadata>) -> bool {
        !self.condition.evaluate(path, meta)
    }
}

/// Inverts a condition.
pub fn not(condition: Arc<dyn RouteCondition>) -> Arc<dyn RouteCondition> {
    Arc::new(NotCondition { condition })
}
