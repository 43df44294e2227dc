//! Path rewriters applied before a path reaches a backend.
//!
//! Rewriters are pure functions; a route without one dispatches the
//! path unchanged.

use std::collections::HashMap;
use std::sync::Arc;

use regex::Regex;

use crate::errors::Error;

/// Pure transformation applied to a path before dispatch.
pub trait PathRewriter: Send + Sync {
    fn rewrite(&self, path: &str) -> String;
}

struct PrefixRewriter {
    old_prefix: String,
    new_prefix: String,
}

impl PathRewriter for PrefixRewriter {
    fn rewrite(&self, path: &str) -> String {
        if self.old_prefix.is_empty() {
            return format!("{}{}", self.new_prefix, path);
        }
        match path.strip_prefix(&self.old_prefix) {
            Some(rest) => format!("{}{}", self.new_prefix, rest),
            None => path.to_string(),
        }
    }
}

/// Removes `prefix` from paths that start with it.
pub fn strip_prefix(prefix: impl Into<String>) -> Arc<dyn PathRewriter> {
    Arc::new(PrefixRewriter {
        old_prefix: prefix.into(),
        new_prefix: String::new(),
    })
}

/// Prepends `prefix` to every path.
pub fn add_prefix(prefix: impl Into<String>) -> Arc<dyn PathRewriter> {
    Arc::new(PrefixRewriter {
        old_prefix: String::new(),
        new_prefix: prefix.into(),
    })
}

/// Replaces `old_prefix` with `new_prefix` on paths that start with it.
pub fn replace_prefix(
    old_prefix: impl Into<String>,
    new_prefix: impl Into<String>,
) -> Arc<dyn PathRewriter> {
    Arc::new(PrefixRewriter {
        old_prefix: old_prefix.into(),
        new_prefix: new_prefix.into(),
    })
}

struct RegexRewriter {
    pattern: Regex,
    replacement: String,
}

impl PathRewriter for RegexRewriter {
    fn rewrite(&self, path: &str) -> String {
        self.pattern
            .replace_all(path, self.replacement.as_str())
            .into_owned()
    }
}

/// Replaces every match of `pattern` with `replacement`. Numbered
/// backreferences (`$1`, `$2`, ...) refer to capture groups.
pub fn regex_rewrite(pattern: &str, replacement: &str) -> Result<Arc<dyn PathRewriter>, Error> {
    let compiled = Regex::new(pattern).map_err(|_| Error::InvalidPattern)?;
    Ok(Arc::new(RegexRewriter {
        pattern: compiled,
        replacement: replacement.to_string(),
    }))
}

struct StaticRewriter {
    mapping: HashMap<String, String>,
}

impl PathRewriter for StaticRewriter {
    fn rewrite(&self, path: &str) -> String {
        match self.mapping.get(path) {
            Some(mapped) => mapped.clone(),
            None => path.to_string(),
        }
    }
}

/// Maps exact paths to replacements; unmapped paths pass through.
pub fn static_mapping(mapping: HashMap<String, String>) -> Arc<dyn PathRewriter> {
    Arc::new(StaticRewriter { mapping })
}

struct ChainRewriter {
    rewriters: Vec<Arc<dyn PathRewriter>>,
}

impl PathRewriter for ChainRewriter {
    fn rewrite(&self, path: &str) -> String {
        let mut path = path.to_string();
        for rewriter in &self.rewriters {
            path = rewriter.rewrite(&path);
        }
        path
    }
}

/// Applies rewriters in order; the empty chain is the identity.
pub fn chain(rewriters: Vec<Arc<dyn PathRewriter>>) -> Arc<dyn PathRewriter> {
    Arc::new(ChainRewriter { rewriters })
}
