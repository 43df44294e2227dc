//! Pattern matchers, compiled once at route insertion.

use std::fmt;

use regex::Regex;
use routefs_glob::GlobPattern;

use crate::errors::Error;
use crate::paths;

/// How a route pattern is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternKind {
    /// Plain path prefix after normalization.
    Prefix,
    /// Shell-style glob with `**`, classes, and brace alternation.
    Glob,
    /// Regular expression with substring semantics.
    Regex,
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternKind::Prefix => write!(f, "prefix"),
            PatternKind::Glob => write!(f, "glob"),
            PatternKind::Regex => write!(f, "regex"),
        }
    }
}

/// A compiled pattern: a side-effect-free predicate over paths, safe
/// for concurrent readers.
#[derive(Debug, Clone)]
pub(crate) enum Matcher {
    Prefix { prefix: String },
    Glob(GlobPattern),
    Regex(Regex),
}

impl Matcher {
    /// Compile `pattern` under `kind`, rejecting invalid grammar.
    pub(crate) fn compile(pattern: &str, kind: PatternKind) -> Result<Self, Error> {
        match kind {
            PatternKind::Prefix => Ok(Matcher::Prefix {
                prefix: paths::absolutize(pattern),
            }),
            PatternKind::Glob => GlobPattern::new(pattern)
                .map(Matcher::Glob)
                .map_err(|_| Error::InvalidPattern),
            PatternKind::Regex => Regex::new(pattern)
                .map(Matcher::Regex)
                .map_err(|_| Error::InvalidPattern),
        }
    }

    pub(crate) fn matches(&self, path: &str) -> bool {
        match self {
            // Pure string prefix after normalization; no component
            // boundary is required.
            Matcher::Prefix { prefix } => paths::absolutize(path).starts_with(prefix.as_str()),
            Matcher::Glob(glob) => {
                let path = paths::clean(path);
                if glob.matches(&path) {
                    return true;
                }
                // Retry with the leading slash toggled
                if let Some(stripped) = path.strip_prefix('/') {
                    if glob.matches(stripped) {
                        return true;
                    }
                } else if glob.matches(&format!("/{}", path)) {
                    return true;
                }
                // Bare patterns also match against the basename alone
                if !glob.as_str().contains('/') {
                    if let Some((_, basename)) = path.rsplit_once('/') {
                        return glob.matches(basename);
                    }
                }
                false
            }
            Matcher::Regex(regex) => regex.is_match(path),
        }
    }
}
