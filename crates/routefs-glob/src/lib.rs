//! routefs-glob: Shell-style glob matching over forward-slash paths.
//!
//! Implements the pattern grammar used by routefs glob routes:
//! - `*` matches any run of characters within one path component
//! - `**` matches any run of characters, including `/`
//! - `?` matches exactly one non-separator character
//! - `[abc]`, `[a-z]`, `[!abc]` character classes (never match `/`)
//! - `{a,b,c}` brace alternation (nesting supported)
//!
//! Patterns are validated at construction; matching is allocation-free
//! and side-effect-free, so a compiled [`GlobPattern`] can be shared
//! across threads.

mod glob;

pub use glob::{expand_braces, glob_match, GlobPattern, PatternError};
