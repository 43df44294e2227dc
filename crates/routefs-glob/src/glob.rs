//! Glob engine: brace expansion plus a bounded backtracking matcher.

use std::cell::Cell;

use thiserror::Error;

/// Upper bound on recursive matcher calls. Adversarial patterns like
/// `*a*a*a*...*a` backtrack in O(n^k); counting total calls bounds the
/// CPU cost rather than the stack depth.
const MAX_MATCH_CALLS: usize = 100_000;

/// Pattern rejected at construction time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("unclosed character class in pattern")]
    UnclosedClass,
    #[error("unclosed brace group in pattern")]
    UnclosedBrace,
    #[error("dangling escape at end of pattern")]
    DanglingEscape,
}

/// A validated, brace-expanded glob pattern.
///
/// Matching semantics over forward-slash paths:
/// - `*` matches within a single path component (never `/`)
/// - `**` matches across components
/// - `?` matches one non-separator character
/// - character classes never match `/`
#[derive(Debug, Clone)]
pub struct GlobPattern {
    pattern: String,
    alternatives: Vec<Vec<char>>,
}

impl GlobPattern {
    /// Compile a pattern, rejecting malformed class and brace syntax.
    pub fn new(pattern: &str) -> Result<Self, PatternError> {
        validate(pattern)?;
        let alternatives = expand_braces(pattern)
            .into_iter()
            .map(|alt| alt.chars().collect())
            .collect();
        Ok(Self {
            pattern: pattern.to_string(),
            alternatives,
        })
    }

    /// The original pattern string.
    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    /// Match the full input string against any expanded alternative.
    pub fn matches(&self, input: &str) -> bool {
        let input_chars: Vec<char> = input.chars().collect();
        let calls = Cell::new(0usize);
        self.alternatives
            .iter()
            .any(|alt| match_bounded(alt, 0, &input_chars, 0, &calls))
    }
}

/// One-shot convenience: compile and match, false on invalid patterns.
pub fn glob_match(pattern: &str, input: &str) -> bool {
    match GlobPattern::new(pattern) {
        Ok(compiled) => compiled.matches(input),
        Err(_) => false,
    }
}

/// Reject syntax the matcher cannot interpret: unclosed `[`, unclosed
/// `{`, or a trailing `\`. A stray `}` stays literal.
fn validate(pattern: &str) -> Result<(), PatternError> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut brace_depth = 0usize;
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '\\' => {
                if i + 1 >= chars.len() {
                    return Err(PatternError::DanglingEscape);
                }
                i += 2;
            }
            '{' => {
                brace_depth += 1;
                i += 1;
            }
            '}' => {
                brace_depth = brace_depth.saturating_sub(1);
                i += 1;
            }
            '[' => {
                let mut j = i + 1;
                if j < chars.len() && (chars[j] == '!' || chars[j] == '^') {
                    j += 1;
                }
                // A `]` in first position is a literal member
                if j < chars.len() && chars[j] == ']' {
                    j += 1;
                }
                while j < chars.len() && chars[j] != ']' {
                    j += 1;
                }
                if j >= chars.len() {
                    return Err(PatternError::UnclosedClass);
                }
                i = j + 1;
            }
            _ => i += 1,
        }
    }

    if brace_depth > 0 {
        return Err(PatternError::UnclosedBrace);
    }
    Ok(())
}

/// Expand brace expressions in a pattern.
///
/// `{a,b,c}` expands to multiple patterns; nested braces are supported.
///
/// # Examples
/// ```
/// use routefs_glob::expand_braces;
///
/// assert_eq!(expand_braces("simple"), vec!["simple"]);
/// assert_eq!(expand_braces("{a,b}"), vec!["a", "b"]);
/// ```
pub fn expand_braces(pattern: &str) -> Vec<String> {
    let chars: Vec<char> = pattern.chars().collect();

    // Find the first top-level brace group
    let mut depth = 0;
    let mut brace_start = None;
    let mut brace_end = None;

    for (i, &c) in chars.iter().enumerate() {
        match c {
            '{' => {
                if depth == 0 {
                    brace_start = Some(i);
                }
                depth += 1;
            }
            '}' => {
                depth -= 1;
                if depth == 0 && brace_start.is_some() {
                    brace_end = Some(i);
                    break;
                }
            }
            _ => {}
        }
    }

    let (start, end) = match (brace_start, brace_end) {
        (Some(s), Some(e)) => (s, e),
        _ => return vec![pattern.to_string()],
    };

    let prefix: String = chars[..start].iter().collect();
    let suffix: String = chars[end + 1..].iter().collect();
    let brace_content: String = chars[start + 1..end].iter().collect();

    let alternatives = split_brace_alternatives(&brace_content);

    let mut results = Vec::new();
    for alt in alternatives {
        let combined = format!("{}{}{}", prefix, alt, suffix);
        // Recurse in case more brace groups remain
        results.extend(expand_braces(&combined));
    }

    results
}

/// Split brace content by commas, respecting nested braces.
fn split_brace_alternatives(content: &str) -> Vec<String> {
    let mut alternatives = Vec::new();
    let mut current = String::new();
    let mut depth = 0;

    for c in content.chars() {
        match c {
            '{' => {
                depth += 1;
                current.push(c);
            }
            '}' => {
                depth -= 1;
                current.push(c);
            }
            ',' if depth == 0 => {
                alternatives.push(current);
                current = String::new();
            }
            _ => current.push(c),
        }
    }
    alternatives.push(current);

    alternatives
}

/// Work-bounded recursive matcher with backtracking for `*` and `**`.
///
/// Returns false (non-match) once total calls exceed `MAX_MATCH_CALLS`.
fn match_bounded(
    pattern: &[char],
    pi: usize,
    input: &[char],
    ii: usize,
    calls: &Cell<usize>,
) -> bool {
    let count = calls.get() + 1;
    calls.set(count);
    if count > MAX_MATCH_CALLS {
        return false;
    }

    if pi >= pattern.len() && ii >= input.len() {
        return true;
    }
    if pi >= pattern.len() {
        return false;
    }

    match pattern[pi] {
        '*' => {
            // Collapse consecutive stars; two or more cross separators
            let mut next_pi = pi;
            while next_pi < pattern.len() && pattern[next_pi] == '*' {
                next_pi += 1;
            }
            let crosses = next_pi - pi >= 2;

            if next_pi >= pattern.len() {
                // Trailing `**` swallows the rest; trailing `*` only
                // the rest of the current component
                return crosses || !input[ii..].contains(&'/');
            }

            // `**/` also matches zero components
            if crosses
                && pattern[next_pi] == '/'
                && match_bounded(pattern, next_pi + 1, input, ii, calls)
            {
                return true;
            }

            let limit = if crosses {
                input.len() - ii
            } else {
                input[ii..]
                    .iter()
                    .position(|&c| c == '/')
                    .unwrap_or(input.len() - ii)
            };
            for skip in 0..=limit {
                if match_bounded(pattern, next_pi, input, ii + skip, calls) {
                    return true;
                }
            }
            false
        }

        '?' => {
            if ii >= input.len() || input[ii] == '/' {
                return false;
            }
            match_bounded(pattern, pi + 1, input, ii + 1, calls)
        }

        '[' => {
            if ii >= input.len() || input[ii] == '/' {
                return false;
            }
            let (matches, end_idx) = parse_char_class(&pattern[pi..], input[ii]);
            if matches {
                match_bounded(pattern, pi + end_idx, input, ii + 1, calls)
            } else {
                false
            }
        }

        // Escape next character
        '\\' if pi + 1 < pattern.len() => {
            if ii >= input.len() {
                return false;
            }
            if pattern[pi + 1] == input[ii] {
                match_bounded(pattern, pi + 2, input, ii + 1, calls)
            } else {
                false
            }
        }

        c => {
            if ii >= input.len() {
                return false;
            }
            if c == input[ii] {
                match_bounded(pattern, pi + 1, input, ii + 1, calls)
            } else {
                false
            }
        }
    }
}

/// Parse a character class `[...]` and test a character against it.
///
/// Returns (matches, length) where length is how many pattern chars were
/// consumed. Validation guarantees the closing `]` exists.
fn parse_char_class(pattern: &[char], ch: char) -> (bool, usize) {
    let mut idx = 1;
    let mut negate = false;

    if idx < pattern.len() && (pattern[idx] == '!' || pattern[idx] == '^') {
        negate = true;
        idx += 1;
    }

    // `]` as the first member is literal
    let first_char = idx;
    let mut matched = false;

    while idx < pattern.len() {
        let c = pattern[idx];

        if c == ']' && idx > first_char {
            idx += 1;
            break;
        }

        // Range a-z
        if idx + 2 < pattern.len() && pattern[idx + 1] == '-' && pattern[idx + 2] != ']' {
            let start = c;
            let end = pattern[idx + 2];
            if ch >= start && ch <= end {
                matched = true;
            }
            idx += 3;
            continue;
        }

        if c == ch {
            matched = true;
        }
        idx += 1;
    }

    (if negate { !matched } else { matched }, idx)
}
