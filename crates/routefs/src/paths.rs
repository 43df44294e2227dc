//! Forward-slash path normalization for routing decisions.
//!
//! Routing compares strings, never host paths: the same rules apply on
//! every platform.

/// Clean a path: collapse repeated separators, resolve `.` and `..`
/// segments, drop trailing slashes.
///
/// A leading `/` is preserved and `..` cannot climb above it; relative
/// paths stay relative and keep leading `..` segments. The empty path
/// cleans to `"."`, mirroring the usual lexical-clean contract.
pub fn clean(path: &str) -> String {
    let absolute = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if matches!(parts.last(), Some(&last) if last != "..") {
                    parts.pop();
                } else if !absolute {
                    parts.push("..");
                }
            }
            other => parts.push(other),
        }
    }

    if absolute {
        let mut out = String::from("/");
        out.push_str(&parts.join("/"));
        out
    } else if parts.is_empty() {
        String::from(".")
    } else {
        parts.join("/")
    }
}

/// Join a (possibly relative) path onto a base, then clean.
pub fn join(base: &str, path: &str) -> String {
    clean(&format!("{}/{}", base, path))
}

/// Clean and force a single leading `/`.
pub fn absolutize(path: &str) -> String {
    let cleaned = clean(path);
    if cleaned.starts_with('/') {
        cleaned
    } else if cleaned == "." {
        String::from("/")
    } else {
        format!("/{}", cleaned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_collapses_separators() {
        assert_eq!(clean("/a//b///c"), "/a/b/c");
        assert_eq!(clean("a//b"), "a/b");
    }

    #[test]
    fn clean_resolves_dots() {
        assert_eq!(clean("/a/./b"), "/a/b");
        assert_eq!(clean("/a/b/../c"), "/a/c");
        assert_eq!(clean("/a/b/.."), "/a");
        assert_eq!(clean("./a"), "a");
    }

    #[test]
    fn clean_caps_parent_at_root() {
        assert_eq!(clean("/.."), "/");
        assert_eq!(clean("/../a"), "/a");
        assert_eq!(clean("/a/../../b"), "/b");
    }

    #[test]
    fn clean_keeps_relative_parents() {
        assert_eq!(clean("../a"), "../a");
        assert_eq!(clean("a/../../b"), "../b");
        assert_eq!(clean(".."), "..");
    }

    #[test]
    fn clean_trailing_and_empty() {
        assert_eq!(clean("/a/b/"), "/a/b");
        assert_eq!(clean("/"), "/");
        assert_eq!(clean(""), ".");
        assert_eq!(clean("."), ".");
    }

    #[test]
    fn join_relative_onto_base() {
        assert_eq!(join("/home", "user"), "/home/user");
        assert_eq!(join("/home/user", ".."), "/home");
        assert_eq!(join("/", "tmp/x"), "/tmp/x");
    }

    #[test]
    fn absolutize_forces_leading_slash() {
        assert_eq!(absolutize("data"), "/data");
        assert_eq!(absolutize("/data"), "/data");
        assert_eq!(absolutize("data/../x"), "/x");
        assert_eq!(absolutize(""), "/");
    }
}
