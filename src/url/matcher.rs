/// Checks if a URL path falls under an exclusion pattern
///
/// This function supports two types of patterns:
/// 1. Prefix match: "/legal" matches "/legal", "/legal/" and "/legal/terms",
///    but not "/legality"
/// 2. Glob match: any pattern containing `*` is matched against the whole
///    path, where `*` matches any run of characters within one segment
///    and a trailing `/*` also matches everything below it
///
/// # Arguments
///
/// * `pattern` - The path pattern, starting with "/"
/// * `path` - The URL path to check
///
/// # Examples
///
/// ```
/// use sumi_scroll::url::matches_path;
///
/// assert!(matches_path("/legal", "/legal/terms"));
/// assert!(!matches_path("/legal", "/legality"));
/// assert!(matches_path("/blog/*/comments", "/blog/hello/comments"));
/// assert!(matches_path("/docs/*", "/docs/a/b"));
/// ```
pub fn matches_path(pattern: &str, path: &str) -> bool {
    if !pattern.contains('*') {
        let prefix = pattern.trim_end_matches('/');
        if prefix.is_empty() {
            return true;
        }
        return path == prefix
            || path
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with('/'));
    }

    if let Some(base) = pattern.strip_suffix("/*") {
        if !base.contains('*') {
            return matches_path(base, path) && path.trim_end_matches('/') != base;
        }
    }

    let pattern_segments: Vec<&str> = pattern.trim_end_matches('/').split('/').collect();
    let path_segments: Vec<&str> = path.trim_end_matches('/').split('/').collect();

    if pattern_segments.len() != path_segments.len() {
        return false;
    }

    pattern_segments
        .iter()
        .zip(path_segments.iter())
        .all(|(p, s)| matches_segment(p, s))
}

/// Matches one path segment against a segment pattern with `*` wildcards
fn matches_segment(pattern: &str, segment: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == segment;
    }

    let mut rest = segment;
    for (i, part) in parts.iter().enumerate() {
        if i == 0 {
            match rest.strip_prefix(part) {
                Some(r) => rest = r,
                None => return false,
            }
        } else if i == parts.len() - 1 {
            return rest.ends_with(part);
        } else {
            match rest.find(part) {
                Some(idx) => rest = &rest[idx + part.len()..],
                None => return false,
            }
        }
    }

    true
}
