//! Slash-delimited path helpers. Paths are the only identity shared by the
//! client, the cache and the resolver.

/// Absolute form with a leading `/`, no empty segments and no trailing `/`.
pub fn normalize_path(path: &str) -> String {
    let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let mut out = String::from("/");
    out.push_str(&parts.join("/"));
    out
}

/// `parent` + `/` + `name`, without doubling the separator at the root.
pub fn join_path(parent: &str, name: &str) -> String {
    let mut path = parent.trim_end_matches('/').to_string();
    path.push('/');
    path.push_str(name.trim_start_matches('/'));
    path
}

/// Parent of `path`, or `None` for the root and for a single-segment
/// relative path.
pub fn parent_path(path: &str) -> Option<&str> {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.rfind('/') {
        Some(0) => Some("/"),
        Some(i) => Some(&trimmed[..i]),
        None => None,
    }
}
