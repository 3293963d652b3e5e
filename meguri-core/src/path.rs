//! # Path Matcher
//!
//! Pure functions over slash-delimited paths such as `/group/123/message/normal/`.
//!
//! A path is an *ancestor* of another when it is a verbatim prefix of it, or
//! a prefix of it after its first run of decimal digits has been replaced by
//! `*`. Only the first numeric segment is generalized: `/group/*/` matches
//! every group, but nothing registered as `/group/1/user/*/` will ever match
//! through the wildcard.

use std::borrow::Cow;

/// Category segments that address an entity rather than name an event.
pub const PREFIX_TYPES: [&str; 3] = ["user", "discuss", "group"];

/// Normalize a path to `/segment/.../`, so prefix tests stop at segment
/// boundaries.
///
/// ```
/// use meguri_core::path::normalize;
///
/// assert_eq!(normalize("group/1"), "/group/1/");
/// assert_eq!(normalize(""), "/");
/// ```
pub fn normalize(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{trimmed}/")
    }
}

/// Replace the first run of decimal digits in `path` with `*`.
///
/// Returns `None` when the path contains no digits.
pub fn generalize(path: &str) -> Option<String> {
    let start = path.find(|c: char| c.is_ascii_digit())?;
    let len = path[start..]
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(path.len() - start);
    Some(format!("{}*{}", &path[..start], &path[start + len..]))
}

/// Whether `ancestor` scopes `path`.
///
/// ```
/// use meguri_core::path::is_ancestor;
///
/// assert!(is_ancestor("/group", "/group/123/message"));
/// assert!(is_ancestor("/group/*", "/group/123/message"));
/// assert!(!is_ancestor("/user/*", "/group/123/message"));
/// ```
pub fn is_ancestor(ancestor: &str, path: &str) -> bool {
    path.starts_with(ancestor) || generalize(path).is_some_and(|g| g.starts_with(ancestor))
}

fn is_numeric(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}

/// The remainder of `event_path` below `context_path`, if it is a descendant.
fn relative<'a>(context_path: &str, event_path: &'a str) -> Option<Cow<'a, str>> {
    if let Some(rest) = event_path.strip_prefix(context_path) {
        return Some(Cow::Borrowed(rest));
    }
    let general = generalize(event_path)?;
    general
        .strip_prefix(context_path)
        .map(|rest| Cow::Owned(rest.to_string()))
}

/// Derive the cascading event names `event_path` fires on a context at
/// `context_path`.
///
/// Entity segments (numeric ids and the `user`/`discuss`/`group` category
/// tokens) are dropped while no event name has been seen yet and collapse
/// to `*` afterwards. Each remaining segment extends the running name, and
/// every intermediate name is emitted, from least to most specific.
///
/// ```
/// use meguri_core::path::derive_event_types;
///
/// assert_eq!(
///     derive_event_types("/", "/group/123/message/normal/"),
///     vec!["message", "message/normal"],
/// );
/// assert_eq!(
///     derive_event_types("/", "/user/10/request/group/invite/"),
///     vec!["request", "request/*", "request/*/invite"],
/// );
/// ```
pub fn derive_event_types(context_path: &str, event_path: &str) -> Vec<String> {
    let Some(rest) = relative(context_path, event_path) else {
        return Vec::new();
    };

    let mut events = Vec::new();
    let mut last = String::new();
    for segment in rest.split('/') {
        let segment = if is_numeric(segment) || PREFIX_TYPES.contains(&segment) {
            if last.is_empty() { "" } else { "*" }
        } else {
            segment
        };
        if segment.is_empty() {
            continue;
        }
        if !last.is_empty() {
            last.push('/');
        }
        last.push_str(segment);
        events.push(last.clone());
    }
    events
}
