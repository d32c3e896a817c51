//! URL building and normalization.
//!
//! [`build_url`] merges a base URL, a request path, and explicit query
//! parameters into the final request URL; explicit parameters override
//! pairs already present in the path's query string, and any fragment is
//! preserved. [`normalize_url_for_key`] produces the canonical form used
//! for deduplication keys.

use restfetch_core::{ClientResult, FetchError};
use url::Url;

/// Returns `true` if the path is already an absolute URL.
fn is_absolute(path: &str) -> bool {
    path.starts_with("http://") || path.starts_with("https://")
}

/// Builds the final request URL from a base URL, a path, and explicit
/// query parameters.
///
/// The path may itself carry a query string; explicit parameters override
/// existing pairs with the same key, and the remaining pairs keep their
/// original order. Fragments survive the merge. An absolute path is used
/// as-is instead of being joined onto the base.
///
/// # Examples
///
/// ```
/// use restfetch_http::build_url;
///
/// let url = build_url(
///     "https://api.example.com",
///     "/users/?page=1#top",
///     &[("page".to_string(), "2".to_string())],
/// )
/// .unwrap();
/// assert_eq!(url, "https://api.example.com/users/?page=2#top");
/// ```
pub fn build_url(base: &str, path: &str, params: &[(String, String)]) -> ClientResult<String> {
    let joined = if is_absolute(path) {
        path.to_string()
    } else if base.is_empty() {
        return Err(FetchError::Validation(format!(
            "cannot resolve relative path {path:?} without a base URL"
        )));
    } else {
        format!(
            "{}/{}",
            base.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    };

    let mut url = Url::parse(&joined)?;

    let existing: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut merged: Vec<(String, String)> = existing
        .into_iter()
        .filter(|(key, _)| !params.iter().any(|(pk, _)| pk == key))
        .collect();
    merged.extend(params.iter().cloned());

    if merged.is_empty() {
        url.set_query(None);
    } else {
        let mut pairs = url.query_pairs_mut();
        pairs.clear();
        for (key, value) in &merged {
            pairs.append_pair(key, value);
        }
        drop(pairs);
    }

    Ok(url.to_string())
}

/// Normalizes a URL into the canonical form used in deduplication keys:
/// the trailing slash is stripped from the path and query parameters are
/// sorted alphabetically. Fragments are not part of the key since they are
/// never sent to the server.
///
/// # Examples
///
/// ```
/// use restfetch_http::normalize_url_for_key;
///
/// let a = normalize_url_for_key("https://x.test/users/?b=2&a=1").unwrap();
/// let b = normalize_url_for_key("https://x.test/users?a=1&b=2#frag").unwrap();
/// assert_eq!(a, b);
/// ```
pub fn normalize_url_for_key(url: &str) -> ClientResult<String> {
    let parsed = Url::parse(url)?;

    let mut path = parsed.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        path.pop();
    }

    let mut pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    pairs.sort();

    let mut canonical = format!(
        "{}://{}{}",
        parsed.scheme(),
        parsed.authority(),
        path
    );
    if !pairs.is_empty() {
        let query: Vec<String> = pairs
            .into_iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        canonical.push('?');
        canonical.push_str(&query.join("&"));
    }

    Ok(canonical)
}
