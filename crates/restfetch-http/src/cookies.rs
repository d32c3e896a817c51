//! Cookie header parsing.
//!
//! The client only ever reads cookies (to forward the CSRF token); it
//! never sets them. Parsing is deliberately forgiving: fragments without
//! an `=` are skipped rather than rejected, and only the first `=` splits
//! a pair, so values that themselves contain `=` survive intact.

use std::collections::HashMap;

/// Parses a `Cookie` header into name/value pairs.
///
/// Each fragment is split on the first `=` only; names and values are
/// trimmed of surrounding whitespace; values are percent-decoded.
/// Fragments with no `=` are skipped silently.
///
/// # Examples
///
/// ```
/// use restfetch_http::parse_cookie_header;
///
/// let cookies = parse_cookie_header("a=1; token=abc=def=ghi; junk; b=%20x");
/// assert_eq!(cookies.get("token").map(String::as_str), Some("abc=def=ghi"));
/// assert_eq!(cookies.get("b").map(String::as_str), Some(" x"));
/// assert!(!cookies.contains_key("junk"));
/// ```
pub fn parse_cookie_header(header: &str) -> HashMap<String, String> {
    let mut cookies = HashMap::new();

    for part in header.split(';') {
        let trimmed = part.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some((name, value)) = trimmed.split_once('=') {
            let name = name.trim();
            let value = value.trim();
            if !name.is_empty() {
                cookies.insert(name.to_string(), percent_decode(value));
            }
        }
        // Fragments without '=' are skipped
    }

    cookies
}

/// Returns the decoded value of a single named cookie, if present.
pub fn cookie_value(header: &str, name: &str) -> Option<String> {
    for part in header.split(';') {
        let trimmed = part.trim();
        if let Some((cookie_name, value)) = trimmed.split_once('=') {
            if cookie_name.trim() == name {
                return Some(percent_decode(value.trim()));
            }
        }
    }
    None
}

fn percent_decode(input: &str) -> String {
    percent_encoding::percent_decode_str(input)
        .decode_utf8_lossy()
        .into_owned()
}
