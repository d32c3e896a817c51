//! Request descriptors.
//!
//! A [`RequestDescriptor`] captures everything the transport needs to send
//! one request: method, resolved URL, normalized headers, and body. A fresh
//! descriptor is built on every execution so that overlapping executions of
//! the same call site never share mutable request state.

use std::collections::HashMap;

use bytes::Bytes;
use http::Method;

/// A request body.
///
/// `Bytes` is the opaque, non-serializable kind: it bypasses request
/// deduplication entirely, since two byte payloads cannot be compared
/// structurally without reading them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Body {
    /// No body.
    #[default]
    Empty,
    /// A JSON value, serialized as `application/json`.
    Json(serde_json::Value),
    /// A plain text payload.
    Text(String),
    /// An opaque byte payload (binary uploads, multipart encodings).
    Bytes(Bytes),
}

impl Body {
    /// Returns `true` if this body carries no payload.
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Returns `true` if this body kind is excluded from deduplication.
    pub const fn bypasses_dedup(&self) -> bool {
        matches!(self, Self::Bytes(_))
    }

    /// Returns the raw bytes the transport should send.
    pub fn to_bytes(&self) -> Bytes {
        match self {
            Self::Empty => Bytes::new(),
            Self::Json(value) => Bytes::from(value.to_string()),
            Self::Text(text) => Bytes::from(text.clone()),
            Self::Bytes(bytes) => bytes.clone(),
        }
    }
}

impl From<serde_json::Value> for Body {
    fn from(value: serde_json::Value) -> Self {
        Self::Json(value)
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Body {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Self::Bytes(bytes)
    }
}

/// Normalizes a list of header pairs into a lookup map.
///
/// Header keys are matched case-insensitively, so keys are lower-cased;
/// when the same key appears more than once, the last write wins.
///
/// # Examples
///
/// ```
/// use restfetch_http::normalize_headers;
///
/// let headers = normalize_headers(&[
///     ("Content-Type".to_string(), "text/plain".to_string()),
///     ("content-type".to_string(), "application/json".to_string()),
/// ]);
/// assert_eq!(headers.get("content-type").map(String::as_str), Some("application/json"));
/// assert_eq!(headers.len(), 1);
/// ```
pub fn normalize_headers(pairs: &[(String, String)]) -> HashMap<String, String> {
    let mut headers = HashMap::new();
    for (key, value) in pairs {
        headers.insert(key.to_ascii_lowercase(), value.clone());
    }
    headers
}

/// An immutable description of one request attempt.
///
/// Descriptors compare field by field; the interceptor pipeline uses that
/// comparison to decide whether an interceptor actually changed the
/// request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    /// The HTTP method.
    pub method: Method,
    /// The fully resolved URL, with no reactive indirection left.
    pub url: String,
    /// Normalized headers: lower-cased keys, last write wins.
    pub headers: HashMap<String, String>,
    /// The request body.
    pub body: Body,
}

impl RequestDescriptor {
    /// Creates a descriptor with normalized headers.
    pub fn new(
        method: Method,
        url: impl Into<String>,
        headers: &[(String, String)],
        body: Body,
    ) -> Self {
        Self::from_parts(method, url, normalize_headers(headers), body)
    }

    /// Creates a descriptor from already-normalized headers.
    ///
    /// Keys are expected to be lower-cased; a `Json` body gets a
    /// `content-type: application/json` header unless one is present.
    pub fn from_parts(
        method: Method,
        url: impl Into<String>,
        headers: HashMap<String, String>,
        body: Body,
    ) -> Self {
        let mut descriptor = Self {
            method,
            url: url.into(),
            headers,
            body,
        };
        if let Body::Json(_) = descriptor.body {
            descriptor
                .headers
                .entry("content-type".to_string())
                .or_insert_with(|| "application/json".to_string());
        }
        descriptor
    }

    /// Returns a header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Returns `true` if the two descriptors describe the same request
    /// under field-by-field comparison (method, URL, normalized headers,
    /// body).
    pub fn same_request(&self, other: &Self) -> bool {
        self == other
    }
}
