//! Responses and body parsing.
//!
//! A [`Response`] is the transport's answer: status, headers, and the raw
//! body bytes. [`Response::parse`] selects a parser by content type, which
//! is also how a response replaced by an interceptor is re-parsed.

use std::collections::HashMap;

use bytes::Bytes;
use restfetch_core::{ClientResult, FetchError};

/// A received HTTP response.
///
/// Header keys are stored lower-cased, matching the descriptor convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// The HTTP status code.
    pub status: u16,
    /// Response headers with lower-cased keys.
    pub headers: HashMap<String, String>,
    /// The raw body bytes.
    pub body: Bytes,
}

impl Response {
    /// Creates a response, lower-casing the header keys.
    pub fn new(status: u16, headers: HashMap<String, String>, body: impl Into<Bytes>) -> Self {
        let headers = headers
            .into_iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v))
            .collect();
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// Returns a header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Returns the parsed content type, if the header is present and valid.
    pub fn content_type(&self) -> Option<mime::Mime> {
        self.header("content-type")?.parse().ok()
    }

    /// Returns `true` for 2xx status codes.
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Returns the body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Parses the body into a JSON value, selecting the parser by content
    /// type:
    ///
    /// - `application/json` (and `+json` suffixes): parsed as JSON; a
    ///   malformed body is a [`FetchError::Parse`].
    /// - `text/*`: returned as a JSON string value.
    /// - anything else (or no content type): JSON is attempted first, and
    ///   the raw text is returned as a string value if that fails.
    pub fn parse(&self) -> ClientResult<serde_json::Value> {
        if self.body.is_empty() {
            return Ok(serde_json::Value::Null);
        }

        match self.content_type() {
            Some(mime) if Self::is_json_mime(&mime) => {
                serde_json::from_slice(&self.body).map_err(|err| {
                    FetchError::Parse(format!("invalid JSON response body: {err}"))
                })
            }
            Some(mime) if mime.type_() == mime::TEXT => Ok(serde_json::Value::String(self.text())),
            _ => serde_json::from_slice(&self.body)
                .or_else(|_| Ok(serde_json::Value::String(self.text()))),
        }
    }

    fn is_json_mime(mime: &mime::Mime) -> bool {
        (mime.type_() == mime::APPLICATION && mime.subtype() == mime::JSON)
            || mime.suffix() == Some(mime::JSON)
    }
}
