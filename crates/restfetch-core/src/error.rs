//! Error types for the restfetch client.
//!
//! This module provides [`FetchError`], the single error type delivered to
//! consumers. Every failure in the request pipeline is normalized into one
//! of its variants, so callers never need to sniff the shape of an error
//! value: the same type flows through return values and through the reactive
//! error cell of a call site.

use thiserror::Error;

/// A coarse classification of a [`FetchError`], useful for matching without
/// destructuring the full variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// An input failed validation before any network activity.
    Validation,
    /// A request interceptor aborted the request.
    Abort,
    /// The configured timeout elapsed before the request settled.
    Timeout,
    /// The underlying transport failed or the server answered with an
    /// error status.
    Network,
    /// The response body could not be parsed.
    Parse,
    /// A paginated envelope was missing the expected data array.
    Normalization,
}

/// The error type for all restfetch operations.
///
/// `FetchError` is `Clone` so that a single error can be stored in a
/// reactive cell and simultaneously returned to the caller that opted into
/// error propagation. All payloads are plain strings or scalars for the
/// same reason.
///
/// # Examples
///
/// ```
/// use restfetch_core::{ErrorKind, FetchError};
///
/// let err = FetchError::Timeout { ms: 5000 };
/// assert_eq!(err.kind(), ErrorKind::Timeout);
/// assert_eq!(err.to_string(), "Request timed out after 5000 ms");
/// ```
#[derive(Error, Debug, Clone)]
pub enum FetchError {
    /// An invalid input was supplied (bad primary key, out-of-range
    /// pagination value, unparseable base URL).
    #[error("Validation error: {0}")]
    Validation(String),

    /// A request interceptor returned the abort outcome; the network was
    /// never contacted.
    #[error("Request aborted: {0}")]
    Abort(String),

    /// The resolved timeout elapsed before the request settled.
    #[error("Request timed out after {ms} ms")]
    Timeout {
        /// The timeout that elapsed, in milliseconds.
        ms: u64,
    },

    /// The transport failed to deliver the request, or the server
    /// answered with an error status.
    #[error("Network error: {0}")]
    Network(String),

    /// The response body could not be parsed with the parser selected by
    /// its content type.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A paginated envelope did not contain the expected data array.
    #[error("Normalization error: {0}")]
    Normalization(String),
}

impl FetchError {
    /// Returns the [`ErrorKind`] of this error.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Abort(_) => ErrorKind::Abort,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Network(_) => ErrorKind::Network,
            Self::Parse(_) => ErrorKind::Parse,
            Self::Normalization(_) => ErrorKind::Normalization,
        }
    }

    /// Returns `true` if this error terminated the request before any
    /// network activity.
    pub const fn is_pre_network(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::Abort(_))
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<url::ParseError> for FetchError {
    fn from(err: url::ParseError) -> Self {
        Self::Validation(format!("invalid URL: {err}"))
    }
}

/// A convenience type alias for `Result<T, FetchError>`.
pub type ClientResult<T> = Result<T, FetchError>;
