//! The network transport seam.
//!
//! The engine never performs I/O itself: it hands a fully resolved
//! [`RequestDescriptor`] to a [`Transport`] and gets back a [`Response`].
//! Production builds plug in whatever HTTP stack the host application
//! uses; tests plug in a scripted transport.

use async_trait::async_trait;
use restfetch_core::ClientResult;
use restfetch_http::{RequestDescriptor, Response};

/// Sends a resolved request and returns the raw response.
///
/// Implementations must be safe to call repeatedly with the same inputs;
/// deduplication relies on identical requests being interchangeable.
/// Transport failures are reported as [`FetchError::Network`]
/// (`restfetch_core::FetchError::Network`).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends one request.
    async fn send(&self, request: &RequestDescriptor) -> ClientResult<Response>;
}
