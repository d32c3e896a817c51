//! # restfetch-test
//!
//! Testing utilities for restfetch. Provides a scripted transport, a
//! ready-made client harness, and response builders for exercising the
//! full request pipeline without a network.

use restfetch_client::Client;
use restfetch_core::ClientSettings;
use std::sync::Arc;

pub use restfetch_client::testing::{json_response, MockTransport};

/// The base URL every harness client talks to.
pub const TEST_BASE_URL: &str = "https://api.test";

/// A client wired to a scripted transport, both halves in reach of the
/// test body.
pub struct TestApi {
    pub transport: MockTransport,
    pub client: Client,
}

impl Default for TestApi {
    fn default() -> Self {
        Self::new()
    }
}

impl TestApi {
    /// A harness with default settings against [`TEST_BASE_URL`].
    pub fn new() -> Self {
        Self::with_settings(ClientSettings::new(TEST_BASE_URL))
    }

    /// A harness with custom settings.
    pub fn with_settings(settings: ClientSettings) -> Self {
        let transport = MockTransport::new();
        let client = Client::new(settings, Arc::new(transport.clone()));
        Self { transport, client }
    }

    /// Rebuilds the client around the same transport, for installing
    /// interceptors.
    pub fn map_client(self, f: impl FnOnce(Client) -> Client) -> Self {
        Self {
            transport: self.transport,
            client: f(self.client),
        }
    }
}
