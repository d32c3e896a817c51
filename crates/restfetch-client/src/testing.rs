//! Test support: a scripted in-memory transport.
//!
//! Not gated behind `cfg(test)` so downstream integration suites can
//! script traffic against a real [`Client`](crate::Client).

use crate::transport::Transport;
use async_trait::async_trait;
use restfetch_core::{ClientResult, FetchError};
use restfetch_http::{RequestDescriptor, Response};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

struct Scripted {
    outcome: ClientResult<Response>,
    latency: Option<Duration>,
}

/// A transport that answers from a scripted queue and records every
/// request it sees. Clones share the queue and the recording.
#[derive(Clone, Default)]
pub struct MockTransport {
    script: Arc<Mutex<VecDeque<Scripted>>>,
    requests: Arc<Mutex<Vec<RequestDescriptor>>>,
    calls: Arc<AtomicUsize>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response.
    pub fn push(&self, response: Response) {
        self.push_scripted(Ok(response), None);
    }

    /// Queues a JSON response with the given status.
    pub fn push_json(&self, status: u16, body: Value) {
        self.push(json_response(status, &body));
    }

    /// Queues a response delivered after a delay.
    pub fn push_delayed(&self, response: Response, latency: Duration) {
        self.push_scripted(Ok(response), Some(latency));
    }

    /// Queues a delayed JSON response.
    pub fn push_delayed_json(&self, status: u16, body: Value, latency: Duration) {
        self.push_delayed(json_response(status, &body), latency);
    }

    /// Queues a transport-level failure.
    pub fn push_error(&self, error: FetchError) {
        self.push_scripted(Err(error), None);
    }

    fn push_scripted(&self, outcome: ClientResult<Response>, latency: Option<Duration>) {
        self.script
            .lock()
            .expect("mock script lock poisoned")
            .push_back(Scripted { outcome, latency });
    }

    /// Every request sent so far, in order.
    pub fn requests(&self) -> Vec<RequestDescriptor> {
        self.requests
            .lock()
            .expect("mock request log lock poisoned")
            .clone()
    }

    /// How many requests reached the transport.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &RequestDescriptor) -> ClientResult<Response> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .expect("mock request log lock poisoned")
            .push(request.clone());

        let scripted = self
            .script
            .lock()
            .expect("mock script lock poisoned")
            .pop_front()
            .ok_or_else(|| {
                FetchError::Network(format!("no scripted response for {}", request.url))
            })?;
        if let Some(latency) = scripted.latency {
            tokio::time::sleep(latency).await;
        }
        scripted.outcome
    }
}

/// Builds a JSON response with the right content type.
pub fn json_response(status: u16, body: &Value) -> Response {
    let headers = std::collections::HashMap::from([(
        "content-type".to_string(),
        "application/json".to_string(),
    )]);
    Response::new(status, headers, body.to_string())
}
