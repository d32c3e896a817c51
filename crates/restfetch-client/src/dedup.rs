//! In-flight request deduplication.
//!
//! Two executions with the same method, normalized URL, and canonical
//! body share one network call: the first becomes the leader, later
//! arrivals become followers that mirror the leader's state. Entries are
//! removed on a deferred task after the leader settles, so a follower
//! that arrives in the same scheduling tick still finds the entry while
//! one arriving after the removal ran starts fresh.

use crate::state::FetchState;
use restfetch_http::{normalize_url_for_key, Body, RequestDescriptor};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// How many body characters the non-JSON fallback key keeps.
const RAW_BODY_KEY_PREFIX: usize = 100;

/// Computes the deduplication key of a request.
///
/// Returns `None` for requests that must never be shared (opaque byte
/// bodies). URL normalization strips trailing slashes and sorts query
/// pairs; JSON bodies are re-serialized with recursively sorted object
/// keys so key order never splits a match. A text body that is not valid
/// JSON falls back to a length-plus-prefix key, which can collide for
/// long bodies sharing a prefix; such bodies are rare enough that the
/// shared call is an acceptable trade.
pub fn dedup_key(request: &RequestDescriptor) -> Option<String> {
    if request.body.bypasses_dedup() {
        return None;
    }
    // An unparseable URL cannot be normalized; let it fail alone in the
    // transport instead of sharing a bogus key.
    let url = normalize_url_for_key(&request.url).ok()?;
    let body = canonical_body(&request.body);
    Some(format!("{}:{url}:{body}", request.method))
}

fn canonical_body(body: &Body) -> String {
    match body {
        Body::Empty => String::new(),
        Body::Json(value) => sort_keys(value).to_string(),
        Body::Text(text) => match serde_json::from_str::<Value>(text) {
            Ok(value) => sort_keys(&value).to_string(),
            Err(_) => {
                let prefix: String = text.chars().take(RAW_BODY_KEY_PREFIX).collect();
                format!("non-json:{}:{prefix}", text.len())
            }
        },
        // Unreachable through dedup_key; kept total for direct callers.
        Body::Bytes(bytes) => format!("bytes:{}", bytes.len()),
    }
}

fn sort_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut sorted: Vec<_> = map.iter().collect();
            sorted.sort_by_key(|(key, _)| key.as_str());
            Value::Object(
                sorted
                    .into_iter()
                    .map(|(key, value)| (key.clone(), sort_keys(value)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}

/// Registry of in-flight request states, keyed by [`dedup_key`].
#[derive(Clone, Default)]
pub struct DedupRegistry {
    pending: Arc<Mutex<HashMap<String, FetchState>>>,
}

impl DedupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up the in-flight leader state for a key.
    pub fn get_pending(&self, key: &str) -> Option<FetchState> {
        self.pending
            .lock()
            .expect("dedup registry lock poisoned")
            .get(key)
            .cloned()
    }

    /// Registers a state as the leader for a key.
    pub fn register(&self, key: String, state: FetchState) {
        self.pending
            .lock()
            .expect("dedup registry lock poisoned")
            .insert(key, state);
    }

    /// Removes a key on a deferred task, after pending followers on the
    /// current tick had a chance to attach.
    pub fn schedule_removal(&self, key: String) {
        let pending = Arc::clone(&self.pending);
        tokio::spawn(async move {
            tokio::task::yield_now().await;
            pending
                .lock()
                .expect("dedup registry lock poisoned")
                .remove(&key);
        });
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.pending
            .lock()
            .expect("dedup registry lock poisoned")
            .len()
    }
}
