//! Reactive per-call-site request state.
//!
//! A [`FetchState`] is the only state a consumer observes for one logical
//! call site: status code, raw response, parsed data, error, and the
//! loading flag. It is created once per call site and mutated across
//! repeated executions. All fields are reactive cells, and every mutation
//! additionally bumps a version cell so another task (a deduplication
//! follower) can mirror the whole state without polling.

use restfetch_core::FetchError;
use restfetch_http::Response;
use restfetch_reactive::Reactive;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// The reactive state of one logical call site.
///
/// Cloning a `FetchState` clones handles to the same cells; the
/// deduplication registry relies on this to hand a leader's state to
/// followers.
#[derive(Clone)]
pub struct FetchState {
    status: Reactive<Option<u16>>,
    raw: Reactive<Option<Response>>,
    data: Reactive<Option<Value>>,
    error: Reactive<Option<FetchError>>,
    is_fetching: Reactive<bool>,
    version: Reactive<u64>,
}

impl Default for FetchState {
    fn default() -> Self {
        Self::new()
    }
}

impl FetchState {
    /// Creates an idle state: no status, no data, no error, not fetching.
    pub fn new() -> Self {
        Self {
            status: Reactive::new(None),
            raw: Reactive::new(None),
            data: Reactive::new(None),
            error: Reactive::new(None),
            is_fetching: Reactive::new(false),
            version: Reactive::new(0),
        }
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// The last observed HTTP status code.
    pub fn status(&self) -> Option<u16> {
        self.status.get()
    }

    /// The last raw response.
    pub fn raw(&self) -> Option<Response> {
        self.raw.get()
    }

    /// The last parsed response data.
    pub fn data(&self) -> Option<Value> {
        self.data.get()
    }

    /// The last parsed data, deserialized into a typed value.
    pub fn data_as<T: DeserializeOwned>(&self) -> Option<T> {
        serde_json::from_value(self.data.get()?).ok()
    }

    /// The last error, if the most recent execution failed.
    pub fn error(&self) -> Option<FetchError> {
        self.error.get()
    }

    /// `true` while an execution is in flight.
    pub fn is_fetching(&self) -> bool {
        self.is_fetching.get()
    }

    // ── Observation ──────────────────────────────────────────────────

    /// The data cell, for subscribing to data changes.
    pub fn data_cell(&self) -> Reactive<Option<Value>> {
        self.data.clone()
    }

    /// The error cell, for subscribing to error changes.
    pub fn error_cell(&self) -> Reactive<Option<FetchError>> {
        self.error.clone()
    }

    /// The loading-flag cell, for subscribing to loading transitions.
    pub fn is_fetching_cell(&self) -> Reactive<bool> {
        self.is_fetching.clone()
    }

    /// Waits until no execution is in flight.
    pub async fn settled(&self) {
        self.is_fetching.wait_until(|fetching| !fetching).await;
    }

    // ── Writes (engine only) ─────────────────────────────────────────

    /// Marks the start of an execution: clears the error and raises the
    /// loading flag.
    pub fn begin(&self) {
        self.error.set(None);
        self.is_fetching.set(true);
        self.bump();
    }

    /// Records the transport's answer before parsing.
    pub fn record_response(&self, status: u16, response: Response) {
        self.status.set(Some(status));
        self.raw.set(Some(response));
        self.bump();
    }

    /// Terminal success: stores the parsed data and lowers the loading
    /// flag.
    pub fn finish_data(&self, data: Option<Value>) {
        self.data.set(data);
        self.is_fetching.set(false);
        self.bump();
    }

    /// Terminal failure: stores the error and lowers the loading flag.
    pub fn finish_error(&self, error: FetchError) {
        self.error.set(Some(error));
        self.is_fetching.set(false);
        self.bump();
    }

    /// Records an error discovered after the execution settled (envelope
    /// normalization). The loading flag is untouched.
    pub fn record_error(&self, error: FetchError) {
        self.error.set(Some(error));
        self.bump();
    }

    /// Mirrors a leader's state until the leader settles, then copies the
    /// terminal state.
    ///
    /// Every leader mutation is copied as it happens, and the copy
    /// sequence ends with the leader's terminal state, so an observer of
    /// this state never sees a terminal value revert. A leader that has
    /// already settled is copied synchronously without waiting.
    pub async fn follow(&self, leader: &Self) {
        leader
            .version
            .wait_until(|_| {
                self.copy_from(leader);
                !leader.is_fetching()
            })
            .await;
    }

    fn copy_from(&self, leader: &Self) {
        self.status.set(leader.status.get());
        self.raw.set(leader.raw.get());
        self.data.set(leader.data.get());
        self.error.set(leader.error.get());
        self.bump();
    }

    fn bump(&self) {
        self.version.update(|v| *v += 1);
    }
}
