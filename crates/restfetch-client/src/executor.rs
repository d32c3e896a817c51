//! The request executor: client handle, call-site actions, and the
//! dispatch pipeline.
//!
//! A [`Client`] is an explicit, cloneable handle carrying settings, the
//! transport, the deduplication registry, and the interceptors. An
//! [`Action`] binds one endpoint to one [`FetchState`]; executing it runs
//! the full pipeline: resolve reactive inputs, build the URL, inject the
//! CSRF header, run the request interceptor, consult the deduplication
//! registry, race the transport against the timeout guard, run the
//! response interceptor, and parse.

use crate::dedup::{dedup_key, DedupRegistry};
use crate::interceptor::{
    RequestIntercept, RequestInterceptor, ResponseIntercept, ResponseInterceptor,
};
use crate::state::FetchState;
use crate::timeout::{Timeout, TimeoutController};
use crate::transport::Transport;
use http::Method;
use restfetch_core::{ClientResult, ClientSettings, FetchError};
use restfetch_http::{build_url, normalize_headers, Body, CsrfInjector, RequestDescriptor};
use restfetch_reactive::{Reactive, Source};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, warn, Instrument};

/// Produces the query pairs for one execution, re-read every time.
pub(crate) type QueryProvider = Arc<dyn Fn() -> Vec<(String, String)> + Send + Sync>;

// ── Client ───────────────────────────────────────────────────────────

/// A handle to one configured API. Cloning is cheap and clones share the
/// deduplication registry and cookie state.
#[derive(Clone)]
pub struct Client {
    settings: Arc<ClientSettings>,
    transport: Arc<dyn Transport>,
    registry: DedupRegistry,
    timeouts: TimeoutController,
    csrf: CsrfInjector,
    cookies: Reactive<String>,
    request_interceptor: Option<Arc<dyn RequestInterceptor>>,
    response_interceptor: Option<Arc<dyn ResponseInterceptor>>,
}

impl Client {
    pub fn new(settings: ClientSettings, transport: Arc<dyn Transport>) -> Self {
        let csrf = CsrfInjector::new(settings.csrf.clone());
        Self {
            settings: Arc::new(settings),
            transport,
            registry: DedupRegistry::new(),
            timeouts: TimeoutController::new(),
            csrf,
            cookies: Reactive::new(String::new()),
            request_interceptor: None,
            response_interceptor: None,
        }
    }

    /// Installs the request interceptor. At most one is consulted per
    /// execution; installing again replaces the previous one.
    #[must_use]
    pub fn with_request_interceptor(mut self, interceptor: Arc<dyn RequestInterceptor>) -> Self {
        self.request_interceptor = Some(interceptor);
        self
    }

    /// Installs the response interceptor.
    #[must_use]
    pub fn with_response_interceptor(mut self, interceptor: Arc<dyn ResponseInterceptor>) -> Self {
        self.response_interceptor = Some(interceptor);
        self
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    /// Replaces the cookie header used for CSRF token extraction.
    pub fn set_cookie_header(&self, header: impl Into<String>) {
        self.cookies.set(header.into());
    }

    /// Creates an action for an arbitrary endpoint path.
    pub fn action(&self, path: impl Into<String>, options: ActionOptions) -> Action {
        let params = options.params.clone();
        Action::with_query(
            self.clone(),
            path.into(),
            options,
            Arc::new(move || params.clone()),
        )
    }

    /// Creates an action addressing one record of a resource collection.
    ///
    /// Fails eagerly, before any network activity, when the key is empty
    /// or contains a path separator.
    pub fn detail_action(
        &self,
        resource: &str,
        pk: &str,
        options: ActionOptions,
    ) -> ClientResult<Action> {
        if pk.is_empty() {
            return Err(FetchError::Validation(
                "detail key must not be empty".to_string(),
            ));
        }
        if pk.contains('/') {
            return Err(FetchError::Validation(format!(
                "detail key {pk:?} must not contain '/'"
            )));
        }
        let resource = resource.trim_end_matches('/');
        Ok(self.action(format!("{resource}/{pk}/"), options))
    }

    pub(crate) fn registry(&self) -> &DedupRegistry {
        &self.registry
    }
}

// ── Action options ───────────────────────────────────────────────────

/// Per-call-site configuration.
#[derive(Clone, Default)]
pub struct ActionOptions {
    pub method: Option<Method>,
    pub body: Source<Body>,
    pub headers: Source<Vec<(String, String)>>,
    pub params: Vec<(String, String)>,
    pub timeout: Timeout,
    /// Overrides the client's deduplication default when set.
    pub dedup: Option<bool>,
    /// Executes once as soon as the action is created.
    pub immediate: bool,
}

impl ActionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    #[must_use]
    pub fn body(mut self, body: impl Into<Source<Body>>) -> Self {
        self.body = body.into();
        self
    }

    #[must_use]
    pub fn headers(mut self, headers: impl Into<Source<Vec<(String, String)>>>) -> Self {
        self.headers = headers.into();
        self
    }

    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub const fn timeout(mut self, timeout: Timeout) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub const fn dedup(mut self, enabled: bool) -> Self {
        self.dedup = Some(enabled);
        self
    }

    #[must_use]
    pub const fn immediate(mut self) -> Self {
        self.immediate = true;
        self
    }
}

// ── Action ───────────────────────────────────────────────────────────

struct ActionInner {
    client: Client,
    path: String,
    method: Method,
    body: Source<Body>,
    headers: Source<Vec<(String, String)>>,
    timeout: Timeout,
    dedup: Option<bool>,
    query: QueryProvider,
    state: FetchState,
    in_flight: Arc<AtomicUsize>,
}

/// One endpoint bound to one reactive state. Cloning shares both.
#[derive(Clone)]
pub struct Action {
    inner: Arc<ActionInner>,
}

impl Action {
    pub(crate) fn with_query(
        client: Client,
        path: String,
        options: ActionOptions,
        query: QueryProvider,
    ) -> Self {
        let immediate = options.immediate;
        let action = Self {
            inner: Arc::new(ActionInner {
                client,
                path,
                method: options.method.unwrap_or(Method::GET),
                body: options.body,
                headers: options.headers,
                timeout: options.timeout,
                dedup: options.dedup,
                query,
                state: FetchState::new(),
                in_flight: Arc::new(AtomicUsize::new(0)),
            }),
        };
        if immediate {
            let action = action.clone();
            tokio::spawn(async move {
                action.execute().await;
            });
        }
        action
    }

    /// The reactive state this action writes to.
    pub fn state(&self) -> &FetchState {
        &self.inner.state
    }

    pub fn data(&self) -> Option<Value> {
        self.inner.state.data()
    }

    pub fn error(&self) -> Option<FetchError> {
        self.inner.state.error()
    }

    pub fn is_fetching(&self) -> bool {
        self.inner.state.is_fetching()
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::SeqCst)
    }

    pub(crate) fn in_flight_handle(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.inner.in_flight)
    }

    /// Executes and swallows the error into the reactive state, the way
    /// fire-and-forget call sites want it.
    pub async fn execute(&self) -> Option<Value> {
        match self.try_execute().await {
            Ok(data) => data,
            Err(error) => {
                warn!(error = %error, path = %self.inner.path, "request failed");
                None
            }
        }
    }

    /// Executes and returns the outcome. The reactive state is updated
    /// either way.
    pub async fn try_execute(&self) -> ClientResult<Option<Value>> {
        let _guard = InFlightGuard::new(&self.inner.in_flight);
        let state = &self.inner.state;
        state.begin();

        let span = restfetch_core::logging::request_span(
            self.inner.method.as_str(),
            &self.inner.path,
        );
        match self.dispatch().instrument(span).await {
            Ok(data) => {
                state.finish_data(data.clone());
                Ok(data)
            }
            Err(error) => {
                state.finish_error(error.clone());
                Err(error)
            }
        }
    }

    async fn dispatch(&self) -> ClientResult<Option<Value>> {
        let inner = &self.inner;
        let client = &inner.client;
        let settings = client.settings();

        // Reactive inputs are read once per execution.
        let params = (inner.query)();
        let url = build_url(&settings.base_url, &inner.path, &params)?;
        let mut headers = normalize_headers(&inner.headers.resolve());
        client
            .csrf
            .inject(&inner.method, &mut headers, &client.cookies.get());
        let mut request = RequestDescriptor::from_parts(
            inner.method.clone(),
            url,
            headers,
            inner.body.resolve(),
        );

        if let Some(interceptor) = &client.request_interceptor {
            match interceptor.intercept(&request).await {
                RequestIntercept::Continue => {}
                RequestIntercept::Replace(replacement) => {
                    if !replacement.same_request(&request) {
                        debug!(url = %replacement.url, "request replaced by interceptor");
                        request = replacement;
                    }
                }
                RequestIntercept::Abort(reason) => {
                    debug!(url = %request.url, %reason, "request aborted by interceptor");
                    return Err(FetchError::Abort(reason));
                }
            }
        }

        let dedup_enabled = inner.dedup.unwrap_or(settings.dedup_enabled);
        let mut registered: Option<String> = None;
        if dedup_enabled {
            if let Some(key) = dedup_key(&request) {
                if let Some(leader) = client.registry().get_pending(&key) {
                    debug!(%key, "joining in-flight request");
                    inner.state.follow(&leader).await;
                    return match inner.state.error() {
                        Some(error) => Err(error),
                        None => Ok(inner.state.data()),
                    };
                }
                client.registry().register(key.clone(), inner.state.clone());
                registered = Some(key);
            }
        }

        let result = self.send_with_deadline(&request).await;
        if let Some(key) = registered {
            // Deferred so followers arriving this tick still attach.
            client.registry().schedule_removal(key);
        }
        result
    }

    async fn send_with_deadline(&self, request: &RequestDescriptor) -> ClientResult<Option<Value>> {
        let inner = &self.inner;
        let client = &inner.client;

        let deadline = client.timeouts.resolve(inner.timeout, client.settings());
        let mut guard = client.timeouts.arm(deadline);
        let outcome = tokio::select! {
            response = client.transport.send(request) => response,
            () = guard.expired() => {
                debug!(url = %request.url, deadline_ms = ?guard.deadline_ms(), "request timed out");
                Err(guard.timeout_error())
            }
        };
        guard.cleanup();

        let mut response = outcome?;
        inner.state.record_response(response.status, response.clone());

        if let Some(interceptor) = &client.response_interceptor {
            if let ResponseIntercept::Replace(replacement) =
                interceptor.intercept(request, &response).await
            {
                debug!(url = %request.url, "response replaced by interceptor");
                inner.state.record_response(replacement.status, replacement.clone());
                response = replacement;
            }
        }

        if !response.is_success() {
            return Err(FetchError::Network(format!(
                "HTTP {} for {}",
                response.status, request.url
            )));
        }

        if response.body.is_empty() {
            return Ok(None);
        }
        Ok(Some(response.parse()?))
    }
}

struct InFlightGuard(Arc<AtomicUsize>);

impl InFlightGuard {
    fn new(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counter))
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
