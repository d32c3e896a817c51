//! Reactive list queries with debounced auto-refetch.
//!
//! A [`ListAction`] owns reactive cells for filters, ordering, and
//! (optionally) pagination, and serializes them into query parameters on
//! every execution. With auto-update on, mutating any of those cells arms
//! a trailing debounce timer; a burst of mutations collapses into one
//! refetch, a mutation arriving while a refetch runs is remembered and
//! triggers one more afterwards, and the refetch is never reentrant.

use crate::executor::{Action, ActionOptions, Client};
use crate::state::FetchState;
use restfetch_core::{ClientResult, FetchError};
use restfetch_http::{Direction, FilterParams, PaginationParams, SortSpec};
use restfetch_reactive::Reactive;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tracing::debug;

const AUTO_UPDATE_OBSERVER: &str = "auto-update";

// ── Configuration ────────────────────────────────────────────────────

/// Full list configuration.
#[derive(Clone, Default)]
pub struct ListOptions {
    pub filters: FilterParams,
    pub ordering: SortSpec,
    /// Engages pagination parameters when set; `Some(default)` applies
    /// `{page: 1, page_size: 50}`.
    pub pagination: Option<PaginationParams>,
    /// Refetch automatically when filters, ordering, or pagination
    /// change. On by default.
    pub auto_update: Option<bool>,
    /// Overrides the client's debounce window.
    pub debounce_ms: Option<u64>,
    pub action: ActionOptions,
}

/// How a list call site is configured: either just initial filters, or
/// the full options set.
#[derive(Clone)]
pub enum ListConfig {
    Params(FilterParams),
    Options(ListOptions),
}

impl Default for ListConfig {
    fn default() -> Self {
        Self::Options(ListOptions::default())
    }
}

impl From<FilterParams> for ListConfig {
    fn from(filters: FilterParams) -> Self {
        Self::Params(filters)
    }
}

impl From<ListOptions> for ListConfig {
    fn from(options: ListOptions) -> Self {
        Self::Options(options)
    }
}

impl ListConfig {
    fn into_options(self) -> ListOptions {
        match self {
            Self::Params(filters) => ListOptions {
                filters,
                ..ListOptions::default()
            },
            Self::Options(options) => options,
        }
    }
}

// ── Debounce state machine ───────────────────────────────────────────

// Idle → Debouncing (timer armed) → Executing → Idle. Each mutation
// bumps the generation, so an older timer that fires finds itself stale
// and does nothing. A mutation during execution only sets the pending
// flag; the execution's tail turns that flag into one more debounce
// round. A timer firing while a consumer-initiated request is in flight
// defers the same way, so requests from one call site never overlap.
#[derive(Default)]
struct Debounce {
    generation: u64,
    executing: bool,
    pending: bool,
}

// ── ListAction ───────────────────────────────────────────────────────

pub(crate) struct ListInner {
    action: Action,
    filters: Reactive<FilterParams>,
    ordering: Reactive<SortSpec>,
    pagination: Option<Reactive<PaginationParams>>,
    requested_page: Arc<AtomicU64>,
    max_page_size: u64,
    debounce_ms: u64,
    debounce: Mutex<Debounce>,
}

/// A list call site bound to reactive query inputs.
#[derive(Clone)]
pub struct ListAction {
    inner: Arc<ListInner>,
}

impl Client {
    /// Creates a list action for a collection endpoint.
    ///
    /// Fails synchronously when the initial pagination values are out of
    /// range; pagination set reactively later surfaces through the error
    /// cell instead.
    pub fn list_action(
        &self,
        path: impl Into<String>,
        config: ListConfig,
    ) -> ClientResult<ListAction> {
        ListAction::new(self.clone(), path.into(), config)
    }
}

impl ListAction {
    pub(crate) fn new(client: Client, path: String, config: ListConfig) -> ClientResult<Self> {
        let options = config.into_options();
        let auto_update = options.auto_update.unwrap_or(true);
        let debounce_ms = options
            .debounce_ms
            .unwrap_or(client.settings().auto_update_debounce_ms);
        let max_page_size = client.settings().max_page_size;
        if let Some(pagination) = &options.pagination {
            pagination.validate(max_page_size)?;
        }

        let filters = Reactive::new(options.filters);
        let ordering = Reactive::new(options.ordering);
        let pagination = options.pagination.map(Reactive::new);
        let requested_page = Arc::new(AtomicU64::new(
            pagination.as_ref().map_or(0, |cell| cell.get().page),
        ));

        // The query provider re-reads every cell on each execution.
        // Static params from the embedded action options come first,
        // ahead of the reactive inputs.
        let query = {
            let static_params = options.action.params.clone();
            let filters = filters.clone();
            let ordering = ordering.clone();
            let pagination = pagination.clone();
            Arc::new(move || {
                let mut pairs = static_params.clone();
                pairs.extend(filters.get().to_query_pairs());
                if let Some(ordering) = ordering.get().serialize() {
                    pairs.push(("ordering".to_string(), ordering));
                }
                if let Some(cell) = &pagination {
                    pairs.extend(cell.get().to_query_pairs());
                }
                pairs
            })
        };

        let immediate = options.action.immediate;
        let action = Action::with_query(
            client,
            path,
            ActionOptions {
                immediate: false,
                ..options.action
            },
            query,
        );

        let inner = Arc::new(ListInner {
            action,
            filters,
            ordering,
            pagination,
            requested_page,
            max_page_size,
            debounce_ms,
            debounce: Mutex::new(Debounce::default()),
        });
        if auto_update {
            Self::connect_auto_update(&inner);
        }
        let list = Self { inner };
        if immediate {
            let list = list.clone();
            tokio::spawn(async move {
                list.inner.run().await;
                ListInner::drain_pending(&list.inner);
            });
        }
        Ok(list)
    }

    fn connect_auto_update(inner: &Arc<ListInner>) {
        let weak = Arc::downgrade(inner);
        inner.filters.subscribe(AUTO_UPDATE_OBSERVER, {
            let weak = Weak::clone(&weak);
            Arc::new(move |_: &FilterParams| ListInner::schedule(&weak))
        });
        inner.ordering.subscribe(AUTO_UPDATE_OBSERVER, {
            let weak = Weak::clone(&weak);
            Arc::new(move |_: &SortSpec| ListInner::schedule(&weak))
        });
        if let Some(cell) = &inner.pagination {
            cell.subscribe(AUTO_UPDATE_OBSERVER, {
                let weak = Weak::clone(&weak);
                Arc::new(move |_: &PaginationParams| ListInner::schedule(&weak))
            });
        }
    }

    // ── Query input cells ────────────────────────────────────────────

    pub fn filters(&self) -> Reactive<FilterParams> {
        self.inner.filters.clone()
    }

    pub fn ordering(&self) -> Reactive<SortSpec> {
        self.inner.ordering.clone()
    }

    pub fn pagination(&self) -> Option<Reactive<PaginationParams>> {
        self.inner.pagination.clone()
    }

    /// Sets one filter, triggering auto-update if enabled.
    pub fn set_filter(
        &self,
        key: impl Into<String>,
        value: impl Into<restfetch_http::FilterValue>,
    ) {
        let key = key.into();
        let value = value.into();
        self.inner.filters.update(|filters| filters.set(key, value));
    }

    pub fn remove_filter(&self, key: &str) {
        let key = key.to_string();
        self.inner.filters.update(|filters| {
            filters.remove(&key);
        });
    }

    /// Applies one ordering entry under the configured ordering mode.
    pub fn order_by(&self, field: impl Into<String>, direction: Direction) {
        let field = field.into();
        self.inner
            .ordering
            .update(|ordering| ordering.set(field, direction));
    }

    /// Moves to a page. Ignored for lists configured without pagination.
    pub fn set_page(&self, page: u64) {
        if let Some(cell) = &self.inner.pagination {
            cell.update(|pagination| pagination.page = page);
        }
    }

    /// Changes the page size. Ignored for lists without pagination.
    pub fn set_page_size(&self, page_size: u64) {
        if let Some(cell) = &self.inner.pagination {
            cell.update(|pagination| pagination.page_size = page_size);
        }
    }

    // ── Execution ────────────────────────────────────────────────────

    pub fn state(&self) -> &FetchState {
        self.inner.action.state()
    }

    pub fn data(&self) -> Option<Value> {
        self.inner.action.data()
    }

    pub fn error(&self) -> Option<FetchError> {
        self.inner.action.error()
    }

    pub fn is_fetching(&self) -> bool {
        self.inner.action.is_fetching()
    }

    pub async fn execute(&self) -> Option<Value> {
        match self.try_execute().await {
            Ok(data) => data,
            Err(_) => None,
        }
    }

    pub async fn try_execute(&self) -> ClientResult<Option<Value>> {
        if let Err(error) = self.inner.prepare() {
            let state = self.inner.action.state();
            state.begin();
            state.finish_error(error.clone());
            return Err(error);
        }
        let result = self.inner.action.try_execute().await;
        ListInner::drain_pending(&self.inner);
        result
    }

    pub(crate) fn action(&self) -> &Action {
        &self.inner.action
    }

    pub(crate) fn requested_page_handle(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.inner.requested_page)
    }
}

impl ListInner {
    /// Validates pagination and records the requested page.
    fn prepare(&self) -> ClientResult<()> {
        if let Some(cell) = &self.pagination {
            let pagination = cell.get();
            pagination.validate(self.max_page_size)?;
            self.requested_page.store(pagination.page, Ordering::SeqCst);
        }
        Ok(())
    }

    async fn run(&self) {
        match self.prepare() {
            Ok(()) => {
                self.action.execute().await;
            }
            Err(error) => {
                let state = self.action.state();
                state.begin();
                state.finish_error(error);
            }
        }
    }

    /// A query input changed: restart the debounce timer, or flag the
    /// change if a refetch is already running.
    fn schedule(weak: &Weak<Self>) {
        let Some(inner) = weak.upgrade() else {
            return;
        };
        let generation = {
            let mut debounce = inner.debounce.lock().expect("debounce lock poisoned");
            if debounce.executing {
                debounce.pending = true;
                return;
            }
            debounce.generation += 1;
            debounce.generation
        };
        let weak = Weak::clone(weak);
        let delay = Duration::from_millis(inner.debounce_ms);
        drop(inner);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            ListInner::fire(&weak, generation).await;
        });
    }

    async fn fire(weak: &Weak<Self>, generation: u64) {
        let Some(inner) = weak.upgrade() else {
            return;
        };
        {
            let mut debounce = inner.debounce.lock().expect("debounce lock poisoned");
            // A newer mutation restarted the window, or a refetch is
            // already running; this timer is stale either way.
            if debounce.generation != generation || debounce.executing {
                return;
            }
            // A consumer-initiated execution is still in flight; remember
            // the change and let its completion reschedule.
            if inner.action.in_flight() > 0 {
                debounce.pending = true;
                return;
            }
            debounce.executing = true;
            debounce.pending = false;
        }
        debug!(generation, "auto-update refetch");
        inner.run().await;
        let rerun = {
            let mut debounce = inner.debounce.lock().expect("debounce lock poisoned");
            debounce.executing = false;
            std::mem::take(&mut debounce.pending)
        };
        if rerun {
            ListInner::schedule(weak);
        }
    }

    /// A timer that fired during a consumer-initiated execution left its
    /// change in the pending flag; turn it into one more debounce round
    /// now that the request is done.
    fn drain_pending(inner: &Arc<Self>) {
        let rerun = {
            let mut debounce = inner.debounce.lock().expect("debounce lock poisoned");
            if debounce.executing {
                return;
            }
            std::mem::take(&mut debounce.pending)
        };
        if rerun {
            Self::schedule(&Arc::downgrade(inner));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockTransport;
    use crate::timeout::Timeout;
    use http::Method;
    use restfetch_core::ClientSettings;
    use restfetch_http::{FilterValue, OrderingMode};
    use serde_json::json;

    fn client(transport: MockTransport) -> Client {
        Client::new(ClientSettings::new("https://api.test"), Arc::new(transport))
    }

    fn quiet_options() -> ListOptions {
        ListOptions {
            auto_update: Some(false),
            ..ListOptions::default()
        }
    }

    fn sent_query(transport: &MockTransport, index: usize) -> String {
        let url = transport.requests()[index].url.clone();
        url.split_once('?').map(|(_, q)| q.to_string()).unwrap_or_default()
    }

    #[tokio::test]
    async fn test_filters_serialize_into_query() {
        let transport = MockTransport::new();
        transport.push_json(200, json!([]));
        let list = client(transport.clone()).list_action(
            "items/",
            ListConfig::Options(ListOptions {
                filters: {
                    let mut filters = FilterParams::new();
                    filters.set("status", "active");
                    filters.set("archived", FilterValue::Null);
                    filters
                },
                ..quiet_options()
            }),
        )
        .unwrap();
        list.try_execute().await.unwrap();
        let query = sent_query(&transport, 0);
        assert!(query.contains("status=active"));
        assert!(query.contains("archived=null"));
    }

    #[tokio::test]
    async fn test_ordering_serializes_with_direction_prefix() {
        let transport = MockTransport::new();
        transport.push_json(200, json!([]));
        let list = client(transport.clone()).list_action(
            "items/",
            ListConfig::Options(ListOptions {
                ordering: SortSpec::new(OrderingMode::Multi),
                ..quiet_options()
            }),
        )
        .unwrap();
        list.order_by("name", Direction::Asc);
        list.order_by("created", Direction::Desc);
        list.try_execute().await.unwrap();
        assert!(sent_query(&transport, 0).contains("ordering=name%2C-created"));
    }

    #[tokio::test]
    async fn test_pagination_defaults_applied_when_engaged() {
        let transport = MockTransport::new();
        transport.push_json(200, json!([]));
        let list = client(transport.clone()).list_action(
            "items/",
            ListConfig::Options(ListOptions {
                pagination: Some(PaginationParams::default()),
                ..quiet_options()
            }),
        )
        .unwrap();
        list.try_execute().await.unwrap();
        let query = sent_query(&transport, 0);
        assert!(query.contains("page=1"));
        assert!(query.contains("page_size=50"));
    }

    #[tokio::test]
    async fn test_no_pagination_params_when_not_engaged() {
        let transport = MockTransport::new();
        transport.push_json(200, json!([]));
        let list = client(transport.clone())
            .list_action("items/", ListConfig::Options(quiet_options()))
            .unwrap();
        list.try_execute().await.unwrap();
        assert!(!sent_query(&transport, 0).contains("page"));
    }

    #[tokio::test]
    async fn test_invalid_pagination_fails_before_network() {
        let transport = MockTransport::new();
        let list = client(transport.clone()).list_action(
            "items/",
            ListConfig::Options(ListOptions {
                pagination: Some(PaginationParams {
                    page: 0,
                    page_size: 50,
                }),
                ..quiet_options()
            }),
        );
        assert!(matches!(list, Err(FetchError::Validation(_))));
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_reactive_invalid_page_surfaces_through_error_cell() {
        let transport = MockTransport::new();
        let list = client(transport.clone())
            .list_action(
                "items/",
                ListConfig::Options(ListOptions {
                    pagination: Some(PaginationParams::default()),
                    ..quiet_options()
                }),
            )
            .unwrap();
        list.set_page(0);
        let error = list.try_execute().await.unwrap_err();
        assert!(matches!(error, FetchError::Validation(_)));
        assert!(matches!(list.error(), Some(FetchError::Validation(_))));
        assert_eq!(transport.call_count(), 0);
        assert!(!list.is_fetching());
    }

    #[tokio::test]
    async fn test_mutation_burst_collapses_to_one_refetch() {
        let transport = MockTransport::new();
        transport.push_json(200, json!([1]));
        let client = Client::new(
            ClientSettings::new("https://api.test").with_debounce_ms(20),
            Arc::new(transport.clone()),
        );
        let list = client
            .list_action("items/", ListConfig::default())
            .unwrap();

        list.set_filter("a", 1i64);
        list.set_filter("b", 2i64);
        list.set_filter("c", 3i64);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(transport.call_count(), 1);
        // The one refetch sees the final input state.
        let query = sent_query(&transport, 0);
        assert!(query.contains("a=1") && query.contains("b=2") && query.contains("c=3"));
    }

    #[tokio::test]
    async fn test_each_mutation_restarts_the_window() {
        let transport = MockTransport::new();
        transport.push_json(200, json!([]));
        let client = Client::new(
            ClientSettings::new("https://api.test").with_debounce_ms(40),
            Arc::new(transport.clone()),
        );
        let list = client
            .list_action("items/", ListConfig::default())
            .unwrap();

        list.set_filter("a", 1i64);
        tokio::time::sleep(Duration::from_millis(25)).await;
        assert_eq!(transport.call_count(), 0);
        list.set_filter("a", 2i64);
        tokio::time::sleep(Duration::from_millis(25)).await;
        // The second mutation restarted the 40 ms window.
        assert_eq!(transport.call_count(), 0);
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_mutation_during_refetch_triggers_one_more() {
        let transport = MockTransport::new();
        transport.push_delayed_json(200, json!([]), Duration::from_millis(60));
        transport.push_json(200, json!([]));
        let client = Client::new(
            ClientSettings::new("https://api.test").with_debounce_ms(10),
            Arc::new(transport.clone()),
        );
        let list = client
            .list_action("items/", ListConfig::default())
            .unwrap();

        list.set_filter("a", 1i64);
        tokio::time::sleep(Duration::from_millis(30)).await;
        // First refetch is in flight; this mutation must not be dropped.
        list.set_filter("a", 2i64);
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(transport.call_count(), 2);
        assert!(sent_query(&transport, 1).contains("a=2"));
    }

    #[tokio::test]
    async fn test_timer_defers_to_in_flight_manual_execution() {
        let transport = MockTransport::new();
        transport.push_delayed_json(200, json!([]), Duration::from_millis(120));
        transport.push_json(200, json!([]));
        let client = Client::new(
            ClientSettings::new("https://api.test").with_debounce_ms(10),
            Arc::new(transport.clone()),
        );
        let list = client
            .list_action("items/", ListConfig::default())
            .unwrap();

        let manual = {
            let list = list.clone();
            tokio::spawn(async move { list.try_execute().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        list.set_filter("a", 1i64);
        tokio::time::sleep(Duration::from_millis(40)).await;
        // The timer fired, but the manual request is still running; the
        // refetch must wait instead of overlapping it.
        assert_eq!(transport.call_count(), 1);

        manual.await.unwrap().unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(transport.call_count(), 2);
        assert!(sent_query(&transport, 1).contains("a=1"));
    }

    #[tokio::test]
    async fn test_static_action_params_reach_the_query() {
        let transport = MockTransport::new();
        transport.push_json(200, json!([]));
        let list = client(transport.clone()).list_action(
            "items/",
            ListConfig::Options(ListOptions {
                filters: {
                    let mut filters = FilterParams::new();
                    filters.set("status", "active");
                    filters
                },
                action: ActionOptions::new().param("format", "json"),
                ..quiet_options()
            }),
        )
        .unwrap();
        list.try_execute().await.unwrap();
        let query = sent_query(&transport, 0);
        assert!(query.contains("format=json"));
        assert!(query.contains("status=active"));
    }

    #[tokio::test]
    async fn test_auto_update_disabled_never_refetches() {
        let transport = MockTransport::new();
        let list = client(transport.clone())
            .list_action("items/", ListConfig::Options(quiet_options()))
            .unwrap();
        list.set_filter("a", 1i64);
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_params_config_defaults_to_auto_update() {
        let transport = MockTransport::new();
        transport.push_json(200, json!([]));
        let client = Client::new(
            ClientSettings::new("https://api.test").with_debounce_ms(10),
            Arc::new(transport.clone()),
        );
        let mut filters = FilterParams::new();
        filters.set("kind", "x");
        let list = client
            .list_action("items/", ListConfig::Params(filters))
            .unwrap();

        list.set_filter("kind", "y");
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(transport.call_count(), 1);
        assert!(sent_query(&transport, 0).contains("kind=y"));
        drop(list);
    }

    #[tokio::test]
    async fn test_action_options_flow_through() {
        let transport = MockTransport::new();
        transport.push_json(200, json!([]));
        let list = client(transport.clone()).list_action(
            "search/",
            ListConfig::Options(ListOptions {
                action: ActionOptions::new()
                    .method(Method::POST)
                    .timeout(Timeout::After(5_000)),
                ..quiet_options()
            }),
        )
        .unwrap();
        list.try_execute().await.unwrap();
        assert_eq!(transport.requests()[0].method, Method::POST);
    }
}
