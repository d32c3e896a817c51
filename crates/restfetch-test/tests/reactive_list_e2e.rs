//! End-to-end reactive list tests for restfetch.
//!
//! These tests exercise the COMPLETE path:
//!   reactive filters/ordering/pagination -> query serialization ->
//!   debounced auto-refetch -> transport -> envelope normalization ->
//!   page reconciliation

use std::sync::Arc;
use std::time::Duration;

use restfetch_client::{ListConfig, ListOptions};
use restfetch_core::{ClientSettings, FetchError};
use restfetch_http::{
    Direction, FilterParams, FilterValue, OrderBy, OrderingMode, PaginationMeta,
    PaginationParams, SortSpec,
};
use restfetch_test::{MockTransport, TestApi};
use serde_json::json;

fn quiet() -> ListConfig {
    ListConfig::Options(ListOptions {
        auto_update: Some(false),
        ..ListOptions::default()
    })
}

fn debounced_api(debounce_ms: u64) -> TestApi {
    TestApi::with_settings(ClientSettings::new("https://api.test").with_debounce_ms(debounce_ms))
}

fn query(transport: &MockTransport, index: usize) -> String {
    let url = transport.requests()[index].url.clone();
    url.split_once('?')
        .map(|(_, q)| q.to_string())
        .unwrap_or_default()
}

// ============================================================================
// Query-string contract
// ============================================================================

/// 1. Filters serialize as `key=value`; null sends the literal string,
/// removed keys are omitted.
#[tokio::test]
async fn test_filter_serialization_contract() {
    let api = TestApi::new();
    api.transport.push_json(200, json!([]));

    let list = api.client.list_action("items/", quiet()).unwrap();
    list.set_filter("status", "active");
    list.set_filter("archived", FilterValue::Null);
    list.set_filter("temp", 1i64);
    list.remove_filter("temp");
    list.try_execute().await.unwrap();

    let sent = query(&api.transport, 0);
    assert!(sent.contains("status=active"));
    assert!(sent.contains("archived=null"));
    assert!(!sent.contains("temp"));
}

/// 2. Ordering serializes to `ordering=a,-c`: descending gets a `-`
/// prefix, `none` entries are dropped, remaining order is preserved.
#[tokio::test]
async fn test_ordering_drops_none_and_preserves_order() {
    let api = TestApi::new();
    api.transport.push_json(200, json!([]));

    let ordering = SortSpec::from_entries(
        OrderingMode::Multi,
        vec![
            OrderBy::new("a", Direction::Asc),
            OrderBy::new("b", Direction::None),
            OrderBy::new("c", Direction::Desc),
        ],
    );
    let list = api
        .client
        .list_action(
            "items/",
            ListConfig::Options(ListOptions {
                ordering,
                auto_update: Some(false),
                ..ListOptions::default()
            }),
        )
        .unwrap();
    list.try_execute().await.unwrap();

    // The comma is percent-encoded in the final URL.
    assert!(query(&api.transport, 0).contains("ordering=a%2C-c"));
}

/// 3. Single ordering mode replaces the whole sequence on each set.
#[tokio::test]
async fn test_single_ordering_mode_replaces() {
    let api = TestApi::new();
    api.transport.push_json(200, json!([]));

    let list = api.client.list_action("items/", quiet()).unwrap();
    list.order_by("name", Direction::Asc);
    list.order_by("created", Direction::Desc);
    list.try_execute().await.unwrap();

    let sent = query(&api.transport, 0);
    assert!(sent.contains("ordering=-created"));
    assert!(!sent.contains("name"));
}

/// 4. Engaging pagination with no explicit values applies the
/// `{page: 1, page_size: 50}` defaults.
#[tokio::test]
async fn test_pagination_defaults() {
    let api = TestApi::new();
    api.transport.push_json(200, json!([]));

    let list = api
        .client
        .list_action(
            "items/",
            ListConfig::Options(ListOptions {
                pagination: Some(PaginationParams::default()),
                auto_update: Some(false),
                ..ListOptions::default()
            }),
        )
        .unwrap();
    list.try_execute().await.unwrap();

    let sent = query(&api.transport, 0);
    assert!(sent.contains("page=1"));
    assert!(sent.contains("page_size=50"));
}

/// 5. A page size over the configured maximum fails construction.
#[tokio::test]
async fn test_oversized_page_size_rejected_at_construction() {
    let api = TestApi::with_settings(
        ClientSettings::new("https://api.test").with_max_page_size(100),
    );
    let result = api.client.list_action(
        "items/",
        ListConfig::Options(ListOptions {
            pagination: Some(PaginationParams {
                page: 1,
                page_size: 1_000,
            }),
            ..ListOptions::default()
        }),
    );
    assert!(matches!(result, Err(FetchError::Validation(_))));
}

// ============================================================================
// Debounced auto-refetch
// ============================================================================

/// 6. A burst of filter mutations collapses into one trailing refetch
/// that sees the final state.
#[tokio::test]
async fn test_burst_collapses_to_one_trailing_refetch() {
    let api = debounced_api(20);
    api.transport.push_json(200, json!([]));

    let mut filters = FilterParams::new();
    filters.set("seed", 0i64);
    let list = api
        .client
        .list_action("items/", ListConfig::Params(filters))
        .unwrap();

    for i in 1..=5i64 {
        list.set_filter("seed", i);
    }
    tokio::time::sleep(Duration::from_millis(120)).await;

    assert_eq!(api.transport.call_count(), 1);
    assert!(query(&api.transport, 0).contains("seed=5"));
}

/// 7. A mutation landing while the refetch is in flight is not dropped:
/// exactly one follow-up refetch runs.
#[tokio::test]
async fn test_mutation_during_refetch_is_not_dropped() {
    let api = debounced_api(10);
    api.transport
        .push_delayed_json(200, json!([]), Duration::from_millis(60));
    api.transport.push_json(200, json!([]));

    let list = api
        .client
        .list_action("items/", ListConfig::default())
        .unwrap();
    list.set_filter("q", "first");
    tokio::time::sleep(Duration::from_millis(30)).await;
    list.set_filter("q", "second");
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(api.transport.call_count(), 2);
    assert!(query(&api.transport, 1).contains("q=second"));
}

/// 8. Pagination mutations also drive auto-refetch.
#[tokio::test]
async fn test_page_change_triggers_refetch() {
    let api = debounced_api(10);
    api.transport.push_json(200, json!([]));

    let list = api
        .client
        .list_action(
            "items/",
            ListConfig::Options(ListOptions {
                pagination: Some(PaginationParams::default()),
                ..ListOptions::default()
            }),
        )
        .unwrap();
    list.set_page(3);
    tokio::time::sleep(Duration::from_millis(60)).await;

    assert_eq!(api.transport.call_count(), 1);
    assert!(query(&api.transport, 0).contains("page=3"));
}

/// 9. With auto-update off, mutations never touch the network.
#[tokio::test]
async fn test_disabled_auto_update_is_silent() {
    let api = debounced_api(10);
    let list = api.client.list_action("items/", quiet()).unwrap();
    list.set_filter("q", "x");
    list.order_by("name", Direction::Asc);
    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(api.transport.call_count(), 0);
}

// ============================================================================
// Pagination envelopes
// ============================================================================

/// 10. The standard envelope is split into records and metadata.
#[tokio::test]
async fn test_envelope_normalization() {
    let api = TestApi::new();
    api.transport.push_json(
        200,
        json!({"results": [{"id": 1}], "count": 1, "pages": 1, "page": 1}),
    );

    let paginated = api
        .client
        .paginated_list_action("items/", quiet())
        .unwrap();
    let records = paginated.try_execute().await.unwrap();

    assert_eq!(records, vec![json!({"id": 1})]);
    assert_eq!(
        paginated.meta(),
        Some(PaginationMeta {
            count: 1,
            pages: 1,
            page: 1
        })
    );
    assert!(!paginated.is_fetching());
}

/// 11. A missing data key raises a normalization error naming the keys
/// that were present, through the error cell.
#[tokio::test]
async fn test_missing_data_key_error_names_available_keys() {
    let api = TestApi::new();
    api.transport
        .push_json(200, json!({"data": [], "total": 10}));

    let paginated = api
        .client
        .paginated_list_action("items/", quiet())
        .unwrap();
    let error = paginated.try_execute().await.unwrap_err();

    match &error {
        FetchError::Normalization(message) => {
            assert!(message.contains("data"));
            assert!(message.contains("total"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(matches!(
        paginated.error(),
        Some(FetchError::Normalization(_))
    ));
}

/// 12. The data key override reads a different envelope member.
#[tokio::test]
async fn test_data_key_override() {
    let api = TestApi::new();
    api.transport
        .push_json(200, json!({"records": [1, 2, 3], "count": 3}));

    let paginated = api
        .client
        .paginated_list_action_keyed("items/", quiet(), "records")
        .unwrap();
    let records = paginated.try_execute().await.unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(paginated.meta().unwrap().count, 3);
}

/// 13. Race rule: a slow page-1 response must not overwrite a newer
/// navigation to page 2.
#[tokio::test]
async fn test_slow_stale_page_does_not_win() {
    let api = TestApi::new();
    api.transport.push_delayed_json(
        200,
        json!({"results": [{"p": 1}], "count": 100, "pages": 50, "page": 1}),
        Duration::from_millis(80),
    );
    api.transport.push_json(
        200,
        json!({"results": [{"p": 2}], "count": 100, "pages": 50, "page": 2}),
    );

    let paginated = api
        .client
        .paginated_list_action("items/", quiet())
        .unwrap();
    let slow = {
        let paginated = paginated.clone();
        tokio::spawn(async move { paginated.try_execute().await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    paginated.set_page(2);
    paginated.try_execute().await.unwrap();
    slow.await.unwrap().unwrap();

    let pagination = paginated.list().pagination().unwrap();
    assert_eq!(pagination.get().page, 2);
}

/// 14. The page cursor and envelope flow together through auto-update:
/// navigating pages refetches and renormalizes.
#[tokio::test]
async fn test_auto_update_renormalizes_envelope() {
    let api = debounced_api(10);
    api.transport.push_json(
        200,
        json!({"results": [{"id": 10}], "count": 2, "pages": 2, "page": 2}),
    );

    let paginated = api
        .client
        .paginated_list_action("items/", ListConfig::default())
        .unwrap();
    paginated.set_page(2);
    tokio::time::sleep(Duration::from_millis(80)).await;

    assert_eq!(api.transport.call_count(), 1);
    assert!(query(&api.transport, 0).contains("page=2"));
    assert_eq!(paginated.items(), vec![json!({"id": 10})]);
    assert_eq!(paginated.meta().unwrap().page, 2);
}

/// 15. Observers on the item cell see normalized updates.
#[tokio::test]
async fn test_items_cell_is_observable() {
    let api = TestApi::new();
    api.transport
        .push_json(200, json!({"results": [{"id": 1}], "count": 1}));

    let paginated = api
        .client
        .paginated_list_action("items/", quiet())
        .unwrap();
    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    paginated.items_cell().subscribe("watcher", {
        let seen = Arc::clone(&seen);
        Arc::new(move |items: &Vec<serde_json::Value>| {
            seen.lock().unwrap().push(items.len());
        })
    });

    paginated.try_execute().await.unwrap();
    assert_eq!(*seen.lock().unwrap(), vec![1]);
}
