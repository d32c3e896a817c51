//! Envelope normalization for paginated list responses.
//!
//! A [`PaginatedListAction`] wraps a [`ListAction`] whose responses carry
//! a pagination envelope: the record array under a configurable key
//! (default `results`) next to `count`, `pages`, and `page`. Every
//! response is normalized into an item list and [`PaginationMeta`], and
//! the reactive page number is reconciled with the server-reported page
//! under a race rule that keeps a stale response from undoing a newer
//! page navigation.

use crate::executor::Client;
use crate::list::{ListAction, ListConfig, ListOptions};
use restfetch_core::{ClientResult, FetchError};
use restfetch_http::{PaginationMeta, PaginationParams};
use restfetch_reactive::Reactive;
use serde_json::Value;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::debug;

/// The envelope key holding the record array unless overridden.
pub const DEFAULT_DATA_KEY: &str = "results";

const NORMALIZE_OBSERVER: &str = "paginate-normalize";

/// A list call site over a pagination envelope.
#[derive(Clone)]
pub struct PaginatedListAction {
    list: ListAction,
    items: Reactive<Vec<Value>>,
    meta: Reactive<Option<PaginationMeta>>,
}

impl Client {
    /// Creates a paginated list action with the default `results` data
    /// key. Pagination parameters are engaged even when the config
    /// leaves them out.
    pub fn paginated_list_action(
        &self,
        path: impl Into<String>,
        config: ListConfig,
    ) -> ClientResult<PaginatedListAction> {
        self.paginated_list_action_keyed(path, config, DEFAULT_DATA_KEY)
    }

    /// Same, with an explicit envelope data key.
    pub fn paginated_list_action_keyed(
        &self,
        path: impl Into<String>,
        config: ListConfig,
        data_key: impl Into<String>,
    ) -> ClientResult<PaginatedListAction> {
        PaginatedListAction::new(self.clone(), path.into(), config, data_key.into())
    }
}

impl PaginatedListAction {
    fn new(
        client: Client,
        path: String,
        config: ListConfig,
        data_key: String,
    ) -> ClientResult<Self> {
        let mut options = match config {
            ListConfig::Params(filters) => ListOptions {
                filters,
                ..ListOptions::default()
            },
            ListConfig::Options(options) => options,
        };
        if options.pagination.is_none() {
            options.pagination = Some(PaginationParams::default());
        }

        let list = ListAction::new(client, path, ListConfig::Options(options))?;
        let items = Reactive::new(Vec::new());
        let meta = Reactive::new(None);

        // Normalization runs as a consumer of the data cell, so both
        // direct executes and debounced auto-refetches go through it.
        // The closure must not capture the state itself, only sibling
        // cells, or the data cell would keep itself alive.
        let observer = {
            let items = items.clone();
            let meta = meta.clone();
            let error_cell = list.state().error_cell();
            let pagination = list
                .pagination()
                .unwrap_or_else(|| Reactive::new(PaginationParams::default()));
            let requested_page = list.requested_page_handle();
            let in_flight = list.action().in_flight_handle();
            let data_key = Arc::<str>::from(data_key);
            move |data: &Option<Value>| {
                let Some(value) = data else {
                    items.set(Vec::new());
                    meta.set(None);
                    return;
                };
                let requested = requested_page.load(Ordering::SeqCst);
                match normalize_envelope(value, &data_key, requested) {
                    Ok((records, envelope_meta)) => {
                        items.set(records);
                        // Race rule: while any request is in flight the
                        // reported page is only accepted when it matches
                        // the most recently requested one, so a stale
                        // response never undoes a newer navigation.
                        let accept_page = in_flight.load(Ordering::SeqCst) == 0
                            || envelope_meta.page == requested;
                        if accept_page {
                            let current = pagination.get();
                            if current.page != envelope_meta.page {
                                debug!(
                                    reported = envelope_meta.page,
                                    requested, "page reconciled to server-reported value"
                                );
                                pagination
                                    .update(|pagination| pagination.page = envelope_meta.page);
                            }
                        }
                        meta.set(Some(envelope_meta));
                    }
                    Err(error) => {
                        error_cell.set(Some(error));
                    }
                }
            }
        };
        list.state()
            .data_cell()
            .subscribe(NORMALIZE_OBSERVER, Arc::new(observer));

        Ok(Self { list, items, meta })
    }

    /// The wrapped list action, for filter/ordering/pagination access.
    pub fn list(&self) -> &ListAction {
        &self.list
    }

    /// The normalized records from the last successful response.
    pub fn items(&self) -> Vec<Value> {
        self.items.get()
    }

    /// The record cell, for subscribing to item changes.
    pub fn items_cell(&self) -> Reactive<Vec<Value>> {
        self.items.clone()
    }

    /// Metadata from the last successful response.
    pub fn meta(&self) -> Option<PaginationMeta> {
        self.meta.get()
    }

    pub fn error(&self) -> Option<FetchError> {
        self.list.error()
    }

    pub fn is_fetching(&self) -> bool {
        self.list.is_fetching()
    }

    pub fn set_page(&self, page: u64) {
        self.list.set_page(page);
    }

    pub fn set_page_size(&self, page_size: u64) {
        self.list.set_page_size(page_size);
    }

    /// Executes and returns the normalized records.
    pub async fn try_execute(&self) -> ClientResult<Vec<Value>> {
        self.list.try_execute().await?;
        // Normalization failures land in the error cell after the
        // execution itself succeeded.
        if let Some(error @ FetchError::Normalization(_)) = self.list.error() {
            return Err(error);
        }
        Ok(self.items.get())
    }

    /// Executes, swallowing errors into the reactive state.
    pub async fn execute(&self) -> Vec<Value> {
        match self.try_execute().await {
            Ok(records) => records,
            Err(_) => Vec::new(),
        }
    }
}

/// Splits an envelope object into its record array and metadata.
fn normalize_envelope(
    value: &Value,
    data_key: &str,
    requested_page: u64,
) -> ClientResult<(Vec<Value>, PaginationMeta)> {
    let Some(envelope) = value.as_object() else {
        return Err(FetchError::Normalization(format!(
            "expected a pagination envelope object, got {}",
            value_kind(value)
        )));
    };
    let records = match envelope.get(data_key) {
        Some(Value::Array(records)) => records.clone(),
        Some(other) => {
            return Err(FetchError::Normalization(format!(
                "key {data_key:?} holds {}, not an array; available keys: [{}]",
                value_kind(other),
                available_keys(envelope)
            )));
        }
        None => {
            return Err(FetchError::Normalization(format!(
                "key {data_key:?} missing from envelope; available keys: [{}]",
                available_keys(envelope)
            )));
        }
    };

    let count = envelope
        .get("count")
        .and_then(Value::as_u64)
        .unwrap_or(records.len() as u64);
    let pages = envelope.get("pages").and_then(Value::as_u64).unwrap_or(1);
    let page = envelope
        .get("page")
        .and_then(Value::as_u64)
        .unwrap_or(requested_page);

    Ok((records, PaginationMeta { count, pages, page }))
}

fn available_keys(envelope: &serde_json::Map<String, Value>) -> String {
    envelope
        .keys()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
