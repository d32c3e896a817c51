//! # restfetch
//!
//! A reactive REST data-access client for Rust.
//!
//! This is the meta-crate that re-exports all sub-crates for convenient
//! access. You can depend on `restfetch` to get the whole stack, or
//! depend on individual crates for finer-grained control.

/// Settings, error types, and logging setup.
pub use restfetch_core as core;

/// Reactive value cells and static-or-reactive sources.
pub use restfetch_reactive as reactive;

/// HTTP vocabulary: requests, responses, URLs, queries, cookies, CSRF.
pub use restfetch_http as http;

/// The request engine: client, actions, dedup, interceptors, timeouts,
/// and reactive list queries.
#[cfg(feature = "client")]
pub use restfetch_client as client;

/// Testing utilities: scripted transport and client harness.
#[cfg(feature = "testing")]
pub use restfetch_test as test;

/// Re-exports of third-party crates used across the public API.
pub use async_trait;
pub use serde;
pub use serde_json;
pub use tokio;
pub use tracing;

/// The most commonly used types, importable in one line.
pub mod prelude {
    pub use restfetch_core::{ClientResult, ClientSettings, CsrfSettings, FetchError};
    pub use restfetch_http::{
        Body, Direction, FilterParams, FilterValue, Method, OrderingMode, PaginationMeta,
        PaginationParams, RequestDescriptor, Response, SortSpec,
    };
    pub use restfetch_reactive::{Reactive, Source};

    #[cfg(feature = "client")]
    pub use restfetch_client::{
        Action, ActionOptions, Client, FetchState, ListAction, ListConfig, ListOptions,
        PaginatedListAction, RequestIntercept, RequestInterceptor, ResponseIntercept,
        ResponseInterceptor, Timeout, Transport,
    };
}
