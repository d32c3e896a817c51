//! # restfetch-http
//!
//! The HTTP layer for restfetch: request descriptors and bodies, received
//! responses with content-type-driven parsing, URL building and
//! normalization, list query state (filters, ordering, pagination), cookie
//! parsing, and CSRF header injection.

pub mod cookies;
pub mod csrf;
pub mod query;
pub mod request;
pub mod response;
pub mod url;

pub use cookies::{cookie_value, parse_cookie_header};
pub use csrf::CsrfInjector;
pub use query::{
    Direction, FilterParams, FilterValue, OrderBy, OrderingMode, PaginationMeta, PaginationParams,
    SortSpec,
};
pub use request::{normalize_headers, Body, RequestDescriptor};
pub use response::Response;
pub use url::{build_url, normalize_url_for_key};

pub use http::Method;
