//! # restfetch-core
//!
//! Foundation types for the restfetch client: the [`FetchError`] taxonomy,
//! the [`ClientSettings`] configuration surface, and logging setup helpers.

pub mod error;
pub mod logging;
pub mod settings;

pub use error::{ClientResult, ErrorKind, FetchError};
pub use settings::{
    ClientSettings, CsrfSettings, DEFAULT_DEBOUNCE_MS, DEFAULT_MAX_PAGE_SIZE, DEFAULT_PAGE,
    DEFAULT_PAGE_SIZE,
};
