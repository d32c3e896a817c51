//! The request engine: client handles, call-site actions, in-flight
//! deduplication, interception, timeouts, and reactive list queries.

pub mod dedup;
pub mod executor;
pub mod interceptor;
pub mod list;
pub mod paginate;
pub mod state;
pub mod testing;
pub mod timeout;
pub mod transport;

pub use dedup::{dedup_key, DedupRegistry};
pub use executor::{Action, ActionOptions, Client};
pub use interceptor::{
    request_interceptor, response_interceptor, RequestIntercept, RequestInterceptor,
    ResponseIntercept, ResponseInterceptor,
};
pub use list::{ListAction, ListConfig, ListOptions};
pub use paginate::{PaginatedListAction, DEFAULT_DATA_KEY};
pub use state::FetchState;
pub use timeout::{Timeout, TimeoutController, TimeoutGuard};
pub use transport::Transport;
