//! Logging integration for restfetch.
//!
//! Provides a helper for configuring [`tracing`]-based logging from
//! [`ClientSettings`](crate::settings::ClientSettings).

use crate::settings::ClientSettings;

/// Sets up the global tracing subscriber based on the given settings.
///
/// The log filter is read from `settings.log_level` (e.g. "debug", "info",
/// "warn", "error", or a full `EnvFilter` directive). In debug mode a
/// pretty, human-readable format is used; otherwise a structured JSON
/// format is used. Calling this more than once is harmless: later calls
/// leave the installed subscriber in place.
pub fn setup_logging(settings: &ClientSettings) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(&settings.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    if settings.debug {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .pretty()
            .try_init()
            .ok();
    } else {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .json()
            .try_init()
            .ok();
    }
}

/// Creates a tracing span for a single request execution.
///
/// # Examples
///
/// ```
/// use restfetch_core::logging::request_span;
///
/// let span = request_span("GET", "https://api.example.com/users/");
/// let _guard = span.enter();
/// tracing::debug!("executing");
/// ```
pub fn request_span(method: &str, url: &str) -> tracing::Span {
    tracing::debug_span!("request", %method, %url)
}
