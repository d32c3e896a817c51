//! Client settings for restfetch.
//!
//! This module provides [`ClientSettings`], the setup-time configuration
//! surface consumed once when a client handle is constructed. Settings are
//! explicitly constructed and explicitly passed: there is no global lazy
//! instance, so multiple independent clients can coexist and tests stay
//! isolated without reset hooks.

use serde::{Deserialize, Serialize};

/// Default debounce window for auto-updating list actions, in milliseconds.
pub const DEFAULT_DEBOUNCE_MS: u64 = 100;

/// Default page number applied when pagination is enabled.
pub const DEFAULT_PAGE: u64 = 1;

/// Default page size applied when pagination is enabled.
pub const DEFAULT_PAGE_SIZE: u64 = 50;

/// Default upper bound accepted for a page size.
pub const DEFAULT_MAX_PAGE_SIZE: u64 = 500;

/// CSRF protection configuration.
///
/// The client reads the named cookie and injects its decoded value as a
/// header on mutation-method requests. Defaults follow the Django
/// convention (`csrftoken` cookie, `X-CSRFToken` header).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsrfSettings {
    /// Whether CSRF header injection is enabled.
    pub enabled: bool,
    /// The name of the cookie holding the CSRF token.
    pub cookie_name: String,
    /// The name of the header the token is injected into.
    pub header_name: String,
}

impl Default for CsrfSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            cookie_name: "csrftoken".to_string(),
            header_name: "X-CSRFToken".to_string(),
        }
    }
}

/// The complete set of client settings.
///
/// # Examples
///
/// ```
/// use restfetch_core::ClientSettings;
///
/// let settings = ClientSettings::new("https://api.example.com")
///     .with_timeout_ms(5_000)
///     .with_dedup(true);
/// assert_eq!(settings.base_url, "https://api.example.com");
/// assert_eq!(settings.timeout_ms, Some(5_000));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientSettings {
    // ── Core ─────────────────────────────────────────────────────────
    /// Base URL prepended to relative request paths.
    pub base_url: String,
    /// Whether debug mode is enabled (affects logging format only).
    pub debug: bool,
    /// The log filter used by [`setup_logging`](crate::logging::setup_logging).
    pub log_level: String,

    // ── Security ─────────────────────────────────────────────────────
    /// CSRF header injection configuration.
    pub csrf: CsrfSettings,

    // ── Request behavior ─────────────────────────────────────────────
    /// Global request timeout in milliseconds; `None` means no timeout.
    pub timeout_ms: Option<u64>,
    /// Whether in-flight request deduplication is enabled by default.
    pub dedup_enabled: bool,

    // ── List actions ─────────────────────────────────────────────────
    /// Debounce window for auto-updating list actions, in milliseconds.
    pub auto_update_debounce_ms: u64,
    /// The largest page size accepted by pagination validation.
    pub max_page_size: u64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            debug: false,
            log_level: "info".to_string(),
            csrf: CsrfSettings::default(),
            timeout_ms: None,
            dedup_enabled: true,
            auto_update_debounce_ms: DEFAULT_DEBOUNCE_MS,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }
}

impl ClientSettings {
    /// Creates settings with the given base URL and defaults for
    /// everything else.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Sets the global request timeout in milliseconds.
    #[must_use]
    pub const fn with_timeout_ms(mut self, ms: u64) -> Self {
        self.timeout_ms = Some(ms);
        self
    }

    /// Removes the global request timeout (requests may run forever).
    #[must_use]
    pub const fn without_timeout(mut self) -> Self {
        self.timeout_ms = None;
        self
    }

    /// Enables or disables in-flight deduplication by default.
    #[must_use]
    pub const fn with_dedup(mut self, enabled: bool) -> Self {
        self.dedup_enabled = enabled;
        self
    }

    /// Replaces the CSRF configuration.
    #[must_use]
    pub fn with_csrf(mut self, csrf: CsrfSettings) -> Self {
        self.csrf = csrf;
        self
    }

    /// Disables CSRF header injection.
    #[must_use]
    pub fn without_csrf(mut self) -> Self {
        self.csrf.enabled = false;
        self
    }

    /// Sets the auto-update debounce window in milliseconds.
    #[must_use]
    pub const fn with_debounce_ms(mut self, ms: u64) -> Self {
        self.auto_update_debounce_ms = ms;
        self
    }

    /// Sets the largest accepted page size.
    #[must_use]
    pub const fn with_max_page_size(mut self, max: u64) -> Self {
        self.max_page_size = max;
        self
    }
}
