//! CSRF header injection.
//!
//! The client side of Django-style CSRF protection: the server sets a
//! token cookie, and every state-changing request must echo the token in a
//! header. [`CsrfInjector`] reads the named cookie from the caller's
//! cookie header and injects its decoded value on mutation methods only.
//! A missing cookie is not an error here; the server rejects the request
//! instead.

use std::collections::HashMap;

use http::Method;
use restfetch_core::CsrfSettings;

use crate::cookies::cookie_value;

/// Injects the CSRF token header on mutation-method requests.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
/// use http::Method;
/// use restfetch_core::CsrfSettings;
/// use restfetch_http::CsrfInjector;
///
/// let injector = CsrfInjector::new(CsrfSettings::default());
/// let mut headers = HashMap::new();
/// injector.inject(&Method::POST, &mut headers, "csrftoken=abc123");
/// assert_eq!(headers.get("x-csrftoken").map(String::as_str), Some("abc123"));
/// ```
#[derive(Debug, Clone)]
pub struct CsrfInjector {
    settings: CsrfSettings,
}

impl CsrfInjector {
    /// Creates an injector from CSRF settings.
    pub const fn new(settings: CsrfSettings) -> Self {
        Self { settings }
    }

    /// Returns `true` for methods that change server state.
    pub fn is_mutation_method(method: &Method) -> bool {
        matches!(
            *method,
            Method::POST | Method::PUT | Method::PATCH | Method::DELETE
        )
    }

    /// Injects the token header if this request needs one.
    ///
    /// Headers are left unchanged when injection is disabled, the method
    /// is safe, or the named cookie is absent. The header key follows the
    /// descriptor convention of lower-cased keys.
    pub fn inject(
        &self,
        method: &Method,
        headers: &mut HashMap<String, String>,
        cookie_header: &str,
    ) {
        if !self.settings.enabled || !Self::is_mutation_method(method) {
            return;
        }

        if let Some(token) = cookie_value(cookie_header, &self.settings.cookie_name) {
            headers.insert(self.settings.header_name.to_ascii_lowercase(), token);
        } else {
            tracing::debug!(
                cookie = %self.settings.cookie_name,
                "CSRF cookie absent; sending request without token header"
            );
        }
    }
}
