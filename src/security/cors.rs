//! Cross-origin response headers.
//!
//! Every response the gateway produces for a proxied or rejected request
//! grants cross-origin access with a wildcard origin. Preflight hints sent by
//! the browser (`Access-Control-Request-Method`/`-Headers`) are echoed back
//! and removed from the request so they never reach the upstream.

use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    ACCESS_CONTROL_EXPOSE_HEADERS, ACCESS_CONTROL_MAX_AGE, ACCESS_CONTROL_REQUEST_HEADERS,
    ACCESS_CONTROL_REQUEST_METHOD,
};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method};

/// CORS headers granted to one request, computed before any policy check.
#[derive(Debug, Clone, Default)]
pub struct CorsGrant {
    allow_methods: Option<HeaderValue>,
    allow_headers: Option<HeaderValue>,
    max_age: Option<u64>,
}

impl CorsGrant {
    /// Capture the grant for a request, consuming its preflight hints.
    /// `max_age` is only advertised on `OPTIONS` and only when non-zero.
    pub fn from_request(method: &Method, headers: &mut HeaderMap, max_age: u64) -> Self {
        Self {
            allow_methods: headers.remove(ACCESS_CONTROL_REQUEST_METHOD),
            allow_headers: headers.remove(ACCESS_CONTROL_REQUEST_HEADERS),
            max_age: (*method == Method::OPTIONS && max_age > 0).then_some(max_age),
        }
    }

    /// Add the grant to `headers`. `Access-Control-Expose-Headers` lists
    /// every header present before it is added.
    pub fn apply(&self, headers: &mut HeaderMap) {
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
        if let Some(age) = self.max_age {
            headers.insert(ACCESS_CONTROL_MAX_AGE, HeaderValue::from(age));
        }
        if let Some(methods) = &self.allow_methods {
            headers.insert(ACCESS_CONTROL_ALLOW_METHODS, methods.clone());
        }
        if let Some(allowed) = &self.allow_headers {
            headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, allowed.clone());
        }

        let exposed = headers
            .keys()
            .map(HeaderName::as_str)
            .collect::<Vec<_>>()
            .join(",");
        if let Ok(value) = HeaderValue::from_str(&exposed) {
            headers.insert(ACCESS_CONTROL_EXPOSE_HEADERS, value);
        }
    }

    /// The grant as a standalone header set.
    pub fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        self.apply(&mut headers);
        headers
    }
}

/// Fixed headers for endpoints that open themselves to any origin.
pub fn wildcard_headers() -> [(HeaderName, HeaderValue); 3] {
    [
        (ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*")),
        (ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("*")),
        (ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static("*")),
    ]
}
