//! Effective runtime configuration.
//!
//! `GatewayConfig` is built once from [`GatewayOptions`] at startup, frozen
//! behind an `Arc`, and shared read-only by every request task.

use std::collections::HashSet;
use std::sync::Arc;

use axum::http::{HeaderMap, HeaderName, HeaderValue};

use crate::config::loader::ConfigError;
use crate::config::schema::GatewayOptions;
use crate::config::validation::validate_config;
use crate::forward::discovery::{EnvProxyDiscovery, NoProxyDiscovery, ProxyDiscovery};
use crate::http::hooks::{InitialRequestHandler, PassThrough};
use crate::security::rate_limit::{NoRateLimit, OriginRateLimiter, RateLimitCheck};

/// Immutable gateway configuration with collaborators injected.
#[derive(Clone)]
pub struct GatewayConfig {
    pub max_redirects: u32,
    pub origin_blacklist: HashSet<String>,
    pub origin_whitelist: HashSet<String>,
    /// Header names of which at least one must be present; `None` disables the check.
    pub require_header: Option<Vec<HeaderName>>,
    pub remove_headers: Vec<HeaderName>,
    pub set_headers: HeaderMap,
    pub cors_max_age: u64,
    pub redirect_same_origin: bool,
    pub rate_limiter: Arc<dyn RateLimitCheck>,
    pub initial_request_handler: Arc<dyn InitialRequestHandler>,
    pub proxy_discovery: Arc<dyn ProxyDiscovery>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            max_redirects: 5,
            origin_blacklist: HashSet::new(),
            origin_whitelist: HashSet::new(),
            require_header: None,
            remove_headers: Vec::new(),
            set_headers: HeaderMap::new(),
            cors_max_age: 0,
            redirect_same_origin: false,
            rate_limiter: Arc::new(NoRateLimit),
            initial_request_handler: Arc::new(PassThrough),
            proxy_discovery: Arc::new(EnvProxyDiscovery),
        }
    }
}

impl GatewayConfig {
    /// Overlay validated options onto the defaults.
    pub fn from_options(options: &GatewayOptions) -> Result<Self, ConfigError> {
        validate_config(options).map_err(ConfigError::Validation)?;
        let access = &options.access;

        // Validation above guarantees the header names and values parse.
        let require_header = access
            .require_header
            .as_ref()
            .and_then(|r| r.normalized())
            .map(|names| names.iter().filter_map(|n| parse_name(n)).collect::<Vec<_>>())
            .filter(|names| !names.is_empty());

        let remove_headers = access.remove_headers.iter().filter_map(|n| parse_name(n)).collect();

        let mut set_headers = HeaderMap::new();
        for (name, value) in &access.set_headers {
            if let (Some(name), Ok(value)) = (parse_name(name), HeaderValue::from_str(value)) {
                set_headers.insert(name, value);
            }
        }

        let rate_limiter: Arc<dyn RateLimitCheck> = if options.rate_limit.enabled {
            Arc::new(OriginRateLimiter::new(&options.rate_limit))
        } else {
            Arc::new(NoRateLimit)
        };

        let proxy_discovery: Arc<dyn ProxyDiscovery> = if options.forwarding.proxy_from_env {
            Arc::new(EnvProxyDiscovery)
        } else {
            Arc::new(NoProxyDiscovery)
        };

        Ok(Self {
            max_redirects: options.forwarding.max_redirects,
            origin_blacklist: access.origin_blacklist.iter().cloned().collect(),
            origin_whitelist: access.origin_whitelist.iter().cloned().collect(),
            require_header,
            remove_headers,
            set_headers,
            cors_max_age: access.cors_max_age,
            redirect_same_origin: access.redirect_same_origin,
            rate_limiter,
            initial_request_handler: Arc::new(PassThrough),
            proxy_discovery,
        })
    }

    /// Replace the rate-limit predicate.
    pub fn with_rate_limiter(mut self, limiter: Arc<dyn RateLimitCheck>) -> Self {
        self.rate_limiter = limiter;
        self
    }

    /// Replace the pre-dispatch hook.
    pub fn with_initial_request_handler(mut self, handler: Arc<dyn InitialRequestHandler>) -> Self {
        self.initial_request_handler = handler;
        self
    }

    /// Replace upstream proxy discovery.
    pub fn with_proxy_discovery(mut self, discovery: Arc<dyn ProxyDiscovery>) -> Self {
        self.proxy_discovery = discovery;
        self
    }
}

fn parse_name(name: &str) -> Option<HeaderName> {
    HeaderName::from_bytes(name.as_bytes()).ok()
}
