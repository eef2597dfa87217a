//! Configuration schema definitions.
//!
//! This module defines the on-disk configuration for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayOptions {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Who may use the gateway and how requests are rewritten.
    pub access: AccessConfig,

    /// Upstream forwarding knobs.
    pub forwarding: ForwardingConfig,

    /// Per-origin rate limiting.
    pub rate_limit: RateLimitConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Optional TLS configuration. When set, the gateway terminates TLS
    /// itself and treats every request as secure.
    pub tls: Option<TlsConfig>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            tls: None,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Access-control and header rewriting options.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AccessConfig {
    /// Origins that are always refused.
    pub origin_blacklist: Vec<String>,

    /// Origins that are allowed. Empty allows every origin.
    pub origin_whitelist: Vec<String>,

    /// Request header(s) of which at least one must be present.
    pub require_header: Option<RequireHeader>,

    /// Request headers stripped before forwarding.
    pub remove_headers: Vec<String>,

    /// Request headers forced to a value before forwarding.
    pub set_headers: BTreeMap<String, String>,

    /// `Access-Control-Max-Age` for preflight responses, in seconds. 0 omits it.
    pub cors_max_age: u64,

    /// Answer with a redirect when the requesting origin asks for itself.
    pub redirect_same_origin: bool,
}

/// `require_header` accepts a single name or a list of names.
///
/// Anything else deserializes as [`RequireHeader::Invalid`] and means
/// "no requirement".
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RequireHeader {
    One(String),
    Many(Vec<String>),
    Invalid(toml::Value),
}

impl RequireHeader {
    /// Lower-cased header names, or `None` when nothing is required.
    pub fn normalized(&self) -> Option<Vec<String>> {
        match self {
            RequireHeader::One(name) if name.is_empty() => None,
            RequireHeader::One(name) => Some(vec![name.to_ascii_lowercase()]),
            RequireHeader::Many(names) if names.is_empty() => None,
            RequireHeader::Many(names) => {
                Some(names.iter().map(|n| n.to_ascii_lowercase()).collect())
            }
            RequireHeader::Invalid(_) => None,
        }
    }
}

/// Upstream forwarding configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ForwardingConfig {
    /// Maximum number of 301/302/303 redirects followed per request.
    pub max_redirects: u32,

    /// Route upstream traffic through `http_proxy`/`https_proxy`/`no_proxy`.
    pub proxy_from_env: bool,

    /// Largest request body forwarded upstream, in bytes.
    pub max_body_size: usize,
}

impl Default for ForwardingConfig {
    fn default() -> Self {
        Self {
            max_redirects: 5,
            proxy_from_env: true,
            max_body_size: 10 * 1024 * 1024,
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Sustained requests per second per origin.
    pub requests_per_second: u32,

    /// Burst capacity.
    pub burst_size: u32,

    /// Origins never rate limited.
    pub exempt_origins: Vec<String>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            requests_per_second: 10,
            burst_size: 20,
            exempt_origins: Vec::new(),
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upstream connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Time allowed until response headers are produced, in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
