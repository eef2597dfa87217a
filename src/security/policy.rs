//! Origin and header admission policy.
//!
//! # Check Order
//! ```text
//! required header → origin blacklist → origin whitelist → rate limit
//! ```
//! The blacklist is consulted before the whitelist, so an origin present in
//! both is refused.

use std::sync::Arc;

use axum::http::{header, HeaderMap};

use crate::config::GatewayConfig;
use crate::http::response::Rejection;

/// Evaluates the access rules of a [`GatewayConfig`] against a request.
#[derive(Clone)]
pub struct PolicyEngine {
    config: Arc<GatewayConfig>,
}

impl PolicyEngine {
    pub fn new(config: Arc<GatewayConfig>) -> Self {
        Self { config }
    }

    /// True when no header is required, or any required header is present.
    pub fn has_required_header(&self, headers: &HeaderMap) -> bool {
        match &self.config.require_header {
            Some(names) => names.iter().any(|name| headers.contains_key(name)),
            None => true,
        }
    }

    pub fn is_blacklisted(&self, origin: &str) -> bool {
        self.config.origin_blacklist.contains(origin)
    }

    /// An empty whitelist admits every origin.
    pub fn is_whitelisted(&self, origin: &str) -> bool {
        self.config.origin_whitelist.is_empty() || self.config.origin_whitelist.contains(origin)
    }

    /// Rate-limit message for `origin`; empty messages count as admitted.
    pub fn rate_limit(&self, origin: &str) -> Option<String> {
        self.config
            .rate_limiter
            .check(origin)
            .filter(|message| !message.is_empty())
    }

    /// Run every check in order and stop at the first violation.
    pub fn admit(&self, headers: &HeaderMap, origin: &str) -> Result<(), Rejection> {
        if !self.has_required_header(headers) {
            let names = self
                .config
                .require_header
                .iter()
                .flatten()
                .map(|n| n.as_str().to_string())
                .collect();
            return Err(Rejection::MissingRequiredHeader(names));
        }
        if self.is_blacklisted(origin) {
            return Err(Rejection::OriginBlacklisted(origin.to_string()));
        }
        if !self.is_whitelisted(origin) {
            return Err(Rejection::OriginNotWhitelisted(origin.to_string()));
        }
        if let Some(message) = self.rate_limit(origin) {
            return Err(Rejection::RateLimited(message));
        }
        Ok(())
    }
}

/// The request's `Origin` header, or the empty string.
pub fn request_origin(headers: &HeaderMap) -> &str {
    headers
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}
