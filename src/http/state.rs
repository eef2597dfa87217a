//! Per-request state handed to the forwarding engine.

use std::sync::Arc;

use crate::config::GatewayConfig;
use crate::forward::discovery::ProxyDiscovery;
use crate::routing::Target;
use crate::security::CorsGrant;

/// State created once per request and dropped with it.
///
/// Nothing here is shared between requests; the forwarding knobs are copied
/// out of the config when the request arrives.
#[derive(Clone)]
pub struct RequestState {
    pub max_redirects: u32,
    pub cors_max_age: u64,
    /// Outbound proxy policy; the upstream clients are built with this same value.
    pub proxy_discovery: Arc<dyn ProxyDiscovery>,
    /// CORS grant computed before any policy decision.
    pub cors: CorsGrant,
    /// Parsed target, attached at handoff.
    pub target: Option<Target>,
    /// `http(s)://<Host>` of the gateway itself, attached at handoff.
    pub proxy_base_url: Option<String>,
    /// Redirects already followed for this request.
    pub redirect_count: u32,
}

impl RequestState {
    pub fn new(config: &GatewayConfig) -> Self {
        Self {
            max_redirects: config.max_redirects,
            cors_max_age: config.cors_max_age,
            proxy_discovery: Arc::clone(&config.proxy_discovery),
            cors: CorsGrant::default(),
            target: None,
            proxy_base_url: None,
            redirect_count: 0,
        }
    }

    /// Record the approved target and the gateway's own base URL.
    pub fn attach(&mut self, target: Target, proxy_base_url: String) {
        self.target = Some(target);
        self.proxy_base_url = Some(proxy_base_url);
    }
}

impl std::fmt::Debug for RequestState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestState")
            .field("max_redirects", &self.max_redirects)
            .field("cors_max_age", &self.cors_max_age)
            .field("target", &self.target)
            .field("proxy_base_url", &self.proxy_base_url)
            .field("redirect_count", &self.redirect_count)
            .finish_non_exhaustive()
    }
}
