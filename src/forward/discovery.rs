//! Upstream proxy discovery.
//!
//! Mirrors the conventional environment variables:
//! - `<scheme>_proxy`, then `all_proxy`, lower-case names taking precedence
//! - `no_proxy` lists hosts reached directly; `*` disables proxying,
//!   entries may carry a port and match as domain suffixes

use std::sync::Arc;

use url::Url;

/// Decides which outbound proxy, if any, to use for an upstream URL.
pub trait ProxyDiscovery: Send + Sync {
    fn proxy_for_url(&self, url: &Url) -> Option<String>;
}

/// Always connects directly.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProxyDiscovery;

impl ProxyDiscovery for NoProxyDiscovery {
    fn proxy_for_url(&self, _url: &Url) -> Option<String> {
        None
    }
}

/// Reads the process environment on every lookup.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvProxyDiscovery;

impl ProxyDiscovery for EnvProxyDiscovery {
    fn proxy_for_url(&self, url: &Url) -> Option<String> {
        resolve_proxy(url, |name| std::env::var(name).ok())
    }
}

/// Outbound proxy rule for a reqwest client: every upstream URL is routed as
/// `discovery` decides. Every client the gateway builds installs this, so
/// all upstream traffic follows one policy.
pub fn outbound_proxy(discovery: Arc<dyn ProxyDiscovery>) -> reqwest::Proxy {
    reqwest::Proxy::custom(move |url| discovery.proxy_for_url(url))
}

/// Proxy for `url` given an environment lookup function.
pub fn resolve_proxy(url: &Url, env: impl Fn(&str) -> Option<String>) -> Option<String> {
    let scheme = url.scheme();
    let host = url.host_str()?;
    let port = url.port_or_known_default().unwrap_or(0);

    if !should_proxy(host, port, &env) {
        return None;
    }

    let proxy = lookup(&env, &format!("{scheme}_proxy")).or_else(|| lookup(&env, "all_proxy"))?;
    if proxy.contains("://") {
        Some(proxy)
    } else {
        Some(format!("{scheme}://{proxy}"))
    }
}

fn lookup(env: &impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    env(&name.to_ascii_lowercase())
        .or_else(|| env(&name.to_ascii_uppercase()))
        .filter(|v| !v.is_empty())
}

fn should_proxy(host: &str, port: u16, env: &impl Fn(&str) -> Option<String>) -> bool {
    let Some(no_proxy) = lookup(env, "no_proxy") else {
        return true;
    };
    let no_proxy = no_proxy.to_ascii_lowercase();
    if no_proxy == "*" {
        return false;
    }
    let host = host.to_ascii_lowercase();

    no_proxy
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|entry| !entry.is_empty())
        .all(|entry| {
            let (entry_host, entry_port) = match entry.rsplit_once(':') {
                Some((h, p)) => (h, p.parse::<u16>().ok()),
                None => (entry, None),
            };
            if entry_port.is_some_and(|p| p != port) {
                return true;
            }
            if !entry_host.starts_with('.') && !entry_host.starts_with('*') {
                return host != entry_host;
            }
            let suffix = entry_host.trim_start_matches('*');
            !host.ends_with(suffix)
        })
}
