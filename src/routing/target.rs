//! Target locator.
//!
//! # Responsibilities
//! - Split the gateway request path into scheme, hostname, port and path
//! - Reject inputs where no host can be isolated
//! - Carry the port verbatim; range checks belong to the caller
//!
//! # Accepted Forms
//! ```text
//! http://host[:port][/path]
//! https://host[:port][/path]
//! //host[:port][/path]
//! host[:port][/path]
//! ```
//! `http:/host` (a single slash after the scheme) never parses.

use std::fmt;

/// Upstream scheme named in the request path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upstream location embedded in a gateway request path.
///
/// A `Target` only exists when a non-empty hostname was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    scheme: Option<Scheme>,
    hostname: String,
    port: Option<String>,
    path: String,
}

enum SchemePrefix<'a> {
    Explicit(Scheme, &'a str),
    Malformed,
    Absent,
}

impl Target {
    /// Parse a request path with its leading `/` already removed.
    pub fn parse(input: &str) -> Option<Self> {
        let (scheme, rest) = match split_scheme(input) {
            SchemePrefix::Explicit(scheme, rest) => (Some(scheme), rest),
            SchemePrefix::Malformed => return None,
            SchemePrefix::Absent => (None, input.strip_prefix("//").unwrap_or(input)),
        };

        let end = rest.find(|c| c == '/' || c == '?').unwrap_or(rest.len());
        let (authority, path) = rest.split_at(end);

        // userinfo is never forwarded
        let authority = authority.rsplit_once('@').map_or(authority, |(_, host)| host);
        let (hostname, port) = split_authority(authority)?;

        if hostname.is_empty() || hostname.chars().any(is_forbidden_host_char) {
            return None;
        }

        Some(Self {
            scheme,
            hostname: hostname.to_ascii_lowercase(),
            port: port.filter(|p| !p.is_empty()).map(str::to_string),
            path: path.to_string(),
        })
    }

    /// Scheme exactly as written in the path, if any.
    pub fn scheme(&self) -> Option<Scheme> {
        self.scheme
    }

    /// Scheme used to reach the upstream. Without an explicit scheme, port
    /// 443 implies https and anything else http.
    pub fn effective_scheme(&self) -> Scheme {
        match (self.scheme, self.port.as_deref()) {
            (Some(scheme), _) => scheme,
            (None, Some("443")) => Scheme::Https,
            (None, _) => Scheme::Http,
        }
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn port(&self) -> Option<&str> {
        self.port.as_deref()
    }

    /// Numeric port, 0 when absent. Digit strings too long for `u64`
    /// saturate so they still fail any upper-bound check.
    pub fn port_number(&self) -> u64 {
        self.port
            .as_deref()
            .map(|p| p.parse().unwrap_or(u64::MAX))
            .unwrap_or(0)
    }

    /// Path and query remainder; may be empty.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// `hostname[:port]`
    pub fn host(&self) -> String {
        match &self.port {
            Some(port) => format!("{}:{}", self.hostname, port),
            None => self.hostname.clone(),
        }
    }

    /// `scheme://hostname[:port]`
    pub fn origin(&self) -> String {
        format!("{}://{}", self.effective_scheme(), self.host())
    }

    /// Absolute upstream URL.
    pub fn href(&self) -> String {
        if self.path.starts_with('/') {
            format!("{}{}", self.origin(), self.path)
        } else {
            format!("{}/{}", self.origin(), self.path)
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.href())
    }
}

fn split_scheme(input: &str) -> SchemePrefix<'_> {
    for (prefix, scheme) in [("https:", Scheme::Https), ("http:", Scheme::Http)] {
        let Some(head) = input.get(..prefix.len()) else {
            continue;
        };
        if head.eq_ignore_ascii_case(prefix) {
            return match input[prefix.len()..].strip_prefix("//") {
                Some(rest) => SchemePrefix::Explicit(scheme, rest),
                None => SchemePrefix::Malformed,
            };
        }
    }
    SchemePrefix::Absent
}

fn split_authority(authority: &str) -> Option<(&str, Option<&str>)> {
    if authority.starts_with('[') {
        let close = authority.find(']')?;
        let (host, rest) = authority.split_at(close + 1);
        return match rest.strip_prefix(':') {
            Some(port) if port.bytes().all(|b| b.is_ascii_digit()) => Some((host, Some(port))),
            Some(_) => None,
            None if rest.is_empty() => Some((host, None)),
            None => None,
        };
    }

    match authority.rsplit_once(':') {
        Some((host, _)) if host.contains(':') => None,
        Some((host, port)) if port.bytes().all(|b| b.is_ascii_digit()) => Some((host, Some(port))),
        Some(_) => None,
        None => Some((authority, None)),
    }
}

fn is_forbidden_host_char(c: char) -> bool {
    c.is_whitespace()
        || c.is_control()
        || matches!(c, '<' | '>' | '\\' | '^' | '`' | '{' | '|' | '}' | '"' | '#')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_explicit_scheme() {
        let target = Target::parse("https://example.com:8443/a/b?c=d").unwrap();
        assert_eq!(target.scheme(), Some(Scheme::Https));
        assert_eq!(target.hostname(), "example.com");
        assert_eq!(target.port(), Some("8443"));
        assert_eq!(target.path(), "/a/b?c=d");
        assert_eq!(target.href(), "https://example.com:8443/a/b?c=d");
    }

    #[test]
    fn scheme_is_case_insensitive_and_host_lowercased() {
        let target = Target::parse("HTTP://Example.COM/x").unwrap();
        assert_eq!(target.scheme(), Some(Scheme::Http));
        assert_eq!(target.hostname(), "example.com");
    }

    #[test]
    fn rejects_single_slash_after_scheme() {
        assert!(Target::parse("http:/example.com/a").is_none());
        assert!(Target::parse("https:example.com").is_none());
        assert!(Target::parse("http:///a").is_none());
    }

    #[test]
    fn bare_host_defaults_scheme_from_port() {
        let plain = Target::parse("example.com/path").unwrap();
        assert_eq!(plain.scheme(), None);
        assert_eq!(plain.effective_scheme(), Scheme::Http);
        assert_eq!(plain.href(), "http://example.com/path");

        let tls = Target::parse("example.com:443").unwrap();
        assert_eq!(tls.effective_scheme(), Scheme::Https);
        assert_eq!(tls.href(), "https://example.com:443/");
    }

    #[test]
    fn protocol_relative_form() {
        let target = Target::parse("//example.com?q=1").unwrap();
        assert_eq!(target.hostname(), "example.com");
        assert_eq!(target.path(), "?q=1");
        assert_eq!(target.href(), "http://example.com/?q=1");
    }

    #[test]
    fn port_is_carried_verbatim() {
        let target = Target::parse("http://example.com:70000/a").unwrap();
        assert_eq!(target.port(), Some("70000"));
        assert_eq!(target.port_number(), 70000);

        let huge = Target::parse("example.com:99999999999999999999999").unwrap();
        assert_eq!(huge.port_number(), u64::MAX);
    }

    #[test]
    fn absent_or_empty_port_is_zero() {
        assert_eq!(Target::parse("example.com").unwrap().port_number(), 0);
        let empty = Target::parse("example.com:/x").unwrap();
        assert_eq!(empty.port(), None);
        assert_eq!(empty.port_number(), 0);
    }

    #[test]
    fn bracketed_ipv6_host() {
        let target = Target::parse("http://[::1]:8080/x").unwrap();
        assert_eq!(target.hostname(), "[::1]");
        assert_eq!(target.port(), Some("8080"));
    }

    #[test]
    fn no_host_means_no_target() {
        assert!(Target::parse("").is_none());
        assert!(Target::parse("/just/a/path").is_none());
        assert!(Target::parse("?q=1").is_none());
        assert!(Target::parse("example.com:abc/x").is_none());
    }

    #[test]
    fn local_endpoint_parses_as_host() {
        let target = Target::parse("m3u8-proxy?url=x").unwrap();
        assert_eq!(target.hostname(), "m3u8-proxy");
        assert_eq!(target.path(), "?url=x");
    }

    #[test]
    fn userinfo_is_dropped() {
        let target = Target::parse("http://user:pw@example.com/").unwrap();
        assert_eq!(target.hostname(), "example.com");
        assert_eq!(target.port(), None);
    }
}
