//! Hostname well-formedness.
//!
//! A hostname is proxy-able when it is an IPv4 literal, a bracketed IPv6
//! literal, or a dotted DNS name whose labels are legal and whose last label
//! looks like a top-level domain. Single-label names such as `localhost` or
//! `m3u8-proxy` are not, which is what lets local endpoints share the path
//! space with proxy targets.

use std::net::{Ipv4Addr, Ipv6Addr};

const MAX_HOSTNAME_LEN: usize = 253;
const MAX_LABEL_LEN: usize = 63;

/// Returns true if `hostname` can be forwarded to.
pub fn is_valid_hostname(hostname: &str) -> bool {
    if let Some(inner) = hostname.strip_prefix('[').and_then(|h| h.strip_suffix(']')) {
        return inner.parse::<Ipv6Addr>().is_ok();
    }
    if hostname.parse::<Ipv4Addr>().is_ok() {
        return true;
    }
    if hostname.is_empty() || hostname.len() > MAX_HOSTNAME_LEN {
        return false;
    }

    let hostname = hostname.strip_suffix('.').unwrap_or(hostname);
    let labels: Vec<&str> = hostname.split('.').collect();
    if labels.len() < 2 || !labels.iter().all(|l| is_valid_label(l)) {
        return false;
    }
    labels.last().is_some_and(|tld| is_tld_like(tld))
}

fn is_valid_label(label: &str) -> bool {
    !label.is_empty()
        && label.len() <= MAX_LABEL_LEN
        && !label.starts_with('-')
        && !label.ends_with('-')
        && label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

fn is_tld_like(tld: &str) -> bool {
    if tld.len() > 4 && tld[..4].eq_ignore_ascii_case("xn--") {
        return true;
    }
    tld.len() >= 2 && tld.bytes().all(|b| b.is_ascii_alphabetic())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_dns_names() {
        assert!(is_valid_hostname("example.com"));
        assert!(is_valid_hostname("a.b-c.example.co.uk"));
        assert!(is_valid_hostname("example.com."));
        assert!(is_valid_hostname("example.xn--p1ai"));
    }

    #[test]
    fn accepts_ip_literals() {
        assert!(is_valid_hostname("127.0.0.1"));
        assert!(is_valid_hostname("[::1]"));
        assert!(!is_valid_hostname("[not-ipv6]"));
    }

    #[test]
    fn rejects_single_labels() {
        assert!(!is_valid_hostname("localhost"));
        assert!(!is_valid_hostname("m3u8-proxy"));
        assert!(!is_valid_hostname("ts-proxy"));
        assert!(!is_valid_hostname("iscorsneeded"));
    }

    #[test]
    fn rejects_malformed_labels() {
        assert!(!is_valid_hostname(""));
        assert!(!is_valid_hostname("-bad.com"));
        assert!(!is_valid_hostname("bad..com"));
        assert!(!is_valid_hostname("example.c0m"));
        assert!(!is_valid_hostname("example.c"));
        assert!(!is_valid_hostname(&format!("{}.com", "a".repeat(64))));
    }
}
