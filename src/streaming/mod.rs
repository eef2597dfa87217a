//! Streaming sub-router.
//!
//! # Responsibilities
//! - Recognize the reserved local endpoints `/m3u8-proxy` and `/ts-proxy`
//! - Pull the target URL and JSON header overrides out of the query string
//! - Hand the request to a [`StreamRelay`]
//!
//! # Design Decisions
//! - Reached only for paths without an explicit scheme whose hostname is not
//!   a plausible upstream host, so real targets never collide with them
//! - A malformed `headers` payload is terminal (500, raw error text)

pub mod manifest;
pub mod segment;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{HeaderMap, HeaderName, HeaderValue, Request},
    response::Response,
};
use futures_util::future::{BoxFuture, FutureExt};
use serde_json::Value;
use url::Url;

use crate::config::TimeoutConfig;
use crate::forward::discovery::{outbound_proxy, ProxyDiscovery};
use crate::http::response::Rejection;

/// Manifest endpoint path.
pub const MANIFEST_PATH: &str = "/m3u8-proxy";
/// Segment endpoint path.
pub const SEGMENT_PATH: &str = "/ts-proxy";

/// Header overrides sent upstream by the relays, as decoded from the
/// `headers` query parameter.
pub type HeaderOverrides = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEndpoint {
    Manifest,
    Segment,
}

impl StreamEndpoint {
    fn from_path(path: &str) -> Option<Self> {
        match path {
            MANIFEST_PATH => Some(StreamEndpoint::Manifest),
            SEGMENT_PATH => Some(StreamEndpoint::Segment),
            _ => None,
        }
    }

    pub fn path(self) -> &'static str {
        match self {
            StreamEndpoint::Manifest => MANIFEST_PATH,
            StreamEndpoint::Segment => SEGMENT_PATH,
        }
    }
}

/// A request addressed to one of the streaming endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRequest {
    pub endpoint: StreamEndpoint,
    /// Value of the `url` parameter; empty when absent.
    pub url: String,
    pub headers: HeaderOverrides,
}

/// Classify a local request path.
///
/// `Ok(None)` means the path is not a streaming endpoint.
pub fn parse_stream_request(path_and_query: &str) -> Result<Option<StreamRequest>, Rejection> {
    let Ok(local) = Url::parse(&format!("http://localhost{path_and_query}")) else {
        return Ok(None);
    };
    let Some(endpoint) = StreamEndpoint::from_path(local.path()) else {
        return Ok(None);
    };

    let mut url = None;
    let mut headers = None;
    for (key, value) in local.query_pairs() {
        match key.as_ref() {
            "url" if url.is_none() => url = Some(value.into_owned()),
            "headers" if headers.is_none() => headers = Some(value.into_owned()),
            _ => {}
        }
    }

    let raw: BTreeMap<String, Value> = serde_json::from_str(headers.as_deref().unwrap_or("{}"))?;
    let headers = raw.into_iter().filter_map(scalar_override).collect();

    Ok(Some(StreamRequest {
        endpoint,
        url: url.unwrap_or_default(),
        headers,
    }))
}

/// Numbers and booleans are sent in their JSON spelling; `null`, arrays and
/// objects have no header form and are dropped.
fn scalar_override((name, value): (String, Value)) -> Option<(String, String)> {
    match value {
        Value::String(s) => Some((name, s)),
        Value::Number(n) => Some((name, n.to_string())),
        Value::Bool(b) => Some((name, b.to_string())),
        other => {
            tracing::warn!(header = %name, value = %other, "Skipping non-scalar header override");
            None
        }
    }
}

/// Header overrides as a `HeaderMap`. Illegal names or values are skipped.
pub fn override_headers(overrides: &HeaderOverrides) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (name, value) in overrides {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => tracing::warn!(header = %name, "Skipping unusable header override"),
        }
    }
    headers
}

/// Relays for the two streaming endpoints.
pub trait StreamRelay: Send + Sync {
    fn proxy_manifest(&self, url: String, headers: HeaderOverrides) -> BoxFuture<'_, Response>;

    /// `request` is the client's original request; range and conditional
    /// headers are honored from it.
    fn proxy_segment(
        &self,
        url: String,
        headers: HeaderOverrides,
        request: Request<Body>,
    ) -> BoxFuture<'_, Response>;
}

/// HLS relay backed by reqwest.
#[derive(Debug, Clone)]
pub struct HlsRelay {
    client: reqwest::Client,
}

impl HlsRelay {
    /// Upstream fetches are routed through `discovery`, the same policy the
    /// forwarding engine uses.
    pub fn new(timeouts: &TimeoutConfig, discovery: Arc<dyn ProxyDiscovery>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .proxy(outbound_proxy(discovery))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .build()?;
        Ok(Self { client })
    }
}

impl StreamRelay for HlsRelay {
    fn proxy_manifest(&self, url: String, headers: HeaderOverrides) -> BoxFuture<'_, Response> {
        manifest::relay_manifest(&self.client, url, headers).boxed()
    }

    fn proxy_segment(
        &self,
        url: String,
        headers: HeaderOverrides,
        request: Request<Body>,
    ) -> BoxFuture<'_, Response> {
        segment::relay_segment(&self.client, url, headers, request).boxed()
    }
}
