//! Gateway dispatcher.
//!
//! # Pipeline
//! ```text
//! CORS grant → OPTIONS? → landing page? → parse target → hook
//!     → no target (missing slash | landing page)
//!     → diagnostic host → port bound
//!     → streaming sub-router (no explicit scheme, invalid hostname)
//!     → required header → blacklist → whitelist → rate limit
//!     → same-origin redirect
//!     → strip / force headers → forwarder
//! ```
//! Each stage either answers the request or passes it on. Once the
//! forwarder is called the dispatcher has written nothing.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, Method, Request, StatusCode},
    response::{IntoResponse, Response},
};

use crate::config::GatewayConfig;
use crate::forward::Forwarder;
use crate::http::landing::{is_landing_path, landing_page};
use crate::http::request::{path_and_query, request_id};
use crate::http::response::Rejection;
use crate::http::state::RequestState;
use crate::observability::metrics;
use crate::routing::{is_valid_hostname, Target};
use crate::security::cors::CorsGrant;
use crate::security::headers::{force_headers, forwarded_over_https, strip_headers};
use crate::security::policy::{request_origin, PolicyEngine};
use crate::streaming::{parse_stream_request, StreamEndpoint, StreamRelay, StreamRequest};

/// Hostname clients use to ask whether they need the gateway at all.
pub const DIAGNOSTIC_HOST: &str = "iscorsneeded";

const MAX_PORT: u64 = 65535;

/// How the request reached the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transport {
    #[default]
    Plain,
    /// TLS terminated by the gateway itself.
    Tls,
}

/// Request-admission and routing pipeline.
pub struct Gateway {
    config: Arc<GatewayConfig>,
    policy: PolicyEngine,
    forwarder: Arc<dyn Forwarder>,
    streams: Arc<dyn StreamRelay>,
}

impl Gateway {
    pub fn new(
        config: Arc<GatewayConfig>,
        forwarder: Arc<dyn Forwarder>,
        streams: Arc<dyn StreamRelay>,
    ) -> Self {
        Self {
            policy: PolicyEngine::new(Arc::clone(&config)),
            config,
            forwarder,
            streams,
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Run one request through the pipeline.
    pub async fn dispatch(&self, mut request: Request<Body>, transport: Transport) -> Response {
        let mut state = RequestState::new(&self.config);
        let method = request.method().clone();
        state.cors = CorsGrant::from_request(&method, request.headers_mut(), state.cors_max_age);
        let cors = state.cors.headers();

        if method == Method::OPTIONS {
            return (StatusCode::OK, cors).into_response();
        }

        let raw = path_and_query(request.uri()).to_string();
        if is_landing_path(&raw) {
            return landing_page();
        }

        let target = Target::parse(raw.strip_prefix('/').unwrap_or(&raw));

        if let Some(response) = self
            .config
            .initial_request_handler
            .handle(&request, target.as_ref())
        {
            tracing::debug!(path = %raw, "Request handled by initial request hook");
            return response;
        }

        let Some(target) = target else {
            if missing_slash(&raw) {
                return self.reject(&request, Rejection::MissingSlash, &cors);
            }
            return landing_page();
        };

        if target.hostname() == DIAGNOSTIC_HOST {
            return (
                StatusCode::OK,
                [(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"))],
                "no",
            )
                .into_response();
        }

        if target.port_number() > MAX_PORT {
            let port = target.port().unwrap_or_default().to_string();
            return self.reject(&request, Rejection::InvalidPort(port), &cors);
        }

        if !has_explicit_scheme(&raw) && !is_valid_hostname(target.hostname()) {
            return self.route_stream(request, &raw, &target, &cors).await;
        }

        let origin = request_origin(request.headers()).to_string();
        if let Err(rejection) = self.policy.admit(request.headers(), &origin) {
            return self.reject(&request, rejection, &cors);
        }

        if self.config.redirect_same_origin && is_same_origin(&origin, &target) {
            return same_origin_redirect(&target, cors);
        }

        let secure = transport == Transport::Tls || forwarded_over_https(request.headers());
        let host = request
            .headers()
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .or_else(|| request.uri().authority().map(|a| a.to_string()))
            .unwrap_or_default();
        let proxy_base_url = format!("{}://{}", if secure { "https" } else { "http" }, host);

        strip_headers(request.headers_mut(), &self.config.remove_headers);
        force_headers(request.headers_mut(), &self.config.set_headers);

        tracing::debug!(
            request_id = %request_id(&request),
            method = %method,
            target = %target,
            proxy_base_url = %proxy_base_url,
            "Forwarding request"
        );

        state.attach(target, proxy_base_url);
        self.forwarder.forward(request, state).await
    }

    async fn route_stream(
        &self,
        request: Request<Body>,
        raw: &str,
        target: &Target,
        cors: &HeaderMap,
    ) -> Response {
        match parse_stream_request(raw) {
            Ok(Some(StreamRequest { endpoint, url, headers })) => {
                tracing::debug!(endpoint = endpoint.path(), url = %url, "Streaming request");
                match endpoint {
                    StreamEndpoint::Manifest => self.streams.proxy_manifest(url, headers).await,
                    StreamEndpoint::Segment => {
                        self.streams.proxy_segment(url, headers, request).await
                    }
                }
            }
            Ok(None) => {
                self.reject(&request, Rejection::InvalidHost(target.hostname().to_string()), cors)
            }
            Err(rejection) => self.reject(&request, rejection, cors),
        }
    }

    fn reject(&self, request: &Request<Body>, rejection: Rejection, cors: &HeaderMap) -> Response {
        metrics::record_rejection(rejection.reason());
        let status = rejection.status();
        if status.is_server_error() {
            tracing::warn!(request_id = %request_id(request), reason = rejection.reason(), error = %rejection, "Request rejected");
        } else {
            tracing::debug!(request_id = %request_id(request), reason = rejection.reason(), error = %rejection, "Request rejected");
        }
        rejection.into_response_with(cors)
    }
}

/// `/http:/x` or `/https:/x`: a scheme followed by a single slash.
fn missing_slash(raw: &str) -> bool {
    let lower = raw.to_ascii_lowercase();
    let after_scheme = lower
        .strip_prefix("/http")
        .map(|rest| rest.strip_prefix('s').unwrap_or(rest))
        .and_then(|rest| rest.strip_prefix(":/"));
    matches!(after_scheme, Some(rest) if rest.chars().next().is_some_and(|c| c != '/'))
}

/// Case-sensitive, like the path itself.
fn has_explicit_scheme(raw: &str) -> bool {
    raw.starts_with("/http:") || raw.starts_with("/https:")
}

fn is_same_origin(origin: &str, target: &Target) -> bool {
    !origin.is_empty()
        && target
            .href()
            .strip_prefix(origin)
            .is_some_and(|rest| rest.starts_with('/'))
}

fn same_origin_redirect(target: &Target, mut headers: HeaderMap) -> Response {
    if let Ok(location) = HeaderValue::from_str(&target.href()) {
        headers.insert(header::LOCATION, location);
    }
    headers.insert(header::VARY, HeaderValue::from_static("origin"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("private"));
    (StatusCode::MOVED_PERMANENTLY, headers).into_response()
}
