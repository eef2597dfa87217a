//! reqwest-backed forwarder.
//!
//! # Responsibilities
//! - Send the transformed request to the target
//! - Follow 301/302/303 internally, up to `max_redirects`, as body-less GETs
//! - Rewrite the `Location` of redirects it does not follow back through
//!   the gateway
//! - Relay status, headers and a streamed body with the CORS grant applied

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, Request, StatusCode},
    response::Response,
};
use futures_util::future::{BoxFuture, FutureExt};
use url::Url;

use crate::config::{ForwardingConfig, TimeoutConfig};
use crate::forward::discovery::{outbound_proxy, ProxyDiscovery};
use crate::forward::Forwarder;
use crate::http::response::text_response;
use crate::http::state::RequestState;
use crate::observability::metrics;
use crate::routing::Target;
use crate::security::headers::{append_forwarded_for, strip_hop_by_hop};

const X_REQUEST_URL: HeaderName = HeaderName::from_static("x-request-url");
const X_FINAL_URL: HeaderName = HeaderName::from_static("x-final-url");
const SET_COOKIE2: HeaderName = HeaderName::from_static("set-cookie2");

/// Forwarding engine speaking to upstreams with reqwest.
pub struct UpstreamForwarder {
    client: reqwest::Client,
    max_body_size: usize,
}

impl UpstreamForwarder {
    /// `discovery` decides, per upstream URL, whether to go through an
    /// outbound proxy.
    pub fn new(
        forwarding: &ForwardingConfig,
        timeouts: &TimeoutConfig,
        discovery: Arc<dyn ProxyDiscovery>,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .proxy(outbound_proxy(discovery))
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .build()?;
        Ok(Self {
            client,
            max_body_size: forwarding.max_body_size,
        })
    }

    async fn relay(&self, request: Request<Body>, mut state: RequestState) -> Response {
        let Some(mut target) = state.target.take() else {
            tracing::error!("Forwarder invoked without a target");
            return text_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                state.cors.headers(),
                "No target attached to request",
            );
        };
        let proxy_base_url = state.proxy_base_url.clone().unwrap_or_default();
        let first_href = target.href();

        let (parts, body) = request.into_parts();
        let client_ip = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());

        let mut headers = parts.headers;
        strip_hop_by_hop(&mut headers);
        headers.remove(header::HOST);
        if let Some(ip) = client_ip {
            append_forwarded_for(&mut headers, ip);
        }

        let mut body = match axum::body::to_bytes(body, self.max_body_size).await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                tracing::warn!(target = %first_href, error = %e, "Request body rejected");
                return text_response(
                    StatusCode::PAYLOAD_TOO_LARGE,
                    state.cors.headers(),
                    format!("Request body rejected: {e}"),
                );
            }
        };

        let mut method = parts.method;
        let mut followed: Vec<String> = Vec::new();

        loop {
            let href = target.href();
            let url = match Url::parse(&href) {
                Ok(url) => url,
                Err(e) => return proxy_error(&state, e),
            };
            let mut outbound = self.client.request(method.clone(), url.clone()).headers(headers.clone());
            if let Some(bytes) = body.take().filter(|b| !b.is_empty()) {
                outbound = outbound.body(bytes);
            }

            let upstream = match outbound.send().await {
                Ok(response) => response,
                Err(e) => {
                    tracing::error!(target = %href, error = %e, "Upstream request failed");
                    return proxy_error(&state, e);
                }
            };
            let status = upstream.status();

            let mut location = None;
            if is_redirect(status) {
                let next = upstream
                    .headers()
                    .get(header::LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| url.join(v).ok())
                    .and_then(|resolved| Target::parse(resolved.as_str()).map(|t| (resolved, t)));

                if let Some((resolved, next)) = next {
                    let follow = matches!(status.as_u16(), 301..=303)
                        && state.redirect_count < state.max_redirects;
                    if follow {
                        state.redirect_count += 1;
                        followed.push(format!("{} {}", status.as_u16(), resolved));
                        metrics::record_upstream_redirect();
                        tracing::debug!(from = %href, to = %resolved, status = %status, "Following redirect");

                        method = Method::GET;
                        headers.remove(header::CONTENT_LENGTH);
                        headers.remove(header::CONTENT_TYPE);
                        target = next;
                        continue;
                    }
                    location = Some(format!("{proxy_base_url}/{resolved}"));
                }
            }

            tracing::debug!(target = %href, status = %status, redirects = state.redirect_count, "Upstream responded");

            let mut response_headers = upstream.headers().clone();
            strip_hop_by_hop(&mut response_headers);
            response_headers.remove(header::SET_COOKIE);
            response_headers.remove(SET_COOKIE2);
            if let Some(value) = location.and_then(|l| HeaderValue::from_str(&l).ok()) {
                response_headers.insert(header::LOCATION, value);
            }
            annotate(&mut response_headers, &followed, &first_href, &href);
            state.cors.apply(&mut response_headers);

            let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
            *response.status_mut() = status;
            *response.headers_mut() = response_headers;
            return response;
        }
    }
}

impl Forwarder for UpstreamForwarder {
    fn forward(&self, request: Request<Body>, state: RequestState) -> BoxFuture<'_, Response> {
        self.relay(request, state).boxed()
    }
}

fn is_redirect(status: StatusCode) -> bool {
    matches!(status.as_u16(), 301 | 302 | 303 | 307 | 308)
}

fn annotate(headers: &mut HeaderMap, followed: &[String], first_href: &str, final_href: &str) {
    for (i, hop) in followed.iter().enumerate() {
        let name = HeaderName::from_bytes(format!("x-cors-redirect-{}", i + 1).as_bytes());
        if let (Ok(name), Ok(value)) = (name, HeaderValue::from_str(hop)) {
            headers.insert(name, value);
        }
    }
    if let Ok(value) = HeaderValue::from_str(first_href) {
        headers.insert(X_REQUEST_URL, value);
    }
    if let Ok(value) = HeaderValue::from_str(final_href) {
        headers.insert(X_FINAL_URL, value);
    }
}

fn proxy_error(state: &RequestState, error: impl std::fmt::Display) -> Response {
    metrics::record_upstream_error();
    text_response(
        StatusCode::NOT_FOUND,
        state.cors.headers(),
        format!("Not found because of proxy error: {error}"),
    )
}
