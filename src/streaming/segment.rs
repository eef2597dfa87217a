//! HLS segment relay.
//!
//! Streams a media segment (or key, or init map) from upstream. Range and
//! conditional headers from the player are passed through so seeking and
//! cache revalidation work; the upstream status is relayed as is.

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderName, Request, StatusCode},
    response::Response,
};
use url::Url;

use crate::http::response::text_response;
use crate::security::cors::wildcard_headers;
use crate::streaming::{override_headers, HeaderOverrides};

/// Client headers forwarded upstream.
const FORWARDED: [HeaderName; 4] = [
    header::RANGE,
    header::IF_RANGE,
    header::IF_NONE_MATCH,
    header::IF_MODIFIED_SINCE,
];

/// Upstream headers relayed to the client.
const RELAYED: [HeaderName; 7] = [
    header::CONTENT_TYPE,
    header::CONTENT_LENGTH,
    header::CONTENT_RANGE,
    header::ACCEPT_RANGES,
    header::ETAG,
    header::LAST_MODIFIED,
    header::CACHE_CONTROL,
];

pub(crate) async fn relay_segment(
    client: &reqwest::Client,
    url: String,
    headers: HeaderOverrides,
    request: Request<Body>,
) -> Response {
    let segment_url = match Url::parse(&url) {
        Ok(url) => url,
        Err(e) => return relay_error(&url, e),
    };

    let mut outbound = HeaderMap::new();
    for name in &FORWARDED {
        if let Some(value) = request.headers().get(name) {
            outbound.insert(name.clone(), value.clone());
        }
    }
    outbound.extend(override_headers(&headers));

    let upstream = match client.get(segment_url).headers(outbound).send().await {
        Ok(response) => response,
        Err(e) => return relay_error(&url, e),
    };

    let status = upstream.status();
    let mut response_headers: HeaderMap = wildcard_headers().into_iter().collect();
    for name in &RELAYED {
        if let Some(value) = upstream.headers().get(name) {
            response_headers.insert(name.clone(), value.clone());
        }
    }
    tracing::debug!(url = %url, status = %status, "Relaying segment");

    let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
    *response.status_mut() = status;
    *response.headers_mut() = response_headers;
    response
}

fn relay_error(url: &str, error: impl std::fmt::Display) -> Response {
    tracing::error!(url = %url, error = %error, "Segment relay failed");
    text_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        wildcard_headers().into_iter().collect(),
        error.to_string(),
    )
}
