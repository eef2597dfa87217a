//! Gateway rejections and response helpers.
//!
//! # Responsibilities
//! - Name every reason the gateway refuses a request
//! - Map each reason to its HTTP status and human-readable body
//! - Attach the request's CORS grant so browsers can read the error
//!
//! # Design Decisions
//! - Rejections are local, synchronous decisions; nothing is retried
//! - Bodies are plain text explaining the violated rule
//! - Header-payload errors on the streaming endpoints go out bare (no CORS)

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Why the gateway refused to handle a request.
#[derive(Debug, Error)]
pub enum Rejection {
    #[error("The URL is invalid: two slashes are needed after the http(s):.")]
    MissingSlash,

    #[error("Port number too large: {0}")]
    InvalidPort(String),

    #[error("Missing required request header. Must specify one of: {}", .0.join(","))]
    MissingRequiredHeader(Vec<String>),

    #[error("The origin \"{0}\" was blacklisted.")]
    OriginBlacklisted(String),

    #[error("The origin \"{0}\" was not whitelisted.")]
    OriginNotWhitelisted(String),

    #[error("{0}")]
    RateLimited(String),

    #[error("Invalid host: {0}")]
    InvalidHost(String),

    #[error("{0}")]
    HeaderPayload(#[from] serde_json::Error),
}

impl Rejection {
    pub fn status(&self) -> StatusCode {
        match self {
            Rejection::MissingSlash
            | Rejection::InvalidPort(_)
            | Rejection::MissingRequiredHeader(_) => StatusCode::BAD_REQUEST,
            Rejection::OriginBlacklisted(_) | Rejection::OriginNotWhitelisted(_) => {
                StatusCode::FORBIDDEN
            }
            Rejection::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            Rejection::InvalidHost(_) => StatusCode::NOT_FOUND,
            Rejection::HeaderPayload(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Metric label.
    pub fn reason(&self) -> &'static str {
        match self {
            Rejection::MissingSlash => "missing_slash",
            Rejection::InvalidPort(_) => "invalid_port",
            Rejection::MissingRequiredHeader(_) => "header_required",
            Rejection::OriginBlacklisted(_) => "origin_blacklisted",
            Rejection::OriginNotWhitelisted(_) => "origin_not_whitelisted",
            Rejection::RateLimited(_) => "rate_limited",
            Rejection::InvalidHost(_) => "invalid_host",
            Rejection::HeaderPayload(_) => "header_payload",
        }
    }

    /// Render the rejection, carrying `cors` unless the variant goes out bare.
    pub fn into_response_with(self, cors: &HeaderMap) -> Response {
        let status = self.status();
        match self {
            Rejection::HeaderPayload(_) => (status, self.to_string()).into_response(),
            _ => text_response(status, cors.clone(), self.to_string()),
        }
    }
}

/// Plain-text response with the given headers.
pub fn text_response(status: StatusCode, mut headers: HeaderMap, body: impl Into<Body>) -> Response {
    headers
        .entry(header::CONTENT_TYPE)
        .or_insert(HeaderValue::from_static("text/plain; charset=utf-8"));
    (status, headers, body.into()).into_response()
}
