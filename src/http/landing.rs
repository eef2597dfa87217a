//! Landing page served at `/`, `/index.html`, and for paths without a target.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

const LANDING_PAGE: &str = include_str!("../../assets/index.html");

/// The fixed landing page, open to any origin.
pub fn landing_page() -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8")),
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*")),
        ],
        LANDING_PAGE,
    )
        .into_response()
}

/// True for the paths that always serve the landing page.
pub fn is_landing_path(path_and_query: &str) -> bool {
    matches!(path_and_query, "/" | "/index.html")
}
