//! HLS playlist relay.
//!
//! Fetches a playlist and rewrites every URI in it so the player keeps
//! talking to the gateway: variant and rendition playlists go back through
//! `/m3u8-proxy`, media segments, keys and init maps through `/ts-proxy`.
//! The same header overrides ride along on every rewritten link.

use axum::{
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use url::{form_urlencoded, Url};

use crate::http::response::text_response;
use crate::security::cors::wildcard_headers;
use crate::streaming::{override_headers, HeaderOverrides, StreamEndpoint};

const MASTER_TAG: &str = "#EXT-X-STREAM-INF";
const URI_ATTR: &str = "URI=\"";
const PLAYLIST_CONTENT_TYPE: &str = "application/vnd.apple.mpegurl";

pub(crate) async fn relay_manifest(
    client: &reqwest::Client,
    url: String,
    headers: HeaderOverrides,
) -> Response {
    let playlist_url = match Url::parse(&url) {
        Ok(url) => url,
        Err(e) => return relay_error(&url, e),
    };

    let upstream = client
        .get(playlist_url)
        .headers(override_headers(&headers))
        .send()
        .await
        .and_then(reqwest::Response::error_for_status);
    let upstream = match upstream {
        Ok(response) => response,
        Err(e) => return relay_error(&url, e),
    };

    // Relative URIs resolve against where the playlist actually came from.
    let base = upstream.url().clone();
    let playlist = match upstream.text().await {
        Ok(text) => text,
        Err(e) => return relay_error(&url, e),
    };

    tracing::debug!(url = %base, master = playlist.contains(MASTER_TAG), "Rewriting playlist");

    let mut response_headers: HeaderMap = wildcard_headers().into_iter().collect();
    response_headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(PLAYLIST_CONTENT_TYPE));
    (StatusCode::OK, response_headers, rewrite_playlist(&playlist, &base, &headers)).into_response()
}

/// Rewrite every URI in `playlist` to a gateway link.
pub fn rewrite_playlist(playlist: &str, base: &Url, headers: &HeaderOverrides) -> String {
    let endpoint = if playlist.contains(MASTER_TAG) {
        StreamEndpoint::Manifest
    } else {
        StreamEndpoint::Segment
    };
    let encoded_headers = serde_json::to_string(headers).unwrap_or_else(|_| "{}".to_string());
    let link = |uri: &str| gateway_link(endpoint, base, uri, &encoded_headers);

    let mut rewritten = playlist
        .lines()
        .map(|line| {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                line.to_string()
            } else if trimmed.starts_with('#') {
                rewrite_uri_attributes(line, &link)
            } else {
                link(trimmed).unwrap_or_else(|| line.to_string())
            }
        })
        .collect::<Vec<_>>()
        .join("\n");
    if playlist.ends_with('\n') {
        rewritten.push('\n');
    }
    rewritten
}

fn gateway_link(endpoint: StreamEndpoint, base: &Url, uri: &str, encoded_headers: &str) -> Option<String> {
    let resolved = base.join(uri).ok()?;
    Some(format!(
        "{}?url={}&headers={}",
        endpoint.path(),
        encode(resolved.as_str()),
        encode(encoded_headers)
    ))
}

fn rewrite_uri_attributes(line: &str, link: &impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(line.len());
    let mut rest = line;

    while let Some(start) = rest.find(URI_ATTR) {
        let value_start = start + URI_ATTR.len();
        let Some(len) = rest[value_start..].find('"') else {
            break;
        };
        let uri = &rest[value_start..value_start + len];

        out.push_str(&rest[..value_start]);
        out.push_str(&link(uri).unwrap_or_else(|| uri.to_string()));
        out.push('"');
        rest = &rest[value_start + len + 1..];
    }

    out.push_str(rest);
    out
}

fn encode(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

fn relay_error(url: &str, error: impl std::fmt::Display) -> Response {
    tracing::error!(url = %url, error = %error, "Playlist relay failed");
    text_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        wildcard_headers().into_iter().collect(),
        error.to_string(),
    )
}
