//! Admission pipeline tests against a running gateway.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};

use cors_gateway::config::{GatewayConfig, RequireHeader};
use cors_gateway::http::InitialRequestHandler;
use cors_gateway::routing::Target;

mod common;

#[tokio::test]
async fn preflight_answered_before_policy() {
    let mut options = common::test_options();
    options.access.origin_whitelist = vec!["http://allowed.test".into()];
    options.access.cors_max_age = 600;
    let gateway = common::spawn_gateway(options).await;

    let res = common::client()
        .request(reqwest::Method::OPTIONS, gateway.url("/http://example.com/"))
        .header("origin", "http://not-allowed.test")
        .header("access-control-request-method", "DELETE")
        .header("access-control-request-headers", "x-custom")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["access-control-allow-origin"], "*");
    assert_eq!(res.headers()["access-control-allow-methods"], "DELETE");
    assert_eq!(res.headers()["access-control-allow-headers"], "x-custom");
    assert_eq!(res.headers()["access-control-max-age"], "600");
    assert!(res.text().await.unwrap().is_empty());
}

#[tokio::test]
async fn preflight_ignores_blacklist_header_and_rate_rules() {
    let mut options = common::test_options();
    options.access.origin_blacklist = vec!["http://evil.test".into()];
    options.access.require_header = Some(RequireHeader::One("x-requested-with".into()));
    options.rate_limit.enabled = true;
    options.rate_limit.requests_per_second = 1;
    options.rate_limit.burst_size = 1;
    let gateway = common::spawn_gateway(options).await;

    for _ in 0..3 {
        let res = common::client()
            .request(reqwest::Method::OPTIONS, gateway.url("/http://example.com/"))
            .header("origin", "http://evil.test")
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 200);
        assert_eq!(res.headers()["access-control-allow-origin"], "*");
        assert!(res.text().await.unwrap().is_empty());
    }
}

#[tokio::test]
async fn landing_page_is_open() {
    let mut options = common::test_options();
    options.access.require_header = Some(RequireHeader::One("x-requested-with".into()));
    let gateway = common::spawn_gateway(options).await;

    for path in ["/", "/index.html"] {
        let res = common::client().get(gateway.url(path)).send().await.unwrap();
        assert_eq!(res.status(), 200, "{path}");
        assert_eq!(res.headers()["access-control-allow-origin"], "*");
        assert!(res.headers()["content-type"].to_str().unwrap().starts_with("text/html"));
        assert!(!res.text().await.unwrap().is_empty());
    }
}

#[tokio::test]
async fn missing_slash_after_scheme() {
    let gateway = common::spawn_gateway(common::test_options()).await;

    let res = common::client()
        .get(gateway.url("/https:/example.com/"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 400);
    assert_eq!(res.headers()["access-control-allow-origin"], "*");
    assert_eq!(
        res.text().await.unwrap(),
        "The URL is invalid: two slashes are needed after the http(s):."
    );
}

#[tokio::test]
async fn port_out_of_range() {
    let gateway = common::spawn_gateway(common::test_options()).await;

    let res = common::client()
        .get(gateway.url("/http://example.com:70000/"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 400);
    assert_eq!(res.text().await.unwrap(), "Port number too large: 70000");
}

#[tokio::test]
async fn diagnostic_host() {
    let mut options = common::test_options();
    options.access.require_header = Some(RequireHeader::One("x-requested-with".into()));
    let gateway = common::spawn_gateway(options).await;

    let res = common::client().get(gateway.url("/iscorsneeded")).send().await.unwrap();

    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["content-type"], "text/plain");
    assert_eq!(res.text().await.unwrap(), "no");
}

#[tokio::test]
async fn required_header() {
    let mut options = common::test_options();
    options.access.require_header = Some(RequireHeader::Many(vec![
        "Origin".into(),
        "X-Requested-With".into(),
    ]));
    let gateway = common::spawn_gateway(options).await;
    let (backend, _) =
        common::start_scripted_backend(vec![common::http_response("200 OK", &[], "ok")]).await;

    let res = common::client()
        .get(gateway.url(&format!("/http://{backend}/")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);
    assert_eq!(res.headers()["access-control-allow-origin"], "*");
    assert_eq!(
        res.text().await.unwrap(),
        "Missing required request header. Must specify one of: origin,x-requested-with"
    );

    let res = common::client()
        .get(gateway.url(&format!("/http://{backend}/")))
        .header("X-Requested-With", "XMLHttpRequest")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn blacklist_checked_before_whitelist() {
    let mut options = common::test_options();
    options.access.origin_blacklist = vec!["http://evil.test".into()];
    options.access.origin_whitelist = vec!["http://evil.test".into(), "http://good.test".into()];
    let gateway = common::spawn_gateway(options).await;

    let res = common::client()
        .get(gateway.url("/http://example.com/"))
        .header("origin", "http://evil.test")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 403);
    assert_eq!(res.text().await.unwrap(), "The origin \"http://evil.test\" was blacklisted.");

    let res = common::client()
        .get(gateway.url("/http://example.com/"))
        .header("origin", "http://stranger.test")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 403);
    assert_eq!(res.headers()["access-control-allow-origin"], "*");
    assert_eq!(
        res.text().await.unwrap(),
        "The origin \"http://stranger.test\" was not whitelisted."
    );
}

#[tokio::test]
async fn rate_limited_per_origin() {
    let mut options = common::test_options();
    options.rate_limit.enabled = true;
    options.rate_limit.requests_per_second = 1;
    options.rate_limit.burst_size = 1;
    options.rate_limit.exempt_origins = vec!["http://trusted.test".into()];
    let gateway = common::spawn_gateway(options).await;
    let (backend, _) =
        common::start_scripted_backend(vec![common::http_response("200 OK", &[], "ok")]).await;
    let url = gateway.url(&format!("/http://{backend}/"));

    let first = common::client().get(&url).header("origin", "http://busy.test").send().await.unwrap();
    assert_eq!(first.status(), 200);

    let second = common::client().get(&url).header("origin", "http://busy.test").send().await.unwrap();
    assert_eq!(second.status(), 429);
    assert!(second.text().await.unwrap().contains("http://busy.test"));

    for _ in 0..3 {
        let res = common::client().get(&url).header("origin", "http://trusted.test").send().await.unwrap();
        assert_eq!(res.status(), 200);
    }
}

#[tokio::test]
async fn unknown_local_endpoint() {
    let gateway = common::spawn_gateway(common::test_options()).await;

    let res = common::client().get(gateway.url("/robots")).send().await.unwrap();

    assert_eq!(res.status(), 404);
    assert_eq!(res.headers()["access-control-allow-origin"], "*");
    assert_eq!(res.text().await.unwrap(), "Invalid host: robots");
}

struct BlockHost(&'static str);

impl InitialRequestHandler for BlockHost {
    fn handle(&self, _request: &Request<Body>, target: Option<&Target>) -> Option<Response> {
        target
            .filter(|t| t.hostname() == self.0)
            .map(|_| (StatusCode::GONE, "blocked by hook").into_response())
    }
}

#[tokio::test]
async fn initial_request_hook_short_circuits() {
    let options = common::test_options();
    let config = GatewayConfig::from_options(&options)
        .unwrap()
        .with_initial_request_handler(Arc::new(BlockHost("blocked.test")));
    let gateway = common::spawn_gateway_with(options, config).await;

    let res = common::client()
        .get(gateway.url("/http://blocked.test/"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 410);
    assert_eq!(res.text().await.unwrap(), "blocked by hook");
}

#[tokio::test]
async fn responses_carry_request_id() {
    let gateway = common::spawn_gateway(common::test_options()).await;

    let res = common::client().get(gateway.url("/")).send().await.unwrap();
    assert!(res.headers().contains_key("x-request-id"));

    let res = common::client()
        .get(gateway.url("/"))
        .header("x-request-id", "client-chosen")
        .send()
        .await
        .unwrap();
    assert_eq!(res.headers()["x-request-id"], "client-chosen");
}

#[tokio::test]
async fn shutdown_stops_server() {
    let gateway = common::spawn_gateway(common::test_options()).await;
    gateway.shutdown.trigger();

    let result = tokio::time::timeout(Duration::from_secs(5), gateway.task)
        .await
        .expect("server did not stop")
        .unwrap();
    assert!(result.is_ok());
}
