//! TLS termination on the gateway's own listener.

mod common;

use cors_gateway::config::TlsConfig;

use common::http_response;

fn fixture(name: &str) -> String {
    format!("{}/tests/fixtures/{name}", env!("CARGO_MANIFEST_DIR"))
}

fn tls_client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .danger_accept_invalid_certs(true)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

#[tokio::test]
async fn serves_https_on_bound_listener() {
    let (backend, _) = common::start_scripted_backend(vec![http_response(
        "307 Temporary Redirect",
        &[("Location", "/next")],
        "",
    )])
    .await;
    let mut options = common::test_options();
    options.listener.tls = Some(TlsConfig {
        cert_path: fixture("localhost.crt"),
        key_path: fixture("localhost.key"),
    });
    let gateway = common::spawn_gateway(options).await;
    let base = format!("https://{}", gateway.addr);

    let res = tls_client().get(format!("{base}/")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["access-control-allow-origin"], "*");

    let res = tls_client()
        .get(format!("{base}/http://{backend}/start"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 307);
    assert_eq!(
        res.headers()["location"],
        format!("https://{}/http://{backend}/next", gateway.addr)
    );

    // Plain HTTP on the same port is not served.
    assert!(common::client().get(gateway.url("/")).send().await.is_err());
}
