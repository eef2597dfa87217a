//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use cors_gateway::config::{GatewayConfig, GatewayOptions};
use cors_gateway::forward::ProxyDiscovery;
use cors_gateway::http::{HttpServer, ServerError};
use cors_gateway::lifecycle::Shutdown;

/// A gateway running on an ephemeral port.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub task: JoinHandle<Result<(), ServerError>>,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Options for tests: loopback bind, no proxies from the environment.
pub fn test_options() -> GatewayOptions {
    let mut options = GatewayOptions::default();
    options.listener.bind_address = "127.0.0.1:0".to_string();
    options.forwarding.proxy_from_env = false;
    options
}

pub async fn spawn_gateway(options: GatewayOptions) -> TestGateway {
    let config = GatewayConfig::from_options(&options).unwrap();
    spawn_gateway_with(options, config).await
}

pub async fn spawn_gateway_with(options: GatewayOptions, config: GatewayConfig) -> TestGateway {
    let server = HttpServer::with_config(options, config).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let task = tokio::spawn(async move { server.run(listener, server_shutdown).await });

    TestGateway { addr, shutdown, task }
}

/// Gateway whose upstream traffic all goes through the HTTP proxy at `proxy`.
pub async fn spawn_gateway_via_proxy(proxy: SocketAddr) -> TestGateway {
    let options = test_options();
    let config = GatewayConfig::from_options(&options)
        .unwrap()
        .with_proxy_discovery(Arc::new(FixedProxy(format!("http://{proxy}"))));
    spawn_gateway_with(options, config).await
}

/// Sends every upstream URL to the same proxy.
pub struct FixedProxy(pub String);

impl ProxyDiscovery for FixedProxy {
    fn proxy_for_url(&self, _url: &url::Url) -> Option<String> {
        Some(self.0.clone())
    }
}

/// Client that neither follows redirects nor uses proxies.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .redirect(reqwest::redirect::Policy::none())
        .pool_max_idle_per_host(0)
        .build()
        .unwrap()
}

/// Raw requests (head and body) received by a scripted backend.
pub type Recorded = Arc<Mutex<Vec<String>>>;

/// Backend answering the n-th connection with `responses[n]` (the last
/// response repeats). Every response should close the connection.
pub async fn start_scripted_backend(responses: Vec<String>) -> (SocketAddr, Recorded) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let recorded: Recorded = Arc::new(Mutex::new(Vec::new()));
    let responses = Arc::new(responses);

    let seen = recorded.clone();
    tokio::spawn(async move {
        let mut n = 0;
        while let Ok((mut socket, _)) = listener.accept().await {
            let response = responses[n.min(responses.len() - 1)].clone();
            n += 1;
            let seen = seen.clone();
            tokio::spawn(async move {
                let request = read_request(&mut socket).await;
                seen.lock().unwrap().push(request);
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (addr, recorded)
}

/// Plain `HTTP/1.1` response with `Connection: close`.
pub fn http_response(status: &str, headers: &[(&str, &str)], body: &str) -> String {
    let mut response = format!("HTTP/1.1 {status}\r\n");
    for (name, value) in headers {
        response.push_str(&format!("{name}: {value}\r\n"));
    }
    response.push_str(&format!(
        "Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    ));
    response
}

async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let head_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return String::from_utf8_lossy(&buf).into_owned(),
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_ascii_lowercase();
    let content_length = head
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < head_end + content_length {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }

    String::from_utf8_lossy(&buf).into_owned()
}

/// An address nothing listens on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}
