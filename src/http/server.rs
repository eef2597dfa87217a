//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router; every path goes to the dispatcher
//! - Wire up middleware (tracing, request ID, timeout)
//! - Serve plain HTTP or terminate TLS on the bound listener
//! - Stop accepting on shutdown and drain in-flight requests

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::Response,
    routing::any,
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::{ConfigError, GatewayConfig, GatewayOptions};
use crate::forward::{Forwarder, UpstreamForwarder};
use crate::http::dispatch::{Gateway, Transport};
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::net::tls::{load_tls_config, TlsError};
use crate::observability::metrics;
use crate::streaming::{HlsRelay, StreamRelay};

/// Grace period for in-flight TLS connections after shutdown.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error(transparent)]
    Tls(#[from] TlsError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
    pub transport: Transport,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    options: GatewayOptions,
    gateway: Arc<Gateway>,
}

impl HttpServer {
    /// Build the server and its default collaborators from options.
    pub fn new(options: GatewayOptions) -> Result<Self, ServerError> {
        let config = GatewayConfig::from_options(&options)?;
        Self::with_config(options, config)
    }

    /// Use a prepared [`GatewayConfig`], e.g. one with a custom hook or
    /// rate limiter.
    pub fn with_config(options: GatewayOptions, config: GatewayConfig) -> Result<Self, ServerError> {
        let discovery = Arc::clone(&config.proxy_discovery);
        let forwarder =
            UpstreamForwarder::new(&options.forwarding, &options.timeouts, Arc::clone(&discovery))?;
        let streams = HlsRelay::new(&options.timeouts, discovery)?;
        Ok(Self::with_collaborators(
            options,
            config,
            Arc::new(forwarder),
            Arc::new(streams),
        ))
    }

    /// Replace the forwarding engine and the streaming relays.
    pub fn with_collaborators(
        options: GatewayOptions,
        config: GatewayConfig,
        forwarder: Arc<dyn Forwarder>,
        streams: Arc<dyn StreamRelay>,
    ) -> Self {
        let gateway = Arc::new(Gateway::new(Arc::new(config), forwarder, streams));
        Self { options, gateway }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(&self, transport: Transport) -> Router {
        let state = AppState {
            gateway: Arc::clone(&self.gateway),
            transport,
        };

        Router::new()
            .route("/", any(gateway_handler))
            .route("/{*path}", any(gateway_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(self.options.timeouts.request_secs)))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// Serve on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;

        if let Some(tls) = &self.options.listener.tls {
            let rustls = load_tls_config(tls).await?;
            let app = self
                .build_router(Transport::Tls)
                .into_make_service_with_connect_info::<SocketAddr>();

            let handle = axum_server::Handle::new();
            tokio::spawn({
                let handle = handle.clone();
                async move {
                    let _ = shutdown.recv().await;
                    handle.graceful_shutdown(Some(DRAIN_TIMEOUT));
                }
            });

            tracing::info!(address = %addr, "HTTPS server starting");
            axum_server::from_tcp_rustls(listener.into_std()?, rustls)
                .handle(handle)
                .serve(app)
                .await?;
        } else {
            let app = self
                .build_router(Transport::Plain)
                .into_make_service_with_connect_info::<SocketAddr>();

            tracing::info!(address = %addr, "HTTP server starting");
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown.recv().await;
                })
                .await?;
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn options(&self) -> &GatewayOptions {
        &self.options
    }
}

/// Every request, whatever its path, goes through the dispatcher.
async fn gateway_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();

    let response = state.gateway.dispatch(request, state.transport).await;

    metrics::record_request(&method, response.status().as_u16(), start);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, Method, StatusCode};
    use tower::ServiceExt;

    fn server() -> HttpServer {
        let mut options = GatewayOptions::default();
        options.forwarding.proxy_from_env = false;
        HttpServer::new(options).unwrap()
    }

    #[tokio::test]
    async fn router_serves_landing_page() {
        let app = server().build_router(Transport::Plain);

        let res = app
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert!(res.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn router_answers_preflight_on_any_path() {
        let app = server().build_router(Transport::Tls);

        let res = app
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/https://example.com/deep/path")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "PUT")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()[header::ACCESS_CONTROL_ALLOW_METHODS], "PUT");
    }
}
