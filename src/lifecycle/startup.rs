//! Startup orchestration.
//!
//! Config is already loaded and validated by the time we get here. Order:
//! metrics exporter, gateway and its clients, then the listener, so
//! traffic only arrives once everything behind it is ready.

use tokio::net::TcpListener;

use crate::config::GatewayOptions;
use crate::http::{HttpServer, ServerError};
use crate::lifecycle::Shutdown;
use crate::observability::metrics;

/// Run the gateway until `shutdown` fires.
pub async fn start(options: GatewayOptions, shutdown: &Shutdown) -> Result<(), ServerError> {
    if options.observability.metrics_enabled {
        match options.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %options.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let server = HttpServer::new(options)?;

    let listener = TcpListener::bind(&server.options().listener.bind_address).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        tls = server.options().listener.tls.is_some(),
        request_timeout_secs = server.options().timeouts.request_secs,
        "Listening for connections"
    );

    server.run(listener, shutdown.subscribe()).await
}
