//! CORS gateway library.
//!
//! Proxies browser requests to the URL embedded in the request path
//! (`/https://example.com/data.json`) and adds CORS headers to the answer,
//! subject to origin, header and rate policies. Two local endpoints relay
//! HLS playlists and segments.

pub mod config;
pub mod forward;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod routing;
pub mod security;
pub mod streaming;

pub use config::{GatewayConfig, GatewayOptions};
pub use http::{Gateway, HttpServer};
pub use lifecycle::Shutdown;
