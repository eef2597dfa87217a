//! Forwarding engine.
//!
//! # Data Flow
//! ```text
//! approved request + RequestState (target, proxy base URL, CORS grant)
//!     → discovery.rs (direct or via an outbound proxy?)
//!     → upstream.rs (send, follow redirects, relay the response)
//!     → Response streamed back to the client
//! ```
//!
//! # Design Decisions
//! - The dispatcher never writes a response once it hands off; the
//!   forwarder owns the rest of the response lifecycle
//! - Response bodies are streamed, so a client disconnect drops the
//!   upstream read

pub mod discovery;
pub mod upstream;

use axum::{body::Body, http::Request, response::Response};
use futures_util::future::BoxFuture;

use crate::http::state::RequestState;

pub use discovery::{EnvProxyDiscovery, NoProxyDiscovery, ProxyDiscovery};
pub use upstream::UpstreamForwarder;

/// Performs the upstream exchange for an approved request.
pub trait Forwarder: Send + Sync {
    fn forward(&self, request: Request<Body>, state: RequestState) -> BoxFuture<'_, Response>;
}
