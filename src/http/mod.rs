//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, request ID, tracing, timeout)
//!     → dispatch.rs (admission and routing pipeline)
//!         → hooks.rs (pre-dispatch extension point)
//!         → landing.rs (documentation page)
//!         → response.rs (rejections with CORS headers)
//!     → forwarder or streaming relay, carrying state.rs
//!     → Send to client
//! ```

pub mod dispatch;
pub mod hooks;
pub mod landing;
pub mod request;
pub mod response;
pub mod server;
pub mod state;

pub use dispatch::{Gateway, Transport, DIAGNOSTIC_HOST};
pub use hooks::{InitialRequestHandler, PassThrough};
pub use request::X_REQUEST_ID;
pub use response::Rejection;
pub use server::{HttpServer, ServerError};
pub use state::RequestState;
