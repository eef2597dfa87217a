//! Network layer subsystem.
//!
//! The gateway binds plain TCP itself; when `[listener.tls]` is configured
//! the same listener is handed to axum-server with the rustls material
//! loaded here.

pub mod tls;

pub use tls::{load_tls_config, TlsError};
