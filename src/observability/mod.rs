//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher, forwarder, relays
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through every span via tower-http layers
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
