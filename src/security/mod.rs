//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → cors.rs (compute the CORS grant, consume preflight hints)
//!     → policy.rs (required header, blacklist, whitelist)
//!     → rate_limit.rs (per-origin budget)
//!     → headers.rs (strip / force headers before forwarding)
//!     → Pass to forwarding
//! ```
//!
//! # Design Decisions
//! - Fail closed: reject on the first violated rule
//! - Header collections are `HeaderMap`s, so names compare case-insensitively
//! - Rate limiter state is the only shared mutable state in the pipeline

pub mod cors;
pub mod headers;
pub mod policy;
pub mod rate_limit;

pub use cors::CorsGrant;
pub use policy::PolicyEngine;
pub use rate_limit::{NoRateLimit, OriginRateLimiter, RateLimitCheck};
