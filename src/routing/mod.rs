//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Request path ("/https://example.com/a")
//!     → target.rs (scheme / hostname / port / path)
//!     → hostname.rs (is the hostname proxy-able?)
//!     → Return: Target, or no target
//! ```
//!
//! # Design Decisions
//! - Pure functions of the path string, no allocation beyond the Target
//! - Deterministic: same path always yields the same Target
//! - Port range is not enforced here; the dispatcher rejects it with a
//!   dedicated error

pub mod hostname;
pub mod target;

pub use hostname::is_valid_hostname;
pub use target::{Scheme, Target};
