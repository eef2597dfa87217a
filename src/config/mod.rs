//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayOptions (plain data)
//!     → gateway.rs (GatewayConfig: parsed header names, injected collaborators)
//!     → shared via Arc to every request task
//! ```
//!
//! # Design Decisions
//! - Config is immutable once built; there is no per-request mutation
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod gateway;
pub mod loader;
pub mod schema;
pub mod validation;

pub use gateway::GatewayConfig;
pub use loader::{load_config, ConfigError};
pub use schema::{
    AccessConfig, ForwardingConfig, GatewayOptions, ListenerConfig, LogFormat,
    ObservabilityConfig, RateLimitConfig, RequireHeader, TimeoutConfig, TlsConfig,
};
