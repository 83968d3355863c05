//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → RequesterConfig (validated, immutable)
//!     → used once to build transport, journal, lock and requester
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AuthenticationConfig, CacheConfig, JournalConfig, ObservabilityConfig, RequesterConfig,
    RetryConfig, TransportConfig,
};
pub use validation::{validate_config, ValidationError};
