//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the requester.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the requester.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RequesterConfig {
    /// Transport settings (base URL, timeout).
    pub transport: TransportConfig,

    /// Retry configuration.
    pub retries: RetryConfig,

    /// Request journal location.
    pub journal: JournalConfig,

    /// Short-lived response reuse.
    pub cache: CacheConfig,

    /// Credential source for scheduled requests.
    pub authentication: AuthenticationConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Transport configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Base URL every route is resolved against.
    pub base_url: String,

    /// Per-call timeout in seconds.
    pub timeout_secs: u64,

    /// Value of the `User-Agent` header.
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            timeout_secs: 30,
            user_agent: concat!("resumable-requester/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl TransportConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the initial attempt.
    pub max_retries: u32,

    /// Base delay for exponential backoff in milliseconds (0 = immediate).
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay_ms: 0,
            max_delay_ms: 2000,
        }
    }
}

/// Journal configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct JournalConfig {
    /// Journal file. In-memory when absent.
    pub path: Option<PathBuf>,
}

/// Response reuse configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Wrap the requester in the reuse cache.
    pub enabled: bool,

    /// How long a successful response is reused, in milliseconds.
    pub time_to_live_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            time_to_live_ms: 5000,
        }
    }
}

impl CacheConfig {
    pub fn time_to_live(&self) -> Duration {
        Duration::from_millis(self.time_to_live_ms)
    }
}

/// Credential source.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthenticationConfig {
    /// Bearer token. Takes precedence over `access_token_env`.
    pub access_token: Option<String>,

    /// Environment variable holding the bearer token.
    pub access_token_env: Option<String>,
}

impl Default for AuthenticationConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            access_token_env: Some("REQUESTER_ACCESS_TOKEN".to_string()),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON lines.
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}
