//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, bounded retries)
//! - Reject unusable URLs and log levels before anything is built
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RequesterConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;
use url::Url;

use crate::config::schema::RequesterConfig;

/// Upper bound on configured retries.
pub const MAX_RETRIES_LIMIT: u32 = 10;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

pub fn validate_config(config: &RequesterConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match Url::parse(&config.transport.base_url) {
        Ok(url) if url.cannot_be_a_base() => errors.push(ValidationError::new(
            "transport.base_url",
            format!("'{}' cannot be used as a base URL", config.transport.base_url),
        )),
        Ok(_) => {}
        Err(e) => errors.push(ValidationError::new(
            "transport.base_url",
            format!("'{}' is not a valid URL: {}", config.transport.base_url, e),
        )),
    }

    if config.transport.timeout_secs == 0 {
        errors.push(ValidationError::new("transport.timeout_secs", "must be greater than 0"));
    }

    if config.retries.max_retries > MAX_RETRIES_LIMIT {
        errors.push(ValidationError::new(
            "retries.max_retries",
            format!("must be at most {}", MAX_RETRIES_LIMIT),
        ));
    }

    if config.retries.max_delay_ms < config.retries.base_delay_ms {
        errors.push(ValidationError::new(
            "retries.max_delay_ms",
            "must not be smaller than retries.base_delay_ms",
        ));
    }

    if config.cache.enabled && config.cache.time_to_live_ms == 0 {
        errors.push(ValidationError::new(
            "cache.time_to_live_ms",
            "must be greater than 0 when the cache is enabled",
        ));
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("unknown level '{}'", config.observability.log_level),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
