//! Authentication gating.
//!
//! # Data Flow
//! ```text
//! Scheduled request task
//!     → AuthenticationLock::request_unlock (single await point)
//!         → lock.rs: cached credential? reuse it
//!         → otherwise Authenticator::authenticate (concurrent unlocks wait on it)
//!     → Credential::authorization() attached to the transport call
//! ```
//!
//! # Design Decisions
//! - The lock is injected into the requester, never looked up globally
//! - Dropping the unlock future cancels the credential fetch
//! - Authentication failures are not retried by the requester

pub mod lock;

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

pub use lock::SchedulingLock;

/// Bearer credential for an authenticated actor.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    access_token: String,
}

impl Credential {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Value of the `Authorization` header.
    pub fn authorization(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .finish()
    }
}

/// Reasons a credential could not be produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthenticationError {
    /// No credential has been provisioned.
    #[error("no credential configured")]
    MissingCredential,

    /// The authentication flow ran and was rejected.
    #[error("authentication failed: {0}")]
    Failed(String),

    /// The requester has no lock to unlock scheduled requests with.
    #[error("no authentication lock configured")]
    NoLock,
}

/// Asynchronous gate in front of requests that need a credential.
#[async_trait]
pub trait AuthenticationLock: Send + Sync {
    /// Suspend until a valid credential exists and return it.
    async fn request_unlock(&self) -> Result<Credential, AuthenticationError>;
}

/// Runs the actual authentication flow on behalf of a lock.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self) -> Result<Credential, AuthenticationError>;
}

/// Authenticator backed by a pre-provisioned access token.
#[derive(Clone, Default)]
pub struct TokenAuthenticator {
    token: Option<String>,
}

impl TokenAuthenticator {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: token.filter(|t| !t.trim().is_empty()),
        }
    }

    /// Take the token from `explicit`, falling back to the environment variable `env_var`.
    pub fn from_sources(explicit: Option<&str>, env_var: Option<&str>) -> Self {
        let token = explicit
            .map(str::to_string)
            .or_else(|| env_var.and_then(|name| std::env::var(name).ok()));
        Self::new(token)
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }
}

#[async_trait]
impl Authenticator for TokenAuthenticator {
    async fn authenticate(&self) -> Result<Credential, AuthenticationError> {
        self.token
            .as_deref()
            .map(Credential::new)
            .ok_or(AuthenticationError::MissingCredential)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_is_redacted() {
        let credential = Credential::new("s3cr3t");
        assert_eq!(credential.authorization(), "Bearer s3cr3t");
        assert!(!format!("{:?}", credential).contains("s3cr3t"));
    }

    #[tokio::test]
    async fn test_token_authenticator() {
        let authenticator = TokenAuthenticator::new(Some("abc".into()));
        assert_eq!(authenticator.authenticate().await.unwrap(), Credential::new("abc"));

        let blank = TokenAuthenticator::new(Some("  ".into()));
        assert!(!blank.has_token());
        assert_eq!(
            blank.authenticate().await.unwrap_err(),
            AuthenticationError::MissingCredential
        );
    }

    #[test]
    fn test_explicit_token_wins_over_environment() {
        let unset = Some("REQUESTER_TEST_UNSET_VARIABLE");
        let authenticator = TokenAuthenticator::from_sources(Some("explicit"), unset);
        assert!(authenticator.has_token());

        let none = TokenAuthenticator::from_sources(None, unset);
        assert!(!none.has_token());
    }
}
