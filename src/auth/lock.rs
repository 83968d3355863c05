//! Credential-caching authentication lock.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::auth::{AuthenticationError, AuthenticationLock, Authenticator, Credential};

/// Lock whose first unlock authenticates; later and concurrent unlocks reuse
/// the credential it obtained.
///
/// A failed authentication clears the cached credential so the next unlock
/// starts over.
pub struct SchedulingLock<A> {
    authenticator: A,
    credential: ArcSwapOption<Credential>,
    /// Held while an authentication flow runs; waiters re-check the cache after acquiring it.
    unlocking: Mutex<()>,
}

impl<A: Authenticator> SchedulingLock<A> {
    pub fn new(authenticator: A) -> Self {
        Self {
            authenticator,
            credential: ArcSwapOption::empty(),
            unlocking: Mutex::new(()),
        }
    }

    /// Whether a credential is currently cached.
    pub fn is_unlocked(&self) -> bool {
        self.credential.load().is_some()
    }

    /// Drop the cached credential (e.g. after a 401).
    pub fn invalidate(&self) {
        self.credential.store(None);
        tracing::debug!("Cached credential invalidated");
    }

    fn cached(&self) -> Option<Credential> {
        self.credential.load_full().map(|c| (*c).clone())
    }
}

#[async_trait]
impl<A: Authenticator> AuthenticationLock for SchedulingLock<A> {
    async fn request_unlock(&self) -> Result<Credential, AuthenticationError> {
        if let Some(credential) = self.cached() {
            return Ok(credential);
        }

        let _guard = self.unlocking.lock().await;
        if let Some(credential) = self.cached() {
            return Ok(credential);
        }

        match self.authenticator.authenticate().await {
            Ok(credential) => {
                self.credential.store(Some(Arc::new(credential.clone())));
                tracing::info!("Authentication succeeded");
                Ok(credential)
            }
            Err(e) => {
                self.credential.store(None);
                tracing::warn!(error = %e, "Authentication failed");
                Err(e)
            }
        }
    }
}
