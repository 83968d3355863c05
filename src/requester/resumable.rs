//! Short-lived response reuse on top of a requester.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::clock::Clock;
use crate::error::RequesterResult;
use crate::observability::metrics;
use crate::request::{RequestDescriptor, Resumption};
use crate::requester::{RequestExecutor, ResumeSummary};
use crate::transport::Response;

pub const DEFAULT_TIME_TO_LIVE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
struct CachedResponse {
    response: Response,
    timestamp: Duration,
}

/// Decorator that answers repeated requests from a TTL cache.
///
/// A successful response is reused for `time_to_live` after it was stored,
/// including for sequential (non-overlapping) calls. Failures are never cached.
pub struct ResumableRequester<R> {
    inner: R,
    clock: Arc<dyn Clock>,
    time_to_live: Duration,
    reuse: DashMap<RequestDescriptor, CachedResponse>,
}

impl<R: RequestExecutor> ResumableRequester<R> {
    pub fn new(inner: R, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner,
            clock,
            time_to_live: DEFAULT_TIME_TO_LIVE,
            reuse: DashMap::new(),
        }
    }

    pub fn with_time_to_live(mut self, time_to_live: Duration) -> Self {
        self.time_to_live = time_to_live;
        self
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    pub fn time_to_live(&self) -> Duration {
        self.time_to_live
    }

    /// Number of cached responses, stale ones included.
    pub fn cached_count(&self) -> usize {
        self.reuse.len()
    }

    /// Evict every stale entry. Returns how many were evicted.
    pub fn purge_stale(&self) -> usize {
        let now = self.clock.now();
        let before = self.reuse.len();
        self.reuse.retain(|_, cached| !self.is_stale(cached, now));
        before.saturating_sub(self.reuse.len())
    }

    fn is_stale(&self, cached: &CachedResponse, now: Duration) -> bool {
        now.saturating_sub(cached.timestamp) >= self.time_to_live
    }

    fn lookup(&self, descriptor: &RequestDescriptor) -> Option<Response> {
        let now = self.clock.now();
        self.reuse
            .remove_if(descriptor, |_, cached| self.is_stale(cached, now));
        self.reuse.get(descriptor).map(|cached| cached.response.clone())
    }
}

#[async_trait]
impl<R: RequestExecutor> RequestExecutor for ResumableRequester<R> {
    async fn execute(
        &self,
        descriptor: RequestDescriptor,
        resumption: Resumption,
    ) -> RequesterResult<Response> {
        if let Some(response) = self.lookup(&descriptor) {
            metrics::record_cache_lookup(true);
            tracing::debug!(request = %descriptor, "Reusing cached response");
            return Ok(response);
        }
        metrics::record_cache_lookup(false);

        let response = self.inner.execute(descriptor.clone(), resumption).await?;
        self.reuse.insert(
            descriptor,
            CachedResponse {
                response: response.clone(),
                timestamp: self.clock.now(),
            },
        );
        Ok(response)
    }

    async fn resume(&self) -> RequesterResult<ResumeSummary> {
        self.inner.resume().await
    }

    fn interrupt(&self) -> usize {
        self.inner.interrupt()
    }
}
