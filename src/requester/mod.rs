//! Request orchestration.
//!
//! # Responsibilities
//! - Deduplicate concurrent identical requests onto one operation
//! - Gate scheduled requests on the authentication lock
//! - Retry transport failures a bounded number of times
//! - Journal resumable requests so they survive interruption and restarts
//!
//! # Data Flow
//! ```text
//! execute(descriptor, resumption)
//!     → registry.rs: join the in-flight operation, or register a gated task
//!     → journal insert (Resumable caller, registering or joining)
//!     → task released:
//!         → AuthenticationLock::request_unlock (Scheduled)
//!         → Transport::send, retried per RetryPolicy
//!         → journal delete on success, whatever the callers' policies
//!         → registry entry removed (own id only)
//!     → every caller receives the shared outcome
//!
//! interrupt() → abort every registered task, clear the registry, keep journal rows
//! resume()    → replay journal rows through execute()
//! ```
//!
//! # Design Decisions
//! - Operations run as spawned tasks so a dropped caller never cancels work others await
//! - Registration happens before the task body may run (oneshot start gate)
//! - A resumable caller's row exists before the task is released, so an
//!   interruption at any point leaves something to resume
//! - Joiner rows and the success delete are ordered by the operation's
//!   settlement lock
//! - Interruption is an abort, surfaced to all callers as `Interrupted`
//! - resumable.rs layers a short-lived response reuse cache on top

pub mod registry;
pub mod resumable;

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::{join_all, FutureExt};
use tokio::sync::oneshot;
use tracing::Instrument;
use uuid::Uuid;

use crate::auth::{AuthenticationError, AuthenticationLock, SchedulingLock, TokenAuthenticator};
use crate::config::RequesterConfig;
use crate::error::{RequesterError, RequesterResult};
use crate::journal::{FileJournal, InMemoryJournal, JournalEntry, RequestJournal};
use crate::observability::metrics;
use crate::request::{Authentication, FormPart, Parameters, RequestDescriptor, Resumption};
use crate::resilience::RetryPolicy;
use crate::transport::{HttpTransport, Response, Transport, TransportError};

pub use registry::{OperationRegistry, Registration, Settlement};
pub use resumable::{ResumableRequester, DEFAULT_TIME_TO_LIVE};

/// Outcome of replaying the journal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResumeSummary {
    /// Rows replayed successfully.
    pub resumed: usize,
    /// Rows whose replay failed or was interrupted; they stay journaled.
    pub failed: usize,
    /// Non-resumable rows deleted without dispatch.
    pub discarded: usize,
}

/// Consumer-facing request surface.
#[async_trait]
pub trait RequestExecutor: Send + Sync {
    /// Execute one logical request.
    async fn execute(
        &self,
        descriptor: RequestDescriptor,
        resumption: Resumption,
    ) -> RequesterResult<Response>;

    /// Replay every journaled request.
    async fn resume(&self) -> RequesterResult<ResumeSummary>;

    /// Cancel every in-flight operation. Returns how many were cancelled.
    fn interrupt(&self) -> usize;

    async fn get(
        &self,
        authentication: Authentication,
        route: &str,
        resumption: Resumption,
    ) -> RequesterResult<Response> {
        self.execute(RequestDescriptor::get(route, authentication), resumption)
            .await
    }

    async fn post(
        &self,
        authentication: Authentication,
        route: &str,
        parameters: Parameters,
        resumption: Resumption,
    ) -> RequesterResult<Response> {
        let descriptor = RequestDescriptor::post(route, authentication).with_parameters(parameters);
        self.execute(descriptor, resumption).await
    }

    /// POST a `multipart/form-data` body made of `parts`.
    async fn post_multipart(
        &self,
        authentication: Authentication,
        route: &str,
        parts: Vec<FormPart>,
        resumption: Resumption,
    ) -> RequesterResult<Response> {
        let descriptor = RequestDescriptor::post(route, authentication).with_parts(parts);
        self.execute(descriptor, resumption).await
    }

    async fn delete(
        &self,
        authentication: Authentication,
        route: &str,
        resumption: Resumption,
    ) -> RequesterResult<Response> {
        self.execute(RequestDescriptor::delete(route, authentication), resumption)
            .await
    }
}

/// Deduplicating, authenticating, retrying, journaling requester.
#[derive(Clone)]
pub struct Requester {
    transport: Arc<dyn Transport>,
    journal: Arc<dyn RequestJournal>,
    lock: Option<Arc<dyn AuthenticationLock>>,
    retry: RetryPolicy,
    ongoing: Arc<OperationRegistry>,
}

impl Requester {
    pub fn new(transport: Arc<dyn Transport>, journal: Arc<dyn RequestJournal>) -> Self {
        Self {
            transport,
            journal,
            lock: None,
            retry: RetryPolicy::default(),
            ongoing: Arc::new(OperationRegistry::new()),
        }
    }

    /// Build the HTTP transport, journal and token lock described by `config`.
    pub async fn from_config(config: &RequesterConfig) -> RequesterResult<Self> {
        let transport = Arc::new(HttpTransport::new(&config.transport)?);
        let journal: Arc<dyn RequestJournal> = match &config.journal.path {
            Some(path) => Arc::new(FileJournal::open(path).await?),
            None => Arc::new(InMemoryJournal::new()),
        };
        let authenticator = TokenAuthenticator::from_sources(
            config.authentication.access_token.as_deref(),
            config.authentication.access_token_env.as_deref(),
        );
        if !authenticator.has_token() {
            tracing::debug!(
                "No access token configured; scheduled requests will fail to unlock"
            );
        }

        Ok(Self::new(transport, journal)
            .with_authentication_lock(Arc::new(SchedulingLock::new(authenticator)))
            .with_retry_policy(RetryPolicy::from(&config.retries)))
    }

    pub fn with_authentication_lock(mut self, lock: Arc<dyn AuthenticationLock>) -> Self {
        self.lock = Some(lock);
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn journal(&self) -> &Arc<dyn RequestJournal> {
        &self.journal
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Number of operations currently in flight.
    pub fn ongoing_count(&self) -> usize {
        self.ongoing.len()
    }

    /// Execute `descriptor`, joining an identical in-flight operation if one exists.
    ///
    /// A `Resumable` caller's journal row is written before this returns
    /// control to the operation: before the task is released when the caller
    /// registers it, before waiting on it when the caller joins.
    pub async fn dispatch(
        &self,
        descriptor: RequestDescriptor,
        resumption: Resumption,
    ) -> RequesterResult<Response> {
        let registration = self
            .ongoing
            .join_or_register(&descriptor, || self.launch(descriptor.clone()));

        match registration {
            Registration::Joined {
                response,
                settlement,
            } => {
                tracing::debug!(request = %descriptor, "Joined in-flight request");
                metrics::record_dedup_join();
                if resumption.is_resumable() {
                    let settlement = settlement.lock().await;
                    if *settlement == Settlement::Pending {
                        self.journal_request(&descriptor, resumption).await?;
                    }
                }
                response.await
            }
            Registration::Registered { response, start, .. } => {
                let journaled = if resumption.is_resumable() {
                    self.journal_request(&descriptor, resumption).await
                } else {
                    Ok(())
                };
                // The receiver only disappears if the task was already aborted.
                let _ = start.send(journaled);
                response.await
            }
        }
    }

    async fn journal_request(
        &self,
        descriptor: &RequestDescriptor,
        resumption: Resumption,
    ) -> RequesterResult<()> {
        self.journal
            .insert(JournalEntry::new(descriptor.clone(), resumption))
            .await?;
        tracing::debug!(request = %descriptor, "Request journaled");
        Ok(())
    }

    /// Spawn the operation task for `descriptor`, held until its start signal.
    fn launch(&self, descriptor: RequestDescriptor) -> registry::LaunchedOperation {
        let id = Uuid::new_v4();
        let settlement = registry::settlement_lock();
        let (start, gate) = oneshot::channel::<RequesterResult<()>>();
        let span = tracing::info_span!(
            "request",
            operation_id = %id,
            method = descriptor.method().as_str(),
            route = descriptor.route()
        );

        let this = self.clone();
        let task_descriptor = descriptor.clone();
        let task_settlement = settlement.clone();
        let handle = tokio::spawn(
            async move {
                // A dropped signal means the registering caller went away; the
                // joiners still wait on this operation.
                let result = match gate.await {
                    Ok(Err(e)) => Err(e),
                    _ => this.perform(&task_descriptor, &task_settlement).await,
                };
                this.ongoing.complete(&task_descriptor, id);
                result
            }
            .instrument(span),
        );
        let abort = handle.abort_handle();

        let ongoing = self.ongoing.clone();
        let response = async move {
            match handle.await {
                Ok(result) => result,
                Err(e) if e.is_cancelled() => Err(RequesterError::Interrupted { descriptor }),
                Err(e) => {
                    ongoing.complete(&descriptor, id);
                    tracing::error!(request = %descriptor, error = %e, "Request task failed");
                    Err(RequesterError::Internal(e.to_string()))
                }
            }
        }
        .boxed()
        .shared();

        registry::LaunchedOperation {
            id,
            response,
            abort,
            settlement,
            start,
        }
    }

    async fn perform(
        &self,
        descriptor: &RequestDescriptor,
        settlement: &registry::SettlementLock,
    ) -> RequesterResult<Response> {
        let authorization = match descriptor.authentication() {
            Authentication::None => None,
            Authentication::Scheduled => {
                let lock = self.lock.as_ref().ok_or(AuthenticationError::NoLock)?;
                let credential = lock.request_unlock().await?;
                Some(credential.authorization())
            }
        };

        let response = self
            .send_with_retry(descriptor, authorization.as_deref())
            .await?;

        // Also clears rows left behind by earlier failed attempts at this request.
        let mut settlement = settlement.lock().await;
        if let Err(e) = self.journal.delete(descriptor).await {
            tracing::error!(error = %e, "Failed to remove completed request from journal");
        }
        *settlement = Settlement::Succeeded;
        Ok(response)
    }

    async fn send_with_retry(
        &self,
        descriptor: &RequestDescriptor,
        authorization: Option<&str>,
    ) -> Result<Response, TransportError> {
        let method = descriptor.method();
        let mut attempt = 1;
        loop {
            let result = self
                .transport
                .send(descriptor, authorization)
                .await
                .and_then(|response| {
                    if response.is_success() {
                        Ok(response)
                    } else {
                        Err(TransportError::Http {
                            status: response.status,
                            body: String::from_utf8_lossy(&response.body).into_owned(),
                        })
                    }
                });

            match result {
                Ok(response) => {
                    metrics::record_transport_attempt(method.as_str(), "success");
                    tracing::debug!(attempt, status = response.status, "Request completed");
                    return Ok(response);
                }
                Err(err) => {
                    metrics::record_transport_attempt(method.as_str(), "failure");
                    if !self.retry.should_retry(attempt, &err) {
                        tracing::warn!(attempt, error = %err, "Request failed");
                        return Err(err);
                    }

                    let delay = self.retry.delay_for(attempt);
                    tracing::info!(
                        attempt,
                        error = %err,
                        delay_ms = delay.as_millis() as u64,
                        "Retrying request"
                    );
                    metrics::record_retry(method.as_str());
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
            }
        }
    }

    /// Replay every journaled request.
    ///
    /// Replays run concurrently and go through [`dispatch`](Self::dispatch), so a
    /// row whose request is already in flight joins it.
    pub async fn resume_journal(&self) -> RequesterResult<ResumeSummary> {
        let entries = self.journal.select_all().await?;
        let mut summary = ResumeSummary::default();
        let mut replays = Vec::new();

        for entry in entries {
            if !entry.resumption.is_resumable() {
                self.journal.delete(&entry.descriptor).await?;
                summary.discarded += 1;
                continue;
            }
            replays.push(self.dispatch(entry.descriptor, Resumption::Resumable));
        }

        tracing::info!(
            pending = replays.len(),
            discarded = summary.discarded,
            "Resuming journal"
        );
        for result in join_all(replays).await {
            match result {
                Ok(_) => {
                    summary.resumed += 1;
                    metrics::record_resumed("success");
                }
                Err(e) => {
                    summary.failed += 1;
                    metrics::record_resumed("failure");
                    tracing::warn!(error = %e, "Resumed request failed");
                }
            }
        }
        Ok(summary)
    }

    /// Abort every in-flight operation. Journal rows are left in place.
    pub fn interrupt_all(&self) -> usize {
        let interrupted = self.ongoing.interrupt_all();
        for descriptor in &interrupted {
            tracing::warn!(request = %descriptor, "Request interrupted");
        }
        metrics::record_interruptions(interrupted.len());
        interrupted.len()
    }
}

#[async_trait]
impl RequestExecutor for Requester {
    async fn execute(
        &self,
        descriptor: RequestDescriptor,
        resumption: Resumption,
    ) -> RequesterResult<Response> {
        self.dispatch(descriptor, resumption).await
    }

    async fn resume(&self) -> RequesterResult<ResumeSummary> {
        self.resume_journal().await
    }

    fn interrupt(&self) -> usize {
        self.interrupt_all()
    }
}
