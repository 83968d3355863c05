//! Resilient request orchestration.
//!
//! Executes logical HTTP requests with deduplication of identical in-flight
//! calls, authentication gating, bounded retry and a durable journal that lets
//! interrupted work be resumed.
//!
//! ```text
//!   get/post/delete ──▶ ResumableRequester (TTL reuse, optional)
//!                              │
//!                              ▼
//!                          Requester ──▶ OperationRegistry (dedup)
//!                              │
//!          ┌───────────────────┼────────────────────┐
//!          ▼                   ▼                    ▼
//!   RequestJournal    AuthenticationLock    Transport + RetryPolicy
//! ```

pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod journal;
pub mod observability;
pub mod request;
pub mod requester;
pub mod resilience;
pub mod transport;

pub use config::RequesterConfig;
pub use error::{RequesterError, RequesterResult};
pub use request::{
    Authentication, FormPart, Method, Parameters, PartContent, RequestDescriptor, Resumption,
};
pub use requester::{RequestExecutor, Requester, ResumableRequester, ResumeSummary};
pub use transport::{Response, Transport, TransportError};
