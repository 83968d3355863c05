//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Operation task:
//!     → Transport::send
//!     → On failure: retries.rs (retryable? attempts left? how long to wait?)
//!     → re-issue the entire request
//! ```
//!
//! # Design Decisions
//! - Retry count is bounded; the last error is surfaced unchanged
//! - Interruption and authentication failures never enter the retry loop
//! - Retries are local to one operation and invisible to its callers

pub mod retries;

pub use retries::RetryPolicy;
