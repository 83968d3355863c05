//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Requester, journal, cache produce:
//!     → tracing events and spans (operation id, method, route)
//!     → metrics.rs (counters, gauges through the metrics facade)
//!
//! Consumers:
//!     → logging.rs subscriber (stderr, plain or JSON)
//!     → whatever metrics recorder the embedding application installs
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Operation id flows through every event of one request
//! - Metrics are cheap; without a recorder they are no-ops

pub mod logging;
pub mod metrics;
