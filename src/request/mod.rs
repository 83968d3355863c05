//! Request identity.
//!
//! # Data Flow
//! ```text
//! get/post/delete(auth, route, params), post_multipart(auth, route, parts)
//!     → descriptor.rs (canonical RequestDescriptor)
//!     → requester registry key (dedup)
//!     → journal row key (resumption)
//! ```
//!
//! # Design Decisions
//! - Parameters are canonicalized on construction, never at comparison time
//! - Form parts keep their order; they are journaled with the request
//! - Tagged choices (method, authentication, resumption) are plain enums

pub mod descriptor;
pub mod parameters;
pub mod parts;

pub use descriptor::{Authentication, Method, RequestDescriptor, Resumption};
pub use parameters::Parameters;
pub use parts::{FormPart, PartContent};
