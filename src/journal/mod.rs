//! Durable journal of pending requests.
//!
//! # Data Flow
//! ```text
//! Resumable caller
//!     → insert(entry)        before the operation is released or joined
//!     → delete(descriptor)   after any successful operation
//!
//! resume()
//!     → select_all()         insertion order
//!     → replay each entry through the requester
//! ```
//!
//! # Design Decisions
//! - Rows are keyed by the canonical descriptor; insert is an upsert
//! - Upserts keep the original sequence so replay order is stable
//! - memory.rs for tests and ephemeral use, file.rs for restart survival

pub mod file;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::request::{RequestDescriptor, Resumption};

pub use file::FileJournal;
pub use memory::InMemoryJournal;

/// A request that has been journaled and not yet completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub descriptor: RequestDescriptor,
    pub resumption: Resumption,
}

impl JournalEntry {
    pub fn new(descriptor: RequestDescriptor, resumption: Resumption) -> Self {
        Self {
            descriptor,
            resumption,
        }
    }
}

/// Errors raised by a journal backend.
#[derive(Debug, Clone, Error)]
pub enum JournalError {
    #[error("journal I/O error: {0}")]
    Io(#[source] Arc<std::io::Error>),

    #[error("journal is corrupt: {0}")]
    Corrupt(#[source] Arc<serde_json::Error>),

    #[error("unsupported journal version {0}")]
    UnsupportedVersion(u32),
}

impl From<std::io::Error> for JournalError {
    fn from(e: std::io::Error) -> Self {
        JournalError::Io(Arc::new(e))
    }
}

impl From<serde_json::Error> for JournalError {
    fn from(e: serde_json::Error) -> Self {
        JournalError::Corrupt(Arc::new(e))
    }
}

/// CRUD over pending request rows.
///
/// Implementations must tolerate concurrent writes for distinct descriptors.
#[async_trait]
pub trait RequestJournal: Send + Sync {
    /// Insert or update the row for `entry.descriptor`.
    async fn insert(&self, entry: JournalEntry) -> Result<(), JournalError>;

    /// All rows in insertion order.
    async fn select_all(&self) -> Result<Vec<JournalEntry>, JournalError>;

    /// Remove the row for `descriptor`. Removing a missing row is not an error.
    async fn delete(&self, descriptor: &RequestDescriptor) -> Result<(), JournalError>;

    /// Remove every row.
    async fn clear(&self) -> Result<(), JournalError>;
}
