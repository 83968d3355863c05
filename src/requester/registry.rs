//! In-flight operation index used for deduplication.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures_util::future::{BoxFuture, Shared};
use tokio::sync::{oneshot, Mutex};
use tokio::task::AbortHandle;
use uuid::Uuid;

use crate::error::RequesterResult;
use crate::request::RequestDescriptor;
use crate::transport::Response;

/// Outcome handle every caller of one operation awaits.
pub type SharedResponse = Shared<BoxFuture<'static, RequesterResult<Response>>>;

/// Releases a gated operation, or fails it before it sends anything.
pub type StartSignal = oneshot::Sender<RequesterResult<()>>;

/// Journal state of one operation.
///
/// A joiner that needs a journal row writes it while holding the lock and
/// only while the operation is `Pending`; the operation task clears the row
/// and moves to `Succeeded` under the same lock. A joiner's row therefore
/// never outlives a successful operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    Pending,
    Succeeded,
}

pub type SettlementLock = Arc<Mutex<Settlement>>;

pub fn settlement_lock() -> SettlementLock {
    Arc::new(Mutex::new(Settlement::Pending))
}

/// A spawned operation that has not been allowed to run yet.
pub struct LaunchedOperation {
    pub id: Uuid,
    pub response: SharedResponse,
    pub abort: AbortHandle,
    pub settlement: SettlementLock,
    pub start: StartSignal,
}

struct OngoingOperation {
    id: Uuid,
    response: SharedResponse,
    abort: AbortHandle,
    settlement: SettlementLock,
}

/// Result of [`OperationRegistry::join_or_register`].
pub enum Registration {
    /// Another caller already owns an operation for this descriptor.
    Joined {
        response: SharedResponse,
        settlement: SettlementLock,
    },
    /// The caller registered a new operation and must release it with `start`.
    Registered {
        id: Uuid,
        response: SharedResponse,
        start: StartSignal,
    },
}

/// Maps each descriptor to at most one in-flight operation.
///
/// Lookup and insert happen under the same shard lock, so concurrent callers
/// for one descriptor converge on a single operation.
#[derive(Default)]
pub struct OperationRegistry {
    operations: DashMap<RequestDescriptor, OngoingOperation>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the operation registered for `descriptor`, or register the one
    /// produced by `launch`. `launch` only runs when nothing is registered.
    pub fn join_or_register<F>(&self, descriptor: &RequestDescriptor, launch: F) -> Registration
    where
        F: FnOnce() -> LaunchedOperation,
    {
        match self.operations.entry(descriptor.clone()) {
            Entry::Occupied(occupied) => {
                let operation = occupied.get();
                Registration::Joined {
                    response: operation.response.clone(),
                    settlement: operation.settlement.clone(),
                }
            }
            Entry::Vacant(vacant) => {
                let launched = launch();
                vacant.insert(OngoingOperation {
                    id: launched.id,
                    response: launched.response.clone(),
                    abort: launched.abort,
                    settlement: launched.settlement,
                });
                Registration::Registered {
                    id: launched.id,
                    response: launched.response,
                    start: launched.start,
                }
            }
        }
    }

    /// Remove the entry for `descriptor` if it still belongs to operation `id`.
    pub fn complete(&self, descriptor: &RequestDescriptor, id: Uuid) -> bool {
        self.operations
            .remove_if(descriptor, |_, operation| operation.id == id)
            .is_some()
    }

    /// Abort and remove every registered operation.
    pub fn interrupt_all(&self) -> Vec<RequestDescriptor> {
        let mut interrupted = Vec::new();
        self.operations.retain(|descriptor, operation| {
            operation.abort.abort();
            interrupted.push(descriptor.clone());
            false
        });
        interrupted
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn contains(&self, descriptor: &RequestDescriptor) -> bool {
        self.operations.contains_key(descriptor)
    }
}
