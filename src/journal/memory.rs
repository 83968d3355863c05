//! In-memory journal.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::journal::{JournalEntry, JournalError, RequestJournal};
use crate::observability::metrics;
use crate::request::RequestDescriptor;

/// Journal rows held in a sharded concurrent map.
///
/// Also the row store behind [`FileJournal`](crate::journal::FileJournal).
#[derive(Debug, Default)]
pub struct InMemoryJournal {
    rows: DashMap<RequestDescriptor, (u64, JournalEntry)>,
    next_sequence: AtomicU64,
}

impl InMemoryJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn contains(&self, descriptor: &RequestDescriptor) -> bool {
        self.rows.contains_key(descriptor)
    }

    pub(crate) fn upsert(&self, entry: JournalEntry) {
        self.rows
            .entry(entry.descriptor.clone())
            .and_modify(|(_, existing)| existing.resumption = entry.resumption)
            .or_insert_with(|| {
                let sequence = self.next_sequence.fetch_add(1, Ordering::Relaxed);
                (sequence, entry)
            });
        metrics::record_journal_rows(self.rows.len());
    }

    pub(crate) fn snapshot(&self) -> Vec<JournalEntry> {
        let mut rows: Vec<(u64, JournalEntry)> = self
            .rows
            .iter()
            .map(|r| (r.value().0, r.value().1.clone()))
            .collect();
        rows.sort_by_key(|(sequence, _)| *sequence);
        rows.into_iter().map(|(_, entry)| entry).collect()
    }

    pub(crate) fn remove(&self, descriptor: &RequestDescriptor) -> bool {
        let removed = self.rows.remove(descriptor).is_some();
        metrics::record_journal_rows(self.rows.len());
        removed
    }

    pub(crate) fn remove_all(&self) {
        self.rows.clear();
        metrics::record_journal_rows(0);
    }
}

#[async_trait]
impl RequestJournal for InMemoryJournal {
    async fn insert(&self, entry: JournalEntry) -> Result<(), JournalError> {
        self.upsert(entry);
        Ok(())
    }

    async fn select_all(&self) -> Result<Vec<JournalEntry>, JournalError> {
        Ok(self.snapshot())
    }

    async fn delete(&self, descriptor: &RequestDescriptor) -> Result<(), JournalError> {
        self.remove(descriptor);
        Ok(())
    }

    async fn clear(&self) -> Result<(), JournalError> {
        self.remove_all();
        Ok(())
    }
}
