//! Journal persisted to a JSON file.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::journal::{InMemoryJournal, JournalEntry, JournalError, RequestJournal};
use crate::request::RequestDescriptor;

const JOURNAL_VERSION: u32 = 1;

/// On-disk document.
#[derive(Debug, Serialize, Deserialize)]
struct JournalDocument {
    version: u32,
    entries: Vec<JournalEntry>,
}

/// Journal that survives process restarts.
///
/// Rows live in an [`InMemoryJournal`]; every mutation rewrites the file from a
/// fresh snapshot via a temp file and an atomic rename. Flushes are serialized,
/// and each one writes the latest state, so the file never lags behind a
/// completed call.
#[derive(Debug)]
pub struct FileJournal {
    rows: InMemoryJournal,
    path: PathBuf,
    flush: Mutex<()>,
}

impl FileJournal {
    /// Open the journal at `path`, loading any rows left by a previous process.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, JournalError> {
        let path = path.as_ref().to_path_buf();
        let rows = InMemoryJournal::new();

        match tokio::fs::read(&path).await {
            Ok(bytes) if !bytes.is_empty() => {
                let document: JournalDocument = serde_json::from_slice(&bytes)?;
                if document.version != JOURNAL_VERSION {
                    return Err(JournalError::UnsupportedVersion(document.version));
                }
                for entry in document.entries {
                    rows.upsert(entry);
                }
                tracing::info!(
                    path = %path.display(),
                    pending = rows.len(),
                    "Loaded request journal"
                );
            }
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No request journal yet");
            }
            Err(e) => return Err(e.into()),
        }

        Ok(Self {
            rows,
            path,
            flush: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    async fn persist(&self) -> Result<(), JournalError> {
        let _guard = self.flush.lock().await;
        let document = JournalDocument {
            version: JOURNAL_VERSION,
            entries: self.rows.snapshot(),
        };
        let bytes = serde_json::to_vec_pretty(&document)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let temp = self.path.with_extension("tmp");
        tokio::fs::write(&temp, &bytes).await?;
        tokio::fs::rename(&temp, &self.path).await?;

        tracing::trace!(
            path = %self.path.display(),
            rows = document.entries.len(),
            "Journal flushed"
        );
        Ok(())
    }
}

#[async_trait]
impl RequestJournal for FileJournal {
    async fn insert(&self, entry: JournalEntry) -> Result<(), JournalError> {
        self.rows.upsert(entry);
        self.persist().await
    }

    async fn select_all(&self) -> Result<Vec<JournalEntry>, JournalError> {
        Ok(self.rows.snapshot())
    }

    async fn delete(&self, descriptor: &RequestDescriptor) -> Result<(), JournalError> {
        if self.rows.remove(descriptor) {
            self.persist().await?;
        }
        Ok(())
    }

    async fn clear(&self) -> Result<(), JournalError> {
        self.rows.remove_all();
        self.persist().await
    }
}
