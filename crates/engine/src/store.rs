//! Document persistence.
//!
//! The store is deliberately coarse: one JSON document per deployment, read
//! wholesale and written wholesale. There is no incremental persistence and
//! no compaction; two writers racing on the same file are last-write-wins.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
};

use crate::{LedgerDocument, StoreError};

/// Transactional access to the single persisted document.
///
/// Injected into the ledger engine so unit tests never touch a filesystem.
pub trait DocumentStore {
    /// Reads the current document.
    fn read(&self) -> Result<LedgerDocument, StoreError>;

    /// Replaces the persisted document.
    fn write(&self, doc: &LedgerDocument) -> Result<(), StoreError>;
}

/// File-backed store, self-healing on first access.
///
/// A missing or corrupt file is replaced by the empty default document,
/// which is written out immediately so the next reader sees a valid file.
#[derive(Clone, Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DocumentStore for JsonFileStore {
    fn read(&self) -> Result<LedgerDocument, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(doc) => Ok(doc),
                Err(err) => {
                    tracing::warn!(
                        path = %self.path.display(),
                        "corrupt ledger document, reinitializing: {err}"
                    );
                    let doc = LedgerDocument::default();
                    self.write(&doc)?;
                    Ok(doc)
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                let doc = LedgerDocument::default();
                self.write(&doc)?;
                Ok(doc)
            }
            Err(err) => Err(err.into()),
        }
    }

    fn write(&self, doc: &LedgerDocument) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(doc)?;

        // Write to a sibling tmp file first so a crash mid-write never leaves
        // a half-written document behind.
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, json)?;
        match fs::rename(&tmp, &self.path) {
            Ok(()) => Ok(()),
            Err(_) => {
                fs::copy(&tmp, &self.path)?;
                let _ = fs::remove_file(&tmp);
                Ok(())
            }
        }
    }
}

/// In-memory store for tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<LedgerDocument>,
}

impl MemoryStore {
    pub fn new(doc: LedgerDocument) -> Self {
        Self {
            inner: Mutex::new(doc),
        }
    }
}

impl DocumentStore for MemoryStore {
    fn read(&self) -> Result<LedgerDocument, StoreError> {
        let guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        Ok(guard.clone())
    }

    fn write(&self, doc: &LedgerDocument) -> Result<(), StoreError> {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        *guard = doc.clone();
        Ok(())
    }
}
