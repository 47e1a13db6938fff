//! Persistent storage for acknowledged alert identifiers.
//!
//! The set is always read and written as a whole. Two writers racing on the
//! same file end up with whichever wrote last.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use super::model::DismissalSet;
use crate::core::error::Result;

/// File name of the dismissal set inside the data directory.
pub const DISMISSALS_FILE: &str = "dismissed.json";

/// Whole-set persistence for dismissals.
pub trait DismissalStore {
    /// Read the stored set. Returns an empty set when nothing has been stored.
    fn read(&self) -> Result<DismissalSet>;

    /// Replace the stored set.
    fn write(&mut self, set: &DismissalSet) -> Result<()>;
}

/// Stores the dismissal set as a JSON array in the app data directory.
pub struct JsonFileDismissalStore {
    path: PathBuf,
}

impl JsonFileDismissalStore {
    /// Create a store rooted at `data_dir`.
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            path: data_dir.as_ref().join(DISMISSALS_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DismissalStore for JsonFileDismissalStore {
    fn read(&self) -> Result<DismissalSet> {
        if !self.path.exists() {
            return Ok(DismissalSet::new());
        }

        let content = fs::read_to_string(&self.path)?;
        match serde_json::from_str(&content) {
            Ok(set) => Ok(set),
            Err(err) => {
                log::warn!(
                    "Ignoring unreadable dismissal file {:?}: {err}",
                    self.path
                );
                Ok(DismissalSet::new())
            }
        }
    }

    fn write(&mut self, set: &DismissalSet) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(set)?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}

/// In-memory store. Clones share the same set.
#[derive(Debug, Clone, Default)]
pub struct MemoryDismissalStore {
    inner: Arc<Mutex<DismissalSet>>,
}

impl MemoryDismissalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the currently stored set.
    pub fn snapshot(&self) -> DismissalSet {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl DismissalStore for MemoryDismissalStore {
    fn read(&self) -> Result<DismissalSet> {
        Ok(self.snapshot())
    }

    fn write(&mut self, set: &DismissalSet) -> Result<()> {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner) = set.clone();
        Ok(())
    }
}
