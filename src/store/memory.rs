//! In-memory store backend
//!
//! Records temporary roots in registration order. Paths can be marked as
//! present or made to fail, which makes it suitable for exercising the
//! helper without a real store on disk.

use super::{Store, StorePath, StoreError, StoreResult};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Default)]
struct MemoryState {
    valid: Option<HashSet<StorePath>>,
    roots: Vec<StorePath>,
    unavailable: Option<String>,
}

/// In-memory store
pub struct MemoryStore {
    store_dir: PathBuf,
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    /// Create a store that accepts a temp root for any well-formed path
    pub fn new() -> Self {
        Self {
            store_dir: PathBuf::from("/nix/store"),
            state: Mutex::new(MemoryState::default()),
        }
    }

    /// Create a store that only knows the given paths
    pub fn with_paths<I: IntoIterator<Item = StorePath>>(paths: I) -> Self {
        let store = Self::new();
        store.lock().valid = Some(paths.into_iter().collect());
        store
    }

    /// Make every subsequent operation fail with `StoreError::Unavailable`
    pub fn set_unavailable(&self, reason: impl Into<String>) {
        self.lock().unavailable = Some(reason.into());
    }

    /// Temporary roots registered so far, in order
    pub fn temp_roots(&self) -> Vec<StorePath> {
        self.lock().roots.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        // The state stays consistent even if a holder panicked
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for MemoryStore {
    fn add_temp_root(&self, path: &StorePath) -> StoreResult<()> {
        let mut state = self.lock();
        if let Some(reason) = &state.unavailable {
            return Err(StoreError::Unavailable(reason.clone()));
        }
        if let Some(valid) = &state.valid {
            if !valid.contains(path) {
                return Err(StoreError::NotFound(
                    self.store_dir.join(path.as_str()).display().to_string(),
                ));
            }
        }
        state.roots.push(path.clone());
        Ok(())
    }

    fn store_dir(&self) -> &Path {
        &self.store_dir
    }
}
