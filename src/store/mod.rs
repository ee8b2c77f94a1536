//! Store backends
//!
//! This module defines the Store trait, the store path type and the
//! implementations the helper can be pointed at.

pub mod local;
pub mod memory;
pub mod path;

use std::path::Path;
use thiserror::Error;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid store path '{path}': {reason}")]
    InvalidPath { path: String, reason: &'static str },

    #[error("path '{0}' is not valid in the store")]
    NotFound(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Store trait - the operations the helper performs on behalf of its peer
///
/// Implementations serialize internally; independent connections may call
/// into the same store concurrently.
pub trait Store: Send + Sync {
    /// Register a temporary GC root for `path`.
    ///
    /// The root keeps the path alive until the store itself releases it.
    fn add_temp_root(&self, path: &StorePath) -> StoreResult<()>;

    /// Directory holding the store's paths
    fn store_dir(&self) -> &Path;
}

impl<S: Store + ?Sized> Store for &S {
    fn add_temp_root(&self, path: &StorePath) -> StoreResult<()> {
        (**self).add_temp_root(path)
    }

    fn store_dir(&self) -> &Path {
        (**self).store_dir()
    }
}

impl<S: Store + ?Sized> Store for Box<S> {
    fn add_temp_root(&self, path: &StorePath) -> StoreResult<()> {
        (**self).add_temp_root(path)
    }

    fn store_dir(&self) -> &Path {
        (**self).store_dir()
    }
}

impl<S: Store + ?Sized> Store for std::sync::Arc<S> {
    fn add_temp_root(&self, path: &StorePath) -> StoreResult<()> {
        (**self).add_temp_root(path)
    }

    fn store_dir(&self) -> &Path {
        (**self).store_dir()
    }
}

pub use local::LocalStore;
pub use memory::MemoryStore;
pub use path::StorePath;
