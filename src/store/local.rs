//! Filesystem store backend
//!
//! Store paths live directly under the store directory. Temporary roots are
//! recorded in a per-process file under `<state_dir>/temproots/`, one
//! NUL-terminated absolute path per root, which the garbage collector reads
//! while the owning process is alive.

use super::{Store, StorePath, StoreError, StoreResult};
use std::ffi::OsStr;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Directory below the state directory holding temp-root files
const TEMPROOTS_DIR: &str = "temproots";

/// Local filesystem store
pub struct LocalStore {
    store_dir: PathBuf,
    temproots_path: PathBuf,
    /// Opened on the first registered root
    temproots: Mutex<Option<File>>,
}

impl LocalStore {
    /// Open a store rooted at `store_dir`, keeping state in `state_dir`
    pub fn open<P: AsRef<Path>, Q: AsRef<Path>>(store_dir: P, state_dir: Q) -> StoreResult<Self> {
        let store_dir = store_dir.as_ref().to_path_buf();
        if !store_dir.is_dir() {
            return Err(StoreError::Unavailable(format!(
                "store directory {} does not exist",
                store_dir.display()
            )));
        }

        let temproots_dir = state_dir.as_ref().join(TEMPROOTS_DIR);
        fs::create_dir_all(&temproots_dir)?;
        let temproots_path = temproots_dir.join(std::process::id().to_string());

        Ok(Self {
            store_dir,
            temproots_path,
            temproots: Mutex::new(None),
        })
    }

    /// Absolute location of a store path
    pub fn to_real_path(&self, path: &StorePath) -> PathBuf {
        self.store_dir.join(path.as_str())
    }

    /// File this process records its temporary roots in
    pub fn temproots_path(&self) -> &Path {
        &self.temproots_path
    }

    /// Read back the roots recorded by this store handle
    pub fn temp_roots(&self) -> StoreResult<Vec<PathBuf>> {
        let content = match fs::read(&self.temproots_path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        Ok(content
            .split(|&b| b == 0)
            .filter(|entry| !entry.is_empty())
            .map(|entry| PathBuf::from(OsStr::from_bytes(entry)))
            .collect())
    }
}

impl Store for LocalStore {
    fn add_temp_root(&self, path: &StorePath) -> StoreResult<()> {
        let real_path = self.to_real_path(path);
        if fs::symlink_metadata(&real_path).is_err() {
            return Err(StoreError::NotFound(real_path.display().to_string()));
        }

        let mut guard = self
            .temproots
            .lock()
            .map_err(|_| StoreError::Unavailable("temp-roots lock poisoned".to_string()))?;

        if guard.is_none() {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.temproots_path)?;
            log::debug!("Recording temp roots in {}", self.temproots_path.display());
            *guard = Some(file);
        }

        if let Some(file) = guard.as_mut() {
            let mut entry = real_path.as_os_str().as_bytes().to_vec();
            entry.push(0);
            file.write_all(&entry)?;
            file.flush()?;
        }

        log::debug!("Added temp root {}", real_path.display());
        Ok(())
    }

    fn store_dir(&self) -> &Path {
        &self.store_dir
    }
}

impl Drop for LocalStore {
    fn drop(&mut self) {
        // Releasing the file releases every root this process registered
        let opened = self.temproots.get_mut().map(|f| f.take().is_some()).unwrap_or(true);
        if opened {
            if let Err(e) = fs::remove_file(&self.temproots_path) {
                if e.kind() != io::ErrorKind::NotFound {
                    log::warn!(
                        "Failed to remove temp roots file {}: {}",
                        self.temproots_path.display(),
                        e
                    );
                }
            }
        }
    }
}
