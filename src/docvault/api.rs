//! # API Facade
//!
//! The API layer is a **thin facade** over the storage layer. It is the seam where a UI's
//! command dispatcher (IPC handler, CLI, test harness) attaches.
//!
//! ## Role and Responsibilities
//!
//! The API facade:
//! - **Dispatches** each request to exactly one [`DocumentStore`] call
//! - **Logs** every failure before handing it back
//! - **Degrades** where the editor must keep working: [`StorageApi::init`] never fails and
//!   [`StorageApi::get_user_preference`] falls back to defaults
//!
//! Everything else returns the typed [`Result`] so callers can tell failures apart.
//!
//! ## Generic Over DocumentStore
//!
//! `StorageApi<S: DocumentStore>` is generic over the storage backend:
//! - Production: `StorageApi<FileStore>`
//! - Testing: `StorageApi<InMemoryStore>`

use crate::error::Result;
use crate::store::DocumentStore;

pub use crate::model::{FileItem, FileKind, Theme, UserPreference};
pub use crate::store::InitReport;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// The main API facade for storage operations.
pub struct StorageApi<S: DocumentStore> {
    store: S,
}

impl<S: DocumentStore> StorageApi<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn root(&self) -> &Path {
        self.store.root()
    }

    /// Idempotent bootstrap of the root and preference record. Failures are logged and
    /// reported in the returned report, never raised, so startup always proceeds.
    pub fn init(&self) -> InitReport {
        match self.store.init() {
            Ok(report) => {
                info!(
                    root = %report.root.display(),
                    created_preferences = report.created_preferences,
                    "storage ready"
                );
                report
            }
            Err(e) => {
                warn!(root = %self.store.root().display(), error = %e, "unable to init storage");
                InitReport {
                    root: self.store.root().to_path_buf(),
                    created_preferences: false,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    pub fn read<P: AsRef<Path>>(&self, path: P) -> Result<String> {
        let path = path.as_ref();
        logged("read", path, self.store.read(path))
    }

    pub fn write<P: AsRef<Path>>(&self, path: P, content: &str) -> Result<()> {
        let path = path.as_ref();
        logged("write", path, self.store.write(path, content))
    }

    pub fn write_absolute<P: AsRef<Path>>(&self, path: P, content: &str) -> Result<()> {
        let path = path.as_ref();
        logged("write_absolute", path, self.store.write_absolute(path, content))
    }

    pub fn list(&self) -> Result<Vec<FileItem>> {
        logged("list", self.store.root(), self.store.list())
    }

    pub fn move_entry<P: AsRef<Path>, Q: AsRef<Path>>(&self, from: P, to: Q) -> Result<()> {
        let from = from.as_ref();
        logged("move", from, self.store.move_entry(from, to.as_ref()))
    }

    pub fn rename<P: AsRef<Path>>(&self, path: P, new_name: &str) -> Result<PathBuf> {
        let path = path.as_ref();
        logged("rename", path, self.store.rename(path, new_name))
    }

    pub fn duplicate<P: AsRef<Path>, Q: AsRef<Path>>(&self, path: P, destination: Q) -> Result<()> {
        let path = path.as_ref();
        logged("duplicate", path, self.store.duplicate(path, destination.as_ref()))
    }

    pub fn remove<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        logged("remove", path, self.store.remove(path))
    }

    /// Current preferences; defaults when the record is missing or unreadable.
    pub fn get_user_preference(&self) -> UserPreference {
        match self.store.load_preference() {
            Ok(pref) => pref,
            Err(e) => {
                warn!(error = %e, "using default preferences");
                UserPreference::default()
            }
        }
    }

    /// Typed variant of [`get_user_preference`](Self::get_user_preference).
    pub fn try_get_user_preference(&self) -> Result<UserPreference> {
        self.store.load_preference()
    }

    pub fn save_user_preference(&self, pref: &UserPreference) -> Result<()> {
        logged(
            "save_user_preference",
            self.store.root(),
            self.store.save_preference(pref),
        )
    }
}

fn logged<T>(op: &str, path: &Path, result: Result<T>) -> Result<T> {
    if let Err(e) = &result {
        warn!(op, path = %path.display(), error = %e, "storage operation failed");
    }
    result
}
