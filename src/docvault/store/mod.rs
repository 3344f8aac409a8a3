//! # Storage Layer
//!
//! This module defines the storage abstraction for docvault. The [`DocumentStore`] trait
//! allows the facade to work with different storage backends.
//!
//! ## Implementations
//!
//! - [`fs::FileStore`]: Production storage on the real filesystem
//!   - Documents are plain files under the storage root
//!   - Preferences live in `user_config.json` at the top of the root
//!   - Writes go through a temp file + rename unless disabled
//!
//! - [`memory::InMemoryStore`]: In-memory tree for testing
//!   - No persistence
//!   - Same confinement and collision rules as `FileStore`
//!
//! ## Storage Format
//!
//! For `FileStore`:
//! ```text
//! <documents>/<app-name>/
//! ├── user_config.json    # Preference record (never listed)
//! ├── ideas.md            # Documents, any name, any depth
//! └── notes/
//!     └── today.md
//! ```
//!
//! All `&Path` arguments are relative to the storage root, except the destination of
//! [`DocumentStore::write_absolute`].

use crate::error::Result;
use crate::model::{FileItem, UserPreference};
use std::path::{Path, PathBuf};

pub mod fs;
pub mod memory;

/// Report from store initialization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitReport {
    pub root: PathBuf,
    pub created_preferences: bool,
    pub error: Option<String>,
}

/// Abstract interface for document storage.
///
/// Implementations confine every relative path to their root and report failures as
/// typed errors. Each call is a single attempt: no retries, no rollback.
pub trait DocumentStore {
    /// The storage root
    fn root(&self) -> &Path;

    /// Create the root and the default preference record if missing
    fn init(&self) -> Result<InitReport>;

    /// Read a document as text
    fn read(&self, path: &Path) -> Result<String>;

    /// Create or overwrite a document, creating parent directories under the root
    fn write(&self, path: &Path, content: &str) -> Result<()>;

    /// Create or overwrite a file anywhere (explicit export, no sandbox)
    fn write_absolute(&self, path: &Path, content: &str) -> Result<()>;

    /// The document tree, preference file excluded
    fn list(&self) -> Result<Vec<FileItem>>;

    /// Move an entry to another location under the root. Parents are not created.
    fn move_entry(&self, from: &Path, to: &Path) -> Result<()>;

    /// Rename an entry within its directory, returning the new relative path
    fn rename(&self, path: &Path, new_name: &str) -> Result<PathBuf>;

    /// Copy a document byte for byte. Parents are not created.
    fn duplicate(&self, path: &Path, destination: &Path) -> Result<()>;

    /// Delete a single document
    fn remove(&self, path: &Path) -> Result<()>;

    fn load_preference(&self) -> Result<UserPreference>;

    fn save_preference(&self, pref: &UserPreference) -> Result<()>;
}

/// Path of `name` next to `path`, in the same parent directory.
pub fn sibling_path(path: &Path, name: &str) -> PathBuf {
    match path.parent() {
        Some(parent) => parent.join(name),
        None => PathBuf::from(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sibling_stays_in_parent() {
        assert_eq!(
            sibling_path(Path::new("notes/today.md"), "tomorrow.md"),
            PathBuf::from("notes/tomorrow.md")
        );
        assert_eq!(
            sibling_path(Path::new("today.md"), "tomorrow.md"),
            PathBuf::from("tomorrow.md")
        );
    }
}
