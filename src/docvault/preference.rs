use crate::error::{Result, StorageError};
use crate::model::UserPreference;
use crate::paths::{temp_path_for, StoragePaths};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Reads and writes the preference record at `<root>/user_config.json`.
#[derive(Debug, Clone)]
pub struct PreferenceStore {
    root: PathBuf,
    path: PathBuf,
}

impl PreferenceStore {
    pub fn new(paths: &StoragePaths) -> Self {
        Self {
            root: paths.root().to_path_buf(),
            path: paths.preference_file().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the root and, if missing, the default record.
    /// Returns true when the preference file was written by this call.
    pub fn init(&self) -> Result<bool> {
        fs::create_dir_all(&self.root).map_err(|e| StorageError::from_io(e, &self.root))?;

        if self.path.exists() {
            return Ok(false);
        }

        self.save(&UserPreference::default())?;
        debug!(path = %self.path.display(), "wrote default preferences");
        Ok(true)
    }

    pub fn try_load(&self) -> Result<UserPreference> {
        let json =
            fs::read_to_string(&self.path).map_err(|e| StorageError::from_io(e, &self.path))?;
        let pref = serde_json::from_str(&json)?;
        Ok(pref)
    }

    /// Load preferences, falling back to defaults when the record is missing or corrupt.
    pub fn load(&self) -> UserPreference {
        match self.try_load() {
            Ok(pref) => pref,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "using default preferences");
                UserPreference::default()
            }
        }
    }

    /// Overwrite the record wholesale.
    pub fn save(&self, pref: &UserPreference) -> Result<()> {
        let json = serde_json::to_string(pref)?;

        let tmp = temp_path_for(&self.path)
            .ok_or_else(|| StorageError::InvalidPath(self.path.clone()))?;
        fs::write(&tmp, json).map_err(|e| StorageError::from_io(e, &tmp))?;
        if let Err(e) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(StorageError::from_io(e, &self.path));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Theme;
    use tempfile::tempdir;

    fn store_in(root: &Path) -> PreferenceStore {
        PreferenceStore::new(&StoragePaths::new(root))
    }

    #[test]
    fn init_creates_root_and_default_record() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("Documents").join("docvault");
        let store = store_in(&root);

        assert!(store.init().unwrap());
        assert!(root.is_dir());
        let raw = fs::read_to_string(root.join("user_config.json")).unwrap();
        assert_eq!(raw, r#"{"last_edit_path":"Untitled","theme":"light"}"#);
    }

    #[test]
    fn init_is_idempotent_and_keeps_existing_record() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());
        store.init().unwrap();

        let custom = UserPreference {
            last_edit_path: "notes/today.md".into(),
            theme: Theme::Dark,
        };
        store.save(&custom).unwrap();

        assert!(!store.init().unwrap());
        assert_eq!(store.try_load().unwrap(), custom);
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());
        store.init().unwrap();

        let pref = UserPreference {
            last_edit_path: "a/b.md".into(),
            theme: Theme::Dark,
        };
        store.save(&pref).unwrap();
        assert_eq!(store.load(), pref);
    }

    #[test]
    fn missing_record_loads_defaults() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        assert!(store.try_load().unwrap_err().is_not_found());
        assert_eq!(store.load(), UserPreference::default());
    }

    #[test]
    fn corrupt_record_loads_defaults() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());
        fs::write(store.path(), "{ this is not json").unwrap();

        assert!(matches!(store.try_load(), Err(StorageError::Parse(_))));
        assert_eq!(store.load(), UserPreference::default());
    }

    #[test]
    fn save_into_missing_root_fails() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir.path().join("gone"));
        assert!(store.save(&UserPreference::default()).is_err());
    }

    #[test]
    fn save_leaves_no_temp_files() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());
        store.init().unwrap();
        store.save(&UserPreference::default()).unwrap();

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("user_config.json")]);
    }
}
