use super::{sibling_path, DocumentStore, InitReport};
use crate::config::StorageConfig;
use crate::error::{Result, StorageError};
use crate::index::DirectoryIndexer;
use crate::model::{FileItem, UserPreference};
use crate::paths::{normalize_relative, temp_path_for, validate_name, StoragePaths};
use crate::preference::PreferenceStore;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct FileStore {
    paths: StoragePaths,
    preferences: PreferenceStore,
    atomic_writes: bool,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let paths = StoragePaths::new(root);
        let preferences = PreferenceStore::new(&paths);
        Self {
            paths,
            preferences,
            atomic_writes: true,
        }
    }

    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        let root = config.resolve_root()?;
        Ok(Self::new(root).with_atomic_writes(config.atomic_writes))
    }

    pub fn with_atomic_writes(mut self, atomic: bool) -> Self {
        self.atomic_writes = atomic;
        self
    }

    pub fn paths(&self) -> &StoragePaths {
        &self.paths
    }

    pub fn preferences(&self) -> &PreferenceStore {
        &self.preferences
    }

    /// Truncate-and-write `target`. Errors are reported against `shown`.
    fn write_file(&self, target: &Path, shown: &Path, content: &str) -> Result<()> {
        if target.is_dir() {
            return Err(StorageError::NotAFile(shown.to_path_buf()));
        }

        if !self.atomic_writes {
            return fs::write(target, content).map_err(|e| StorageError::from_io(e, shown));
        }

        let tmp =
            temp_path_for(target).ok_or_else(|| StorageError::InvalidPath(shown.to_path_buf()))?;

        fs::write(&tmp, content).map_err(|e| StorageError::from_io(e, shown))?;
        if let Err(e) = fs::rename(&tmp, target) {
            let _ = fs::remove_file(&tmp);
            return Err(StorageError::from_io(e, shown));
        }
        Ok(())
    }

    /// Create the missing directories above `absolute`. A file standing where a directory
    /// is needed is `NotAFile`, reported against its root-relative path.
    fn create_parents(&self, absolute: &Path, shown: &Path) -> Result<()> {
        let Some(parent) = absolute.parent() else {
            return Ok(());
        };
        if parent.is_dir() {
            return Ok(());
        }
        if let Some(blocker) = parent
            .ancestors()
            .find(|a| a.exists() && !a.is_dir())
        {
            let relative = self.paths.relative_of(blocker);
            return Err(StorageError::NotAFile(
                relative.unwrap_or_else(|| shown.to_path_buf()),
            ));
        }
        fs::create_dir_all(parent).map_err(|e| StorageError::from_io(e, shown))
    }

    /// Fails unless `absolute` exists and is not a directory.
    fn require_file(&self, absolute: &Path, shown: &Path) -> Result<()> {
        match fs::metadata(absolute) {
            Ok(meta) if meta.is_dir() => Err(StorageError::NotAFile(shown.to_path_buf())),
            Ok(_) => Ok(()),
            Err(e) => Err(StorageError::from_io(e, shown)),
        }
    }

    /// Fails if anything, including a dangling symlink, occupies `absolute`.
    fn require_vacant(&self, absolute: &Path, shown: &Path) -> Result<()> {
        if fs::symlink_metadata(absolute).is_ok() {
            return Err(StorageError::AlreadyExists(shown.to_path_buf()));
        }
        Ok(())
    }

    /// Fails unless the parent directory of `absolute` exists.
    fn require_parent(&self, absolute: &Path, shown: &Path) -> Result<()> {
        match absolute.parent() {
            Some(parent) if parent.is_dir() => Ok(()),
            _ => Err(StorageError::NotFound(
                shown.parent().unwrap_or(shown).to_path_buf(),
            )),
        }
    }
}

impl DocumentStore for FileStore {
    fn root(&self) -> &Path {
        self.paths.root()
    }

    fn init(&self) -> Result<InitReport> {
        let created_preferences = self.preferences.init()?;
        Ok(InitReport {
            root: self.paths.root().to_path_buf(),
            created_preferences,
            error: None,
        })
    }

    fn read(&self, path: &Path) -> Result<String> {
        let absolute = self.paths.resolve_document(path)?;
        self.require_file(&absolute, path)?;
        fs::read_to_string(&absolute).map_err(|e| StorageError::from_io(e, path))
    }

    fn write(&self, path: &Path, content: &str) -> Result<()> {
        let absolute = self.paths.resolve_document(path)?;
        self.create_parents(&absolute, path)?;
        self.write_file(&absolute, path, content)?;
        debug!(path = %path.display(), bytes = content.len(), "wrote document");
        Ok(())
    }

    fn write_absolute(&self, path: &Path, content: &str) -> Result<()> {
        if !path.is_absolute() {
            return Err(StorageError::InvalidPath(path.to_path_buf()));
        }
        self.write_file(path, path, content)?;
        debug!(path = %path.display(), bytes = content.len(), "exported document");
        Ok(())
    }

    fn list(&self) -> Result<Vec<FileItem>> {
        DirectoryIndexer::new(&self.paths).list_tree()
    }

    fn move_entry(&self, from: &Path, to: &Path) -> Result<()> {
        let source = self.paths.resolve_document(from)?;
        let target = self.paths.resolve_document(to)?;

        fs::symlink_metadata(&source).map_err(|e| StorageError::from_io(e, from))?;
        if source == target {
            return Ok(());
        }
        if target.starts_with(&source) {
            return Err(StorageError::InvalidPath(to.to_path_buf()));
        }
        self.require_vacant(&target, to)?;
        self.require_parent(&target, to)?;

        fs::rename(&source, &target).map_err(|e| StorageError::from_io(e, from))?;
        debug!(from = %from.display(), to = %to.display(), "moved entry");
        Ok(())
    }

    fn rename(&self, path: &Path, new_name: &str) -> Result<PathBuf> {
        let name = validate_name(new_name)?;
        let current = normalize_relative(path)?;
        let renamed = sibling_path(&current, name);
        self.move_entry(&current, &renamed)?;
        Ok(renamed)
    }

    fn duplicate(&self, path: &Path, destination: &Path) -> Result<()> {
        let source = self.paths.resolve_document(path)?;
        let target = self.paths.resolve_document(destination)?;

        self.require_file(&source, path)?;
        self.require_vacant(&target, destination)?;
        self.require_parent(&target, destination)?;

        let bytes = fs::copy(&source, &target).map_err(|e| StorageError::from_io(e, destination))?;
        debug!(from = %path.display(), to = %destination.display(), bytes, "duplicated document");
        Ok(())
    }

    fn remove(&self, path: &Path) -> Result<()> {
        let absolute = self.paths.resolve_document(path)?;
        self.require_file(&absolute, path)?;
        fs::remove_file(&absolute).map_err(|e| StorageError::from_io(e, path))?;
        debug!(path = %path.display(), "removed document");
        Ok(())
    }

    fn load_preference(&self) -> Result<UserPreference> {
        self.preferences.try_load()
    }

    fn save_preference(&self, pref: &UserPreference) -> Result<()> {
        self.preferences.save(pref)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FileKind, Theme};
    use tempfile::{tempdir, TempDir};

    fn setup() -> (TempDir, FileStore) {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().join("vault"));
        store.init().unwrap();
        (dir, store)
    }

    #[test]
    fn write_then_read_round_trips() {
        let (_dir, store) = setup();
        let text = "# Title\n\nünïcödé ✓\n";
        store.write(Path::new("a.md"), text).unwrap();
        assert_eq!(store.read(Path::new("a.md")).unwrap(), text);
    }

    #[test]
    fn write_truncates_existing_content() {
        let (_dir, store) = setup();
        store.write(Path::new("a.md"), "a long first version").unwrap();
        store.write(Path::new("a.md"), "short").unwrap();
        assert_eq!(store.read(Path::new("a.md")).unwrap(), "short");
    }

    #[test]
    fn non_atomic_write_behaves_the_same() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path()).with_atomic_writes(false);
        store.init().unwrap();
        store.write(Path::new("n/a.md"), "one").unwrap();
        store.write(Path::new("n/a.md"), "two").unwrap();
        assert_eq!(store.read(Path::new("n/a.md")).unwrap(), "two");
    }

    #[test]
    fn write_creates_parent_directories() {
        let (_dir, store) = setup();
        store.write(Path::new("notes/today.md"), "hello").unwrap();

        let tree = store.list().unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].name, "notes");
        assert_eq!(tree[0].kind, FileKind::Directory);
        assert_eq!(tree[0].children()[0].name, "today.md");
        assert_eq!(tree[0].children()[0].kind, FileKind::File);
    }

    #[test]
    fn write_through_a_file_fails() {
        let (_dir, store) = setup();
        store.write(Path::new("a.md"), "a").unwrap();
        for rel in ["a.md/b.md", "a.md/x/y.md"] {
            match store.write(Path::new(rel), "b") {
                Err(StorageError::NotAFile(p)) => assert_eq!(p, Path::new("a.md")),
                other => panic!("{rel}: unexpected {other:?}"),
            }
        }
        assert_eq!(store.read(Path::new("a.md")).unwrap(), "a");
    }

    #[test]
    fn atomic_write_leaves_no_temp_files() {
        let (_dir, store) = setup();
        store.write(Path::new("a.md"), "x").unwrap();
        store.write(Path::new("a.md"), "y").unwrap();

        let tree = store.list().unwrap();
        let names: Vec<_> = tree.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["a.md"]);
    }

    #[test]
    fn read_missing_is_not_found() {
        let (_dir, store) = setup();
        let err = store.read(Path::new("nope.md")).unwrap_err();
        assert!(matches!(err, StorageError::NotFound(ref p) if p == Path::new("nope.md")));
    }

    #[test]
    fn read_directory_is_not_a_file() {
        let (_dir, store) = setup();
        store.write(Path::new("d/x.md"), "").unwrap();
        assert!(matches!(
            store.read(Path::new("d")),
            Err(StorageError::NotAFile(_))
        ));
        assert!(matches!(
            store.write(Path::new("d"), "oops"),
            Err(StorageError::NotAFile(_))
        ));
    }

    #[test]
    fn traversal_is_rejected_everywhere() {
        let (dir, store) = setup();
        fs::write(dir.path().join("outside.md"), "secret").unwrap();
        let escape = Path::new("../outside.md");

        assert!(matches!(store.read(escape), Err(StorageError::PathEscapesSandbox(_))));
        assert!(matches!(store.write(escape, "x"), Err(StorageError::PathEscapesSandbox(_))));
        assert!(matches!(store.remove(escape), Err(StorageError::PathEscapesSandbox(_))));
        assert!(matches!(
            store.move_entry(escape, Path::new("in.md")),
            Err(StorageError::PathEscapesSandbox(_))
        ));
        assert!(matches!(
            store.duplicate(escape, Path::new("in.md")),
            Err(StorageError::PathEscapesSandbox(_))
        ));
        assert_eq!(fs::read_to_string(dir.path().join("outside.md")).unwrap(), "secret");
    }

    #[test]
    fn preference_file_is_not_a_document() {
        let (_dir, store) = setup();
        let reserved = Path::new("user_config.json");

        assert!(matches!(store.read(reserved), Err(StorageError::ReservedPath(_))));
        assert!(matches!(store.remove(reserved), Err(StorageError::ReservedPath(_))));
        store.write(Path::new("a.md"), "x").unwrap();
        assert!(matches!(
            store.move_entry(Path::new("a.md"), reserved),
            Err(StorageError::ReservedPath(_))
        ));
        assert!(store.load_preference().is_ok());
    }

    #[test]
    fn rename_stays_in_directory() {
        let (_dir, store) = setup();
        store.write(Path::new("notes/today.md"), "hello").unwrap();

        let renamed = store.rename(Path::new("notes/today.md"), "tomorrow.md").unwrap();
        assert_eq!(renamed, PathBuf::from("notes").join("tomorrow.md"));
        assert_eq!(store.read(&renamed).unwrap(), "hello");
        assert!(store.read(Path::new("notes/today.md")).unwrap_err().is_not_found());
    }

    #[test]
    fn rename_rejects_bad_names_and_collisions() {
        let (_dir, store) = setup();
        store.write(Path::new("a.md"), "a").unwrap();
        store.write(Path::new("b.md"), "b").unwrap();

        assert!(matches!(
            store.rename(Path::new("a.md"), "../b.md"),
            Err(StorageError::InvalidName(_))
        ));
        assert!(matches!(
            store.rename(Path::new("a.md"), "b.md"),
            Err(StorageError::AlreadyExists(_))
        ));
        assert_eq!(store.read(Path::new("b.md")).unwrap(), "b");
    }

    #[test]
    fn rename_missing_is_not_found() {
        let (_dir, store) = setup();
        assert!(store
            .rename(Path::new("ghost.md"), "other.md")
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn move_requires_existing_parent() {
        let (_dir, store) = setup();
        store.write(Path::new("notes/tomorrow.md"), "x").unwrap();

        let err = store
            .move_entry(Path::new("notes/tomorrow.md"), Path::new("archive/tomorrow.md"))
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound(ref p) if p == Path::new("archive")));
        assert_eq!(store.read(Path::new("notes/tomorrow.md")).unwrap(), "x");

        store.write(Path::new("archive/keep.md"), "").unwrap();
        store
            .move_entry(Path::new("notes/tomorrow.md"), Path::new("archive/tomorrow.md"))
            .unwrap();
        assert_eq!(store.read(Path::new("archive/tomorrow.md")).unwrap(), "x");
    }

    #[test]
    fn move_refuses_to_overwrite() {
        let (_dir, store) = setup();
        store.write(Path::new("a.md"), "a").unwrap();
        store.write(Path::new("b.md"), "b").unwrap();

        assert!(matches!(
            store.move_entry(Path::new("a.md"), Path::new("b.md")),
            Err(StorageError::AlreadyExists(_))
        ));
        assert_eq!(store.read(Path::new("a.md")).unwrap(), "a");
        assert_eq!(store.read(Path::new("b.md")).unwrap(), "b");
    }

    #[test]
    fn move_directory_into_itself_is_invalid() {
        let (_dir, store) = setup();
        store.write(Path::new("d/x.md"), "").unwrap();
        assert!(matches!(
            store.move_entry(Path::new("d"), Path::new("d/inner")),
            Err(StorageError::InvalidPath(_))
        ));
    }

    #[test]
    fn duplicate_copies_bytes_and_keeps_source() {
        let (_dir, store) = setup();
        store.write(Path::new("a.md"), "original").unwrap();
        store.duplicate(Path::new("a.md"), Path::new("copy.md")).unwrap();

        assert_eq!(store.read(Path::new("copy.md")).unwrap(), "original");
        assert_eq!(store.read(Path::new("a.md")).unwrap(), "original");
    }

    #[test]
    fn duplicate_checks_destination() {
        let (_dir, store) = setup();
        store.write(Path::new("a.md"), "a").unwrap();
        store.write(Path::new("b.md"), "b").unwrap();

        assert!(matches!(
            store.duplicate(Path::new("a.md"), Path::new("b.md")),
            Err(StorageError::AlreadyExists(_))
        ));
        assert!(store
            .duplicate(Path::new("a.md"), Path::new("missing/b.md"))
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn remove_deletes_single_file_only() {
        let (_dir, store) = setup();
        store.write(Path::new("d/x.md"), "x").unwrap();
        store.write(Path::new("y.md"), "y").unwrap();

        assert!(matches!(
            store.remove(Path::new("d")),
            Err(StorageError::NotAFile(_))
        ));
        store.remove(Path::new("y.md")).unwrap();
        assert!(store.read(Path::new("y.md")).unwrap_err().is_not_found());
        assert!(store.remove(Path::new("y.md")).unwrap_err().is_not_found());
        assert_eq!(store.read(Path::new("d/x.md")).unwrap(), "x");
    }

    #[test]
    fn write_absolute_bypasses_root() {
        let (dir, store) = setup();
        let export = dir.path().join("export.md");
        store.write_absolute(&export, "exported").unwrap();
        assert_eq!(fs::read_to_string(&export).unwrap(), "exported");

        assert!(matches!(
            store.write_absolute(Path::new("relative.md"), "x"),
            Err(StorageError::InvalidPath(_))
        ));
        assert!(store
            .write_absolute(&dir.path().join("no-such-dir").join("x.md"), "x")
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn preferences_round_trip_through_store() {
        let (_dir, store) = setup();
        let pref = UserPreference {
            last_edit_path: "notes/today.md".into(),
            theme: Theme::Dark,
        };
        store.save_preference(&pref).unwrap();
        assert_eq!(store.load_preference().unwrap(), pref);
    }

    #[test]
    fn from_config_uses_explicit_root() {
        let dir = tempdir().unwrap();
        let config = StorageConfig {
            root: Some(dir.path().to_path_buf()),
            atomic_writes: false,
            ..StorageConfig::default()
        };
        let store = FileStore::from_config(&config).unwrap();
        assert_eq!(store.root(), dir.path());
        assert!(!store.atomic_writes);
    }
}
