//! # Directory Index
//!
//! Builds the document tree shown by the editor's sidebar.
//!
//! The walk starts at the storage root and returns a forest: the root's own entries at
//! the top level, each directory carrying its children in `dir_content`. The preference
//! file at the top of the root is skipped; a file with the same name deeper in the tree is
//! an ordinary document.
//!
//! Entries are stat'ed the way `stat` does (symlinks followed), so a link to a directory
//! shows up as a `Directory`. Links that dangle, leave the root, point at a directory above
//! themselves, or point at the preference file are skipped. Staging files left by an
//! interrupted atomic write are skipped too. Entries at every level are sorted by file name
//! so listings are stable across platforms.
//!
//! Any directory that cannot be listed aborts the whole walk with
//! [`StorageError::DirectoryRead`]. There is no partial result.

use crate::error::{Result, StorageError};
use crate::model::{FileItem, FileKind};
use crate::paths::{is_temp_name, StoragePaths, PREFERENCE_FILENAME};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::trace;

pub struct DirectoryIndexer<'a> {
    paths: &'a StoragePaths,
}

impl<'a> DirectoryIndexer<'a> {
    pub fn new(paths: &'a StoragePaths) -> Self {
        Self { paths }
    }

    pub fn list_tree(&self) -> Result<Vec<FileItem>> {
        let root = self.paths.root();
        let canonical_root = fs::canonicalize(root).map_err(|source| StorageError::DirectoryRead {
            path: root.to_path_buf(),
            source,
        })?;
        let mut ancestors = vec![canonical_root.clone()];
        self.read_dir_recursively(root, &canonical_root, &mut ancestors)
    }

    /// `ancestors` holds the canonical form of every directory from the root down to `dir`.
    fn read_dir_recursively(
        &self,
        dir: &Path,
        canonical_root: &Path,
        ancestors: &mut Vec<PathBuf>,
    ) -> Result<Vec<FileItem>> {
        let read_error = |source| StorageError::DirectoryRead {
            path: dir.to_path_buf(),
            source,
        };

        let mut entries = Vec::new();
        for entry in fs::read_dir(dir).map_err(read_error)? {
            entries.push(entry.map_err(read_error)?);
        }
        entries.sort_by_key(|e| e.file_name());

        let mut items = Vec::with_capacity(entries.len());
        for entry in entries {
            let absolute = entry.path();
            let name = entry.file_name().to_string_lossy().into_owned();
            if self.paths.is_reserved(&absolute) || is_temp_name(&name) {
                continue;
            }

            let is_link = entry.file_type().map_err(read_error)?.is_symlink();
            if is_link && !self.link_is_listable(&absolute, canonical_root, ancestors) {
                continue;
            }

            // Follows symlinks; an entry removed mid-walk is a read failure of its parent.
            let meta = fs::metadata(&absolute).map_err(read_error)?;
            let relative = self
                .paths
                .relative_of(&absolute)
                .unwrap_or_else(|| absolute.clone());
            let modified_at = meta.modified().ok().map(DateTime::<Utc>::from);

            let item = if meta.is_dir() {
                trace!(dir = %absolute.display(), "descending");
                ancestors.push(fs::canonicalize(&absolute).map_err(read_error)?);
                let children = self.read_dir_recursively(&absolute, canonical_root, ancestors);
                ancestors.pop();
                FileItem {
                    modified_at,
                    ..FileItem::directory(name, relative, absolute, children?)
                }
            } else {
                FileItem {
                    size: meta.len(),
                    modified_at,
                    ..FileItem::file(name, relative, absolute)
                }
            };
            items.push(item);
        }

        Ok(items)
    }

    /// Symlinks are listed only when their target exists, stays under the root and is not
    /// a directory above them (which would recurse forever). Anything else is left out of
    /// the tree, since document operations would refuse it anyway.
    fn link_is_listable(&self, link: &Path, canonical_root: &Path, ancestors: &[PathBuf]) -> bool {
        match fs::canonicalize(link) {
            Ok(target) if !target.starts_with(canonical_root) => {
                trace!(link = %link.display(), "skipping link leaving the root");
                false
            }
            Ok(target) if ancestors.contains(&target) => {
                trace!(link = %link.display(), "skipping link cycle");
                false
            }
            Ok(target) if target == canonical_root.join(PREFERENCE_FILENAME) => {
                trace!(link = %link.display(), "skipping link to preferences");
                false
            }
            Ok(_) => true,
            Err(_) => {
                trace!(link = %link.display(), "skipping dangling link");
                false
            }
        }
    }
}

/// Total number of nodes of the given kind in a forest.
pub fn count_kind(items: &[FileItem], kind: FileKind) -> usize {
    items
        .iter()
        .map(|i| usize::from(i.kind == kind) + count_kind(i.children(), kind))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn names(items: &[FileItem]) -> Vec<&str> {
        items.iter().map(|i| i.name.as_str()).collect()
    }

    #[test]
    fn builds_sorted_tree_without_preferences() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("user_config.json"), "{}").unwrap();
        fs::write(root.join("b.md"), "bee").unwrap();
        fs::write(root.join("a.md"), "a").unwrap();
        fs::create_dir_all(root.join("notes").join("deep")).unwrap();
        fs::write(root.join("notes").join("today.md"), "hello").unwrap();
        fs::write(root.join("notes").join("user_config.json"), "doc").unwrap();

        let paths = StoragePaths::new(root);
        let tree = DirectoryIndexer::new(&paths).list_tree().unwrap();

        assert_eq!(names(&tree), vec!["a.md", "b.md", "notes"]);
        assert_eq!(tree[1].size, 3);
        assert!(tree[1].dir_content.is_none());

        let notes = &tree[2];
        assert_eq!(notes.kind, FileKind::Directory);
        assert_eq!(notes.relative_path, PathBuf::from("notes"));
        assert_eq!(names(notes.children()), vec!["deep", "today.md", "user_config.json"]);

        let today = &notes.children()[1];
        assert_eq!(today.kind, FileKind::File);
        assert_eq!(today.relative_path, PathBuf::from("notes").join("today.md"));
        assert_eq!(today.absolute_path, root.join("notes").join("today.md"));
        assert!(today.modified_at.is_some());

        let deep = &notes.children()[0];
        assert_eq!(deep.dir_content, Some(vec![]));
    }

    #[test]
    fn empty_root_lists_nothing() {
        let dir = tempdir().unwrap();
        let paths = StoragePaths::new(dir.path());
        assert!(DirectoryIndexer::new(&paths).list_tree().unwrap().is_empty());
    }

    #[test]
    fn missing_root_is_directory_read_error() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing");
        let paths = StoragePaths::new(&missing);

        match DirectoryIndexer::new(&paths).list_tree() {
            Err(StorageError::DirectoryRead { path, .. }) => assert_eq!(path, missing),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn staging_files_are_not_listed() {
        let dir = tempdir().unwrap();
        let stray = crate::paths::temp_path_for(&dir.path().join("a.md")).unwrap();
        fs::write(&stray, "half").unwrap();
        fs::write(dir.path().join("a.md"), "whole").unwrap();
        fs::write(dir.path().join(".notes.tmp"), "doc").unwrap();

        let paths = StoragePaths::new(dir.path());
        let tree = DirectoryIndexer::new(&paths).list_tree().unwrap();
        assert_eq!(names(&tree), vec![".notes.tmp", "a.md"]);
    }

    #[cfg(unix)]
    #[test]
    fn self_referencing_link_is_skipped() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("a.md"), "a").unwrap();
        std::os::unix::fs::symlink(".", dir.path().join("loop")).unwrap();
        std::os::unix::fs::symlink("..", dir.path().join("sub").join("up")).unwrap();

        let paths = StoragePaths::new(dir.path());
        let tree = DirectoryIndexer::new(&paths).list_tree().unwrap();
        assert_eq!(names(&tree), vec!["sub"]);
        assert_eq!(names(tree[0].children()), vec!["a.md"]);
    }

    #[cfg(unix)]
    #[test]
    fn links_outside_root_are_skipped() {
        let outside = tempdir().unwrap();
        fs::write(outside.path().join("secret.txt"), "s").unwrap();
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("real")).unwrap();
        fs::write(dir.path().join("real").join("r.md"), "r").unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("ext")).unwrap();
        std::os::unix::fs::symlink("/nonexistent/x", dir.path().join("dangling")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("real"), dir.path().join("alias")).unwrap();

        let paths = StoragePaths::new(dir.path());
        let tree = DirectoryIndexer::new(&paths).list_tree().unwrap();
        assert_eq!(names(&tree), vec!["alias", "real"]);
        assert_eq!(names(tree[0].children()), vec!["r.md"]);
        assert_eq!(names(tree[1].children()), vec!["r.md"]);
    }

    #[test]
    fn counts_kinds_across_levels() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("x").join("y")).unwrap();
        fs::write(dir.path().join("x").join("y").join("z.md"), "").unwrap();
        fs::write(dir.path().join("top.md"), "").unwrap();

        let paths = StoragePaths::new(dir.path());
        let tree = DirectoryIndexer::new(&paths).list_tree().unwrap();
        assert_eq!(count_kind(&tree, FileKind::Directory), 2);
        assert_eq!(count_kind(&tree, FileKind::File), 2);
    }
}
