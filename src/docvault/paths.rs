//! # Sandbox Paths
//!
//! Every relative path handed to the store is confined to the storage root here.
//!
//! Resolution happens in two passes:
//!
//! 1. **Lexical**: `.` segments are dropped and `..` pops the previous segment. A path that
//!    is absolute, carries a drive prefix, or climbs above the root is rejected with
//!    [`StorageError::PathEscapesSandbox`]. No filesystem access is needed for this pass,
//!    so [`normalize_relative`] is also used by the in-memory store and the worker locks.
//!
//! 2. **Canonical**: the longest existing ancestor of the joined path is canonicalized and
//!    must stay under the canonical root. This catches symlinks inside the root that point
//!    elsewhere. A dangling symlink on the way is rejected as well, since writing through
//!    it would create a file wherever it points.

use crate::error::{Result, StorageError};
use std::fs;
use std::path::{Component, Path, PathBuf};
use uuid::Uuid;

/// Name of the preference record kept at the top of the storage root.
pub const PREFERENCE_FILENAME: &str = "user_config.json";

const TEMP_SUFFIX: &str = ".tmp";
const UUID_LEN: usize = 36;

#[derive(Debug, Clone)]
pub struct StoragePaths {
    root: PathBuf,
    preference_file: PathBuf,
}

impl StoragePaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let preference_file = root.join(PREFERENCE_FILENAME);
        Self {
            root,
            preference_file,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn preference_file(&self) -> &Path {
        &self.preference_file
    }

    /// Join `relative` onto the root, refusing anything that would land outside it.
    pub fn resolve<P: AsRef<Path>>(&self, relative: P) -> Result<PathBuf> {
        let relative = relative.as_ref();
        let normalized = normalize_relative(relative)?;
        let resolved = self.root.join(normalized);
        self.check_canonical(relative, &resolved)?;
        Ok(resolved)
    }

    /// Like [`resolve`](Self::resolve), but also refuses the root itself and the
    /// preference file. Used by every document operation.
    pub fn resolve_document<P: AsRef<Path>>(&self, relative: P) -> Result<PathBuf> {
        let relative = relative.as_ref();
        let resolved = self.resolve(relative)?;
        if resolved == self.root {
            return Err(StorageError::InvalidPath(relative.to_path_buf()));
        }
        if self.is_reserved(&resolved) || self.reaches_preference_file(&resolved) {
            return Err(StorageError::ReservedPath(relative.to_path_buf()));
        }
        Ok(resolved)
    }

    /// Root-relative form of a path under the root.
    pub fn relative_of(&self, absolute: &Path) -> Option<PathBuf> {
        absolute.strip_prefix(&self.root).ok().map(Path::to_path_buf)
    }

    pub fn is_reserved(&self, absolute: &Path) -> bool {
        absolute == self.preference_file
    }

    /// Whether `resolved` lands on the preference file once symlinks are followed, e.g.
    /// `alias/user_config.json` with `alias -> .`.
    fn reaches_preference_file(&self, resolved: &Path) -> bool {
        let Ok(canonical_root) = fs::canonicalize(&self.root) else {
            return false;
        };
        let reserved = canonical_root.join(PREFERENCE_FILENAME);

        if let Ok(canonical) = fs::canonicalize(resolved) {
            return canonical == reserved;
        }
        match (resolved.parent(), resolved.file_name()) {
            (Some(parent), Some(name)) => fs::canonicalize(parent)
                .map(|p| p.join(name) == reserved)
                .unwrap_or(false),
            _ => false,
        }
    }

    fn check_canonical(&self, requested: &Path, resolved: &Path) -> Result<()> {
        // Before init the root may not exist; nothing on disk can redirect us yet.
        let Ok(canonical_root) = fs::canonicalize(&self.root) else {
            return Ok(());
        };

        let mut probe = resolved;
        loop {
            match fs::canonicalize(probe) {
                Ok(canonical) => {
                    if canonical.starts_with(&canonical_root) {
                        return Ok(());
                    }
                    return Err(StorageError::PathEscapesSandbox(requested.to_path_buf()));
                }
                Err(_) => {
                    let dangling = fs::symlink_metadata(probe)
                        .map(|m| m.file_type().is_symlink())
                        .unwrap_or(false);
                    if dangling {
                        return Err(StorageError::PathEscapesSandbox(requested.to_path_buf()));
                    }
                }
            }

            match probe.parent() {
                Some(parent) if probe != self.root => probe = parent,
                _ => return Ok(()),
            }
        }
    }
}

/// Lexically normalize a root-relative path.
pub fn normalize_relative(path: &Path) -> Result<PathBuf> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    return Err(StorageError::PathEscapesSandbox(path.to_path_buf()));
                }
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(StorageError::PathEscapesSandbox(path.to_path_buf()));
            }
        }
    }
    Ok(out)
}

/// Hidden sibling used as the staging file of an atomic write to `target`.
pub fn temp_path_for(target: &Path) -> Option<PathBuf> {
    let name = target.file_name()?;
    Some(target.with_file_name(format!(
        ".{}.{}{}",
        name.to_string_lossy(),
        Uuid::new_v4(),
        TEMP_SUFFIX
    )))
}

/// Whether `name` looks like a staging file left by [`temp_path_for`].
pub fn is_temp_name(name: &str) -> bool {
    let Some(stem) = name.strip_suffix(TEMP_SUFFIX) else {
        return false;
    };
    let split = stem.len().saturating_sub(UUID_LEN);
    if !stem.starts_with('.') || split < 2 || !stem.is_char_boundary(split) {
        return false;
    }
    let (head, id) = stem.split_at(split);
    head.ends_with('.') && Uuid::parse_str(id).is_ok()
}

/// Check that `name` is a single plain file name usable as a rename target.
pub fn validate_name(name: &str) -> Result<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty() || trimmed == "." || trimmed == ".." || name.contains(['/', '\\']) {
        return Err(StorageError::InvalidName(name.to_string()));
    }
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(name),
        _ => Err(StorageError::InvalidName(name.to_string())),
    }
}
