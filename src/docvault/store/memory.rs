use super::{sibling_path, DocumentStore, InitReport};
use crate::error::{Result, StorageError};
use crate::model::{FileItem, UserPreference};
use crate::paths::{normalize_relative, validate_name, PREFERENCE_FILENAME};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

const VIRTUAL_ROOT: &str = "/memory";

#[derive(Debug, Clone)]
enum Entry {
    File(String),
    Dir,
}

#[derive(Debug, Default)]
struct State {
    // Keyed by normalized root-relative path; BTreeMap order is component-wise, i.e. by name.
    entries: BTreeMap<PathBuf, Entry>,
    exports: BTreeMap<PathBuf, String>,
    preference: Option<UserPreference>,
}

pub struct InMemoryStore {
    root: PathBuf,
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            root: PathBuf::from(VIRTUAL_ROOT),
            state: Mutex::new(State::default()),
        }
    }

    /// Content written through `write_absolute`, for assertions.
    pub fn exported(&self, path: &Path) -> Option<String> {
        self.state().exports.get(path).cloned()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn resolve(&self, path: &Path) -> Result<PathBuf> {
        let relative = normalize_relative(path)?;
        if relative.as_os_str().is_empty() {
            return Err(StorageError::InvalidPath(path.to_path_buf()));
        }
        if relative == Path::new(PREFERENCE_FILENAME) {
            return Err(StorageError::ReservedPath(path.to_path_buf()));
        }
        Ok(relative)
    }

    fn build_tree(&self, entries: &BTreeMap<PathBuf, Entry>, dir: &Path) -> Vec<FileItem> {
        entries
            .iter()
            .filter(|(path, _)| path.parent() == Some(dir))
            .map(|(path, entry)| {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let absolute = self.root.join(path);
                match entry {
                    Entry::File(content) => FileItem {
                        size: content.len() as u64,
                        ..FileItem::file(name, path.clone(), absolute)
                    },
                    Entry::Dir => {
                        let children = self.build_tree(entries, path);
                        FileItem::directory(name, path.clone(), absolute, children)
                    }
                }
            })
            .collect()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn parent_exists(entries: &BTreeMap<PathBuf, Entry>, path: &Path) -> bool {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            matches!(entries.get(parent), Some(Entry::Dir))
        }
        _ => true,
    }
}

impl DocumentStore for InMemoryStore {
    fn root(&self) -> &Path {
        &self.root
    }

    fn init(&self) -> Result<InitReport> {
        let mut state = self.state();
        let created_preferences = state.preference.is_none();
        if created_preferences {
            state.preference = Some(UserPreference::default());
        }
        Ok(InitReport {
            root: self.root.clone(),
            created_preferences,
            error: None,
        })
    }

    fn read(&self, path: &Path) -> Result<String> {
        let relative = self.resolve(path)?;
        match self.state().entries.get(&relative) {
            Some(Entry::File(content)) => Ok(content.clone()),
            Some(Entry::Dir) => Err(StorageError::NotAFile(path.to_path_buf())),
            None => Err(StorageError::NotFound(path.to_path_buf())),
        }
    }

    fn write(&self, path: &Path, content: &str) -> Result<()> {
        let relative = self.resolve(path)?;
        let mut state = self.state();

        if let Some(Entry::Dir) = state.entries.get(&relative) {
            return Err(StorageError::NotAFile(path.to_path_buf()));
        }
        let ancestors: Vec<PathBuf> = relative
            .ancestors()
            .skip(1)
            .filter(|a| !a.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .collect();
        if let Some(blocker) = ancestors
            .iter()
            .rev()
            .find(|a| matches!(state.entries.get(a.as_path()), Some(Entry::File(_))))
        {
            return Err(StorageError::NotAFile(blocker.clone()));
        }
        for ancestor in ancestors {
            state.entries.entry(ancestor).or_insert(Entry::Dir);
        }
        state
            .entries
            .insert(relative, Entry::File(content.to_string()));
        Ok(())
    }

    fn write_absolute(&self, path: &Path, content: &str) -> Result<()> {
        if !path.is_absolute() {
            return Err(StorageError::InvalidPath(path.to_path_buf()));
        }
        self.state()
            .exports
            .insert(path.to_path_buf(), content.to_string());
        Ok(())
    }

    fn list(&self) -> Result<Vec<FileItem>> {
        let state = self.state();
        Ok(self.build_tree(&state.entries, Path::new("")))
    }

    fn move_entry(&self, from: &Path, to: &Path) -> Result<()> {
        let source = self.resolve(from)?;
        let target = self.resolve(to)?;
        let mut state = self.state();

        if !state.entries.contains_key(&source) {
            return Err(StorageError::NotFound(from.to_path_buf()));
        }
        if source == target {
            return Ok(());
        }
        if target.starts_with(&source) {
            return Err(StorageError::InvalidPath(to.to_path_buf()));
        }
        if state.entries.contains_key(&target) {
            return Err(StorageError::AlreadyExists(to.to_path_buf()));
        }
        if !parent_exists(&state.entries, &target) {
            return Err(StorageError::NotFound(
                to.parent().unwrap_or(to).to_path_buf(),
            ));
        }

        let moved: Vec<PathBuf> = state
            .entries
            .keys()
            .filter(|k| k.starts_with(&source))
            .cloned()
            .collect();
        for old in moved {
            if let Some(entry) = state.entries.remove(&old) {
                let suffix = old.strip_prefix(&source).unwrap_or(Path::new(""));
                let new = if suffix.as_os_str().is_empty() {
                    target.clone()
                } else {
                    target.join(suffix)
                };
                state.entries.insert(new, entry);
            }
        }
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
        let source = self.resolve(path)?;
        let target = self.resolve(destination)?;
        let mut state = self.state();

        let content = match state.entries.get(&source) {
            Some(Entry::File(content)) => content.clone(),
            Some(Entry::Dir) => return Err(StorageError::NotAFile(path.to_path_buf())),
            None => return Err(StorageError::NotFound(path.to_path_buf())),
        };
        if state.entries.contains_key(&target) {
            return Err(StorageError::AlreadyExists(destination.to_path_buf()));
        }
        if !parent_exists(&state.entries, &target) {
            return Err(StorageError::NotFound(
                destination.parent().unwrap_or(destination).to_path_buf(),
            ));
        }
        state.entries.insert(target, Entry::File(content));
        Ok(())
    }

    fn remove(&self, path: &Path) -> Result<()> {
        let relative = self.resolve(path)?;
        let mut state = self.state();
        match state.entries.remove(&relative) {
            Some(Entry::File(_)) => Ok(()),
            Some(dir @ Entry::Dir) => {
                state.entries.insert(relative, dir);
                Err(StorageError::NotAFile(path.to_path_buf()))
            }
            None => Err(StorageError::NotFound(path.to_path_buf())),
        }
    }

    fn load_preference(&self) -> Result<UserPreference> {
        self.state()
            .preference
            .clone()
            .ok_or_else(|| StorageError::NotFound(PathBuf::from(PREFERENCE_FILENAME)))
    }

    fn save_preference(&self, pref: &UserPreference) -> Result<()> {
        self.state().preference = Some(pref.clone());
        Ok(())
    }
}
