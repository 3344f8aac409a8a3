//! # Async Worker
//!
//! [`AsyncStorage`] lets an event-driven UI call the storage facade without blocking its
//! own thread. Each call runs on tokio's blocking pool and resolves to the same typed
//! result the synchronous facade returns.
//!
//! Calls that touch the same root-relative path are serialized: before dispatch a call
//! takes an owned async mutex for every path it touches, in sorted order, and holds them
//! until the blocking work finishes. Calls on unrelated paths run in parallel. Preference
//! reads and writes share one key, the preference file name.

use crate::api::StorageApi;
use crate::error::{Result, StorageError};
use crate::model::{FileItem, UserPreference};
use crate::paths::{normalize_relative, validate_name, PREFERENCE_FILENAME};
use crate::store::{sibling_path, DocumentStore, InitReport};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::trace;

#[derive(Default)]
struct PathLocks {
    locks: Mutex<HashMap<PathBuf, Arc<AsyncMutex<()>>>>,
}

impl PathLocks {
    async fn acquire(&self, mut keys: Vec<PathBuf>) -> Vec<OwnedMutexGuard<()>> {
        keys.sort();
        keys.dedup();

        let handles: Vec<_> = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            keys.iter()
                .map(|k| locks.entry(k.clone()).or_default().clone())
                .collect()
        };

        let mut guards = Vec::with_capacity(handles.len());
        for handle in handles {
            guards.push(handle.lock_owned().await);
        }
        guards
    }

    /// Drop entries nobody is waiting on or holding.
    fn prune(&self) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Lock key for a root-relative path. Unnormalizable paths fail in the store anyway,
/// so they key on their raw form.
fn lock_key(path: &Path) -> PathBuf {
    normalize_relative(path).unwrap_or_else(|_| path.to_path_buf())
}

pub struct AsyncStorage<S: DocumentStore> {
    api: Arc<StorageApi<S>>,
    locks: Arc<PathLocks>,
}

impl<S: DocumentStore> Clone for AsyncStorage<S> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            locks: Arc::clone(&self.locks),
        }
    }
}

impl<S> AsyncStorage<S>
where
    S: DocumentStore + Send + Sync + 'static,
{
    pub fn new(api: StorageApi<S>) -> Self {
        Self {
            api: Arc::new(api),
            locks: Arc::new(PathLocks::default()),
        }
    }

    pub fn api(&self) -> &StorageApi<S> {
        &self.api
    }

    async fn run<T, F>(&self, keys: Vec<PathBuf>, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&StorageApi<S>) -> Result<T> + Send + 'static,
    {
        trace!(?keys, "acquiring path locks");
        let guards = self.locks.acquire(keys).await;
        let api = Arc::clone(&self.api);
        // Guards travel with the job so a cancelled caller cannot release them early.
        let joined = tokio::task::spawn_blocking(move || {
            let _guards = guards;
            op(&api)
        })
        .await;
        self.locks.prune();
        joined.map_err(|e| StorageError::Worker(e.to_string()))?
    }

    pub async fn init(&self) -> InitReport {
        let root = self.api.root().to_path_buf();
        let keys = vec![PathBuf::from(PREFERENCE_FILENAME)];
        match self.run(keys, |api| Ok(api.init())).await {
            Ok(report) => report,
            Err(e) => InitReport {
                root,
                created_preferences: false,
                error: Some(e.to_string()),
            },
        }
    }

    pub async fn read(&self, path: impl Into<PathBuf>) -> Result<String> {
        let path = path.into();
        self.run(vec![lock_key(&path)], move |api| api.read(&path))
            .await
    }

    pub async fn write(&self, path: impl Into<PathBuf>, content: impl Into<String>) -> Result<()> {
        let path = path.into();
        let content = content.into();
        self.run(vec![lock_key(&path)], move |api| api.write(&path, &content))
            .await
    }

    pub async fn write_absolute(
        &self,
        path: impl Into<PathBuf>,
        content: impl Into<String>,
    ) -> Result<()> {
        let path = path.into();
        let content = content.into();
        self.run(vec![path.clone()], move |api| {
            api.write_absolute(&path, &content)
        })
        .await
    }

    pub async fn list(&self) -> Result<Vec<FileItem>> {
        self.run(Vec::new(), |api| api.list()).await
    }

    pub async fn move_entry(&self, from: impl Into<PathBuf>, to: impl Into<PathBuf>) -> Result<()> {
        let from = from.into();
        let to = to.into();
        let keys = vec![lock_key(&from), lock_key(&to)];
        self.run(keys, move |api| api.move_entry(&from, &to)).await
    }

    pub async fn rename(&self, path: impl Into<PathBuf>, new_name: impl Into<String>) -> Result<PathBuf> {
        let path = path.into();
        let new_name = new_name.into();
        let mut keys = vec![lock_key(&path)];
        if let Ok(name) = validate_name(&new_name) {
            keys.push(sibling_path(&lock_key(&path), name));
        }
        self.run(keys, move |api| api.rename(&path, &new_name)).await
    }

    pub async fn duplicate(
        &self,
        path: impl Into<PathBuf>,
        destination: impl Into<PathBuf>,
    ) -> Result<()> {
        let path = path.into();
        let destination = destination.into();
        let keys = vec![lock_key(&path), lock_key(&destination)];
        self.run(keys, move |api| api.duplicate(&path, &destination))
            .await
    }

    pub async fn remove(&self, path: impl Into<PathBuf>) -> Result<()> {
        let path = path.into();
        self.run(vec![lock_key(&path)], move |api| api.remove(&path))
            .await
    }

    pub async fn get_user_preference(&self) -> UserPreference {
        let keys = vec![PathBuf::from(PREFERENCE_FILENAME)];
        self.run(keys, |api| Ok(api.get_user_preference()))
            .await
            .unwrap_or_default()
    }

    pub async fn save_user_preference(&self, pref: UserPreference) -> Result<()> {
        let keys = vec![PathBuf::from(PREFERENCE_FILENAME)];
        self.run(keys, move |api| api.save_user_preference(&pref))
            .await
    }
}
