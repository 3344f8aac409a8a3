use crate::error::{Result, StorageError};
use directories::{BaseDirs, ProjectDirs, UserDirs};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILENAME: &str = "config.json";
pub const DEFAULT_APP_NAME: &str = "docvault";
pub const ROOT_ENV: &str = "DOCVAULT_ROOT";
pub const APP_NAME_ENV: &str = "DOCVAULT_APP_NAME";

/// Configuration for the document store, stored in the platform config dir as config.json
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StorageConfig {
    /// Directory name created under the user's documents dir
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Explicit storage root, bypassing the documents-dir lookup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,

    /// Write documents through a temp file + rename
    #[serde(default = "default_atomic_writes")]
    pub atomic_writes: bool,
}

fn default_app_name() -> String {
    DEFAULT_APP_NAME.to_string()
}

fn default_atomic_writes() -> bool {
    true
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            root: None,
            atomic_writes: default_atomic_writes(),
        }
    }
}

impl StorageConfig {
    /// Load config from the given file, or return defaults if not found
    pub fn load<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let config_path = config_path.as_ref();

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content =
            fs::read_to_string(config_path).map_err(|e| StorageError::from_io(e, config_path))?;
        let config: StorageConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save config to the given file
    pub fn save<P: AsRef<Path>>(&self, config_path: P) -> Result<()> {
        let config_path = config_path.as_ref();

        if let Some(dir) = config_path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                fs::create_dir_all(dir).map_err(|e| StorageError::from_io(e, dir))?;
            }
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(config_path, content).map_err(|e| StorageError::from_io(e, config_path))?;
        Ok(())
    }

    /// Default location of the config file (platform config dir), if the platform has one
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "docvault", "docvault")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILENAME))
    }

    /// Apply `DOCVAULT_ROOT` / `DOCVAULT_APP_NAME` from the environment
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(
            std::env::var_os(ROOT_ENV).map(PathBuf::from),
            std::env::var(APP_NAME_ENV).ok(),
        )
    }

    pub fn with_overrides(mut self, root: Option<PathBuf>, app_name: Option<String>) -> Self {
        if let Some(root) = root.filter(|r| !r.as_os_str().is_empty()) {
            self.root = Some(root);
        }
        if let Some(name) = app_name.filter(|n| !n.trim().is_empty()) {
            self.app_name = name;
        }
        self
    }

    /// Compute the storage root: explicit root, else `<documents>/<app_name>`,
    /// else `<home>/Documents/<app_name>`.
    pub fn resolve_root(&self) -> Result<PathBuf> {
        if let Some(root) = &self.root {
            return Ok(root.clone());
        }

        if self.app_name.is_empty()
            || self.app_name.contains(['/', '\\'])
            || self.app_name == "."
            || self.app_name == ".."
        {
            return Err(StorageError::Config(format!(
                "app name {:?} is not a valid directory name",
                self.app_name
            )));
        }

        if let Some(docs) = UserDirs::new().and_then(|u| u.document_dir().map(Path::to_path_buf)) {
            return Ok(docs.join(&self.app_name));
        }

        BaseDirs::new()
            .map(|b| b.home_dir().join("Documents").join(&self.app_name))
            .ok_or_else(|| {
                StorageError::Config("Could not determine a documents directory".to_string())
            })
    }
}
