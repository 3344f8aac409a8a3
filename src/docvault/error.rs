use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Path escapes the storage root: {0}")]
    PathEscapesSandbox(PathBuf),

    #[error("Not found: {0}")]
    NotFound(PathBuf),

    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    #[error("Already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("Not a file: {0}")]
    NotAFile(PathBuf),

    #[error("Reserved path cannot be used for documents: {0}")]
    ReservedPath(PathBuf),

    #[error("Invalid name: {0:?}")]
    InvalidName(String),

    #[error("Invalid path: {0}")]
    InvalidPath(PathBuf),

    #[error("Unable to read directory {path}: {source}")]
    DirectoryRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Worker error: {0}")]
    Worker(String),
}

impl StorageError {
    /// Classify an I/O failure on `path` into the matching typed variant.
    pub fn from_io(source: io::Error, path: &Path) -> Self {
        let path = path.to_path_buf();
        match source.kind() {
            io::ErrorKind::NotFound => StorageError::NotFound(path),
            io::ErrorKind::PermissionDenied => StorageError::PermissionDenied(path),
            io::ErrorKind::AlreadyExists => StorageError::AlreadyExists(path),
            _ => StorageError::Io { path, source },
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;
