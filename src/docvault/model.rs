use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_LAST_EDIT_PATH: &str = "Untitled";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Theme::Light => write!(f, "light"),
            Theme::Dark => write!(f, "dark"),
        }
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(format!("Unknown theme: {}", other)),
        }
    }
}

/// The persisted editor preferences, stored in `user_config.json` at the storage root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserPreference {
    pub last_edit_path: String,
    pub theme: Theme,
}

impl Default for UserPreference {
    fn default() -> Self {
        Self {
            last_edit_path: DEFAULT_LAST_EDIT_PATH.to_string(),
            theme: Theme::Light,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileKind {
    File,
    Directory,
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileKind::File => write!(f, "File"),
            FileKind::Directory => write!(f, "Directory"),
        }
    }
}

/// One node of the document tree.
///
/// `relative_path` addresses the entry in storage operations, `absolute_path` is what
/// a UI shows or hands to the OS. Directories always carry `dir_content` (possibly
/// empty); files never do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileItem {
    #[serde(rename = "type")]
    pub kind: FileKind,
    pub name: String,
    pub relative_path: PathBuf,
    pub absolute_path: PathBuf,
    #[serde(default)]
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir_content: Option<Vec<FileItem>>,
}

impl FileItem {
    pub fn file(name: impl Into<String>, relative_path: PathBuf, absolute_path: PathBuf) -> Self {
        Self {
            kind: FileKind::File,
            name: name.into(),
            relative_path,
            absolute_path,
            size: 0,
            modified_at: None,
            dir_content: None,
        }
    }

    pub fn directory(
        name: impl Into<String>,
        relative_path: PathBuf,
        absolute_path: PathBuf,
        children: Vec<FileItem>,
    ) -> Self {
        Self {
            kind: FileKind::Directory,
            name: name.into(),
            relative_path,
            absolute_path,
            size: 0,
            modified_at: None,
            dir_content: Some(children),
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == FileKind::Directory
    }

    pub fn children(&self) -> &[FileItem] {
        self.dir_content.as_deref().unwrap_or(&[])
    }

    /// Depth-first search of a forest for the node at `relative_path`.
    pub fn find<'a>(items: &'a [FileItem], relative_path: &std::path::Path) -> Option<&'a FileItem> {
        for item in items {
            if item.relative_path == relative_path {
                return Some(item);
            }
            if relative_path.starts_with(&item.relative_path) {
                if let Some(found) = FileItem::find(item.children(), relative_path) {
                    return Some(found);
                }
            }
        }
        None
    }
}
