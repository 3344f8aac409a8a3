use clap::{Parser, Subcommand};
use docvault::model::Theme;
use std::path::PathBuf;

/// Returns the version string, including git hash and commit date for non-release builds.
/// Format: "0.3.2" for releases, "0.3.2@abc1234 2024-01-15 14:30" for dev builds
fn get_version() -> &'static str {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    const GIT_HASH: &str = env!("GIT_HASH");
    const GIT_COMMIT_DATE: &str = env!("GIT_COMMIT_DATE");
    const IS_RELEASE: &str = env!("IS_RELEASE");

    use std::sync::OnceLock;
    static VERSION_STRING: OnceLock<String> = OnceLock::new();

    VERSION_STRING.get_or_init(|| {
        if IS_RELEASE == "true" || GIT_HASH.is_empty() {
            VERSION.to_string()
        } else {
            format!("{}@{} {}", VERSION, GIT_HASH, GIT_COMMIT_DATE)
        }
    })
}

#[derive(Parser, Debug)]
#[command(name = "docvault", bin_name = "docvault", version = get_version())]
#[command(about = "Sandboxed document storage for the editor", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Storage root (overrides config and DOCVAULT_ROOT)
    #[arg(long, global = true, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Config file (defaults to the platform config dir)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Verbose output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the storage root and default preferences
    Init,

    /// Show the document tree
    #[command(alias = "ls")]
    List {
        /// Print the tree as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print a document
    #[command(alias = "cat")]
    Read {
        /// Path relative to the storage root
        path: PathBuf,
    },

    /// Create or overwrite a document (reads stdin when no content is given)
    Write {
        /// Path relative to the storage root
        path: PathBuf,

        /// New content
        content: Option<String>,
    },

    /// Write content to an absolute path outside the storage root
    Export {
        /// Absolute destination path
        path: PathBuf,

        /// Content (reads stdin when omitted)
        content: Option<String>,
    },

    /// Move a document to another location under the root
    #[command(name = "move", alias = "mv")]
    Move {
        from: PathBuf,
        to: PathBuf,
    },

    /// Rename a document within its directory
    Rename {
        path: PathBuf,

        /// New base name
        name: String,
    },

    /// Copy a document
    #[command(alias = "cp")]
    Duplicate {
        path: PathBuf,
        destination: PathBuf,
    },

    /// Delete a document
    #[command(alias = "rm")]
    Remove {
        path: PathBuf,
    },

    /// Show or change preferences
    Pref {
        #[command(subcommand)]
        action: Option<PrefAction>,

        /// Print preferences as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum PrefAction {
    /// Update one or more preference fields
    Set {
        /// UI theme (light or dark)
        #[arg(long)]
        theme: Option<Theme>,

        /// Last edited document
        #[arg(long, value_name = "PATH")]
        last_edit: Option<String>,
    },
}
