//! # CLI Layer
//!
//! This module is **one possible client** of the storage core. It stands where an editor's
//! IPC dispatcher would: each subcommand maps to exactly one facade call.
//!
//! The CLI layer is the **only** place in the codebase that:
//! - Knows about terminal I/O (stdout, stderr, stdin)
//! - Installs the tracing subscriber
//! - Decides exit codes
//!
//! ## Structure
//!
//! - `run()`: Main dispatch logic (called by `main.rs`)
//! - `init_context()`: Loads configuration and builds the `StorageApi`
//! - `handle_*()`: Per-command handlers that call the API and format output

use super::print::{print_init, print_preference, print_success, print_tree};
use super::setup::{Cli, Commands, PrefAction};
use anyhow::{Context, Result};
use clap::Parser;
use docvault::api::StorageApi;
use docvault::config::StorageConfig;
use docvault::store::fs::FileStore;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

struct AppContext {
    api: StorageApi<FileStore>,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    setup_tracing(cli.verbose);

    let ctx = init_context(&cli)?;

    // Startup bootstrap: failures are reported but never stop the command.
    let report = ctx.api.init();

    match cli.command {
        Some(Commands::Init) => {
            print_init(&report);
            Ok(())
        }
        Some(Commands::List { json }) => handle_list(&ctx, json),
        Some(Commands::Read { path }) => handle_read(&ctx, &path),
        Some(Commands::Write { path, content }) => handle_write(&ctx, &path, content),
        Some(Commands::Export { path, content }) => handle_export(&ctx, &path, content),
        Some(Commands::Move { from, to }) => handle_move(&ctx, &from, &to),
        Some(Commands::Rename { path, name }) => handle_rename(&ctx, &path, &name),
        Some(Commands::Duplicate { path, destination }) => {
            handle_duplicate(&ctx, &path, &destination)
        }
        Some(Commands::Remove { path }) => handle_remove(&ctx, &path),
        Some(Commands::Pref { action, json }) => handle_pref(&ctx, action, json),
        None => handle_list(&ctx, false),
    }
}

/// Set up tracing/logging based on verbosity level
fn setup_tracing(verbose: u8) {
    let filter = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with_writer(io::stderr)
        .try_init();
}

fn init_context(cli: &Cli) -> Result<AppContext> {
    let config = match cli.config.clone().or_else(StorageConfig::default_path) {
        Some(path) => StorageConfig::load(&path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => StorageConfig::default(),
    }
    .with_env_overrides()
    .with_overrides(cli.root.clone(), None);

    let store = FileStore::from_config(&config).context("Failed to locate storage root")?;
    debug!(root = %store.paths().root().display(), "using storage root");

    Ok(AppContext {
        api: StorageApi::new(store),
    })
}

fn content_or_stdin(content: Option<String>) -> Result<String> {
    match content {
        Some(content) => Ok(content),
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read content from stdin")?;
            Ok(buf)
        }
    }
}

fn handle_list(ctx: &AppContext, json: bool) -> Result<()> {
    let items = ctx.api.list()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else {
        print_tree(&items);
    }
    Ok(())
}

fn handle_read(ctx: &AppContext, path: &Path) -> Result<()> {
    let content = ctx.api.read(path)?;
    print!("{}", content);
    Ok(())
}

fn handle_write(ctx: &AppContext, path: &Path, content: Option<String>) -> Result<()> {
    let content = content_or_stdin(content)?;
    ctx.api.write(path, &content)?;
    print_success(&format!("Saved {}", path.display()));
    Ok(())
}

fn handle_export(ctx: &AppContext, path: &Path, content: Option<String>) -> Result<()> {
    let content = content_or_stdin(content)?;
    ctx.api.write_absolute(path, &content)?;
    print_success(&format!("Exported to {}", path.display()));
    Ok(())
}

fn handle_move(ctx: &AppContext, from: &Path, to: &Path) -> Result<()> {
    ctx.api.move_entry(from, to)?;
    print_success(&format!("Moved {} -> {}", from.display(), to.display()));
    Ok(())
}

fn handle_rename(ctx: &AppContext, path: &Path, name: &str) -> Result<()> {
    let renamed: PathBuf = ctx.api.rename(path, name)?;
    print_success(&format!("Renamed {} -> {}", path.display(), renamed.display()));
    Ok(())
}

fn handle_duplicate(ctx: &AppContext, path: &Path, destination: &Path) -> Result<()> {
    ctx.api.duplicate(path, destination)?;
    print_success(&format!(
        "Duplicated {} -> {}",
        path.display(),
        destination.display()
    ));
    Ok(())
}

fn handle_remove(ctx: &AppContext, path: &Path) -> Result<()> {
    ctx.api.remove(path)?;
    print_success(&format!("Removed {}", path.display()));
    Ok(())
}

fn handle_pref(ctx: &AppContext, action: Option<PrefAction>, json: bool) -> Result<()> {
    let mut pref = ctx.api.get_user_preference();

    if let Some(PrefAction::Set { theme, last_edit }) = action {
        if theme.is_none() && last_edit.is_none() {
            anyhow::bail!("Nothing to set: pass --theme and/or --last-edit");
        }
        pref.theme = theme.unwrap_or(pref.theme);
        if let Some(last_edit) = last_edit {
            pref.last_edit_path = last_edit;
        }
        ctx.api.save_user_preference(&pref)?;
    }

    if json {
        println!("{}", serde_json::to_string(&pref)?);
    } else {
        print_preference(&pref);
    }
    Ok(())
}
