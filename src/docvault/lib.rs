//! # Docvault Architecture
//!
//! Docvault is the **storage core of a desktop document editor**: it keeps every user
//! document under one root directory, lists them as a tree, and remembers a small
//! preference record. The editor's window, IPC transport and rendering live elsewhere and
//! only call into this library.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Clients (cli/ + main.rs, or an editor's IPC handlers)      │
//! │  - Parse requests, format results                           │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Worker (worker.rs)            optional, async              │
//! │  - Runs calls on tokio's blocking pool                      │
//! │  - One in-flight call per path                              │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  API Layer (api.rs)                                         │
//! │  - Thin facade, one store call per request                  │
//! │  - Logs failures, degrades init and preference loading      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Storage Layer (store/)                                     │
//! │  - DocumentStore trait                                      │
//! │  - FileStore (production), InMemoryStore (testing)          │
//! │  - paths.rs, index.rs, preference.rs do the real work       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Principle: The Root Is a Sandbox
//!
//! Every relative path goes through [`paths::StoragePaths::resolve`] before it reaches the
//! filesystem. Paths that climb out of the root, absolute paths, and symlinks pointing
//! outside are refused with [`error::StorageError::PathEscapesSandbox`]. The only way to
//! write outside the root is [`api::StorageApi::write_absolute`], meant for an explicit
//! "save as" chosen by the user.
//!
//! ## No Global State
//!
//! The root is computed once (see [`config::StorageConfig::resolve_root`]) and carried by
//! the store instance. Tests build stores over temporary directories.
//!
//! ## Module Overview
//!
//! - [`api`]: The facade, entry point for all operations
//! - [`worker`]: Async wrapper with per-path ordering
//! - [`store`]: Storage abstraction and implementations
//! - [`paths`]: Root confinement
//! - [`index`]: Recursive directory tree
//! - [`preference`]: `user_config.json` persistence
//! - [`model`]: `FileItem`, `UserPreference`, `Theme`
//! - [`config`]: Configuration and root discovery
//! - [`error`]: Error types

pub mod api;
pub mod config;
pub mod error;
pub mod index;
pub mod model;
pub mod paths;
pub mod preference;
pub mod store;
pub mod worker;
