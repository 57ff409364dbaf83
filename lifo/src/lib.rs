// /////////////////////////////////////////////////////////////////////////////
// Lifo
// SPDX-License-Identifier: MIT
// /////////////////////////////////////////////////////////////////////////////

//! The Lifo runtime: VFS, content-addressed storage, shell, and process/job
//! control for an in-process, POSIX-like operating environment.
//!
//! This crate depends on [`lifo_domain`] for the pure vocabulary (paths,
//! inodes, the shell AST, process records, the closed error set) and adds
//! everything that touches I/O, an async runtime, or mutable shared state:
//! the content store, persistence backends, virtual/mount providers, the
//! VFS itself, the shell (lexer/parser/expander/executor/builtins), process
//! and job control, and the command context commands run under.

pub mod command;
pub mod config;
pub mod content_store;
pub mod persistence;
pub mod process;
pub mod providers;
pub mod shell;
pub mod types;
pub mod vfs;
pub mod watch;

pub use config::LifoConfig;
pub use shell::{ExecOutcome, Shell};
pub use vfs::{Provider, Vfs};
