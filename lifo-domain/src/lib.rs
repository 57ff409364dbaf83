// /////////////////////////////////////////////////////////////////////////////
// Lifo
// SPDX-License-Identifier: MIT
// /////////////////////////////////////////////////////////////////////////////

//! Pure domain types for Lifo.
//!
//! This crate has no I/O and no async runtime dependency. It defines the
//! vocabulary shared by the VFS, the shell, and process/job control: paths,
//! inodes, the shell AST, and process records. Everything here is
//! synchronous, side-effect free, and cheap to construct in tests.

pub mod cancel;
pub mod error;
pub mod glob;
pub mod inode;
pub mod mime;
pub mod path;
pub mod process;
pub mod shell_ast;

pub use error::{VfsError, VfsResult};
pub use inode::{ChunkRef, FileRepr, Inode};
pub use path::NormalizedPath;
pub use process::{ProcessRecord, ProcessStatus};

/// Files at or above this size are chunked instead of stored inline.
pub const CHUNK_THRESHOLD: u64 = 1024 * 1024;

/// Fixed chunk payload size (the final chunk of a file may be smaller).
pub const CHUNK_SIZE: u64 = 256 * 1024;

/// Default LRU byte budget for the `ContentStore`.
pub const DEFAULT_CONTENT_STORE_BUDGET: u64 = 64 * 1024 * 1024;

/// Debounce window for `PersistenceManager::schedule_save`.
pub const PERSISTENCE_DEBOUNCE_MS: u64 = 1000;

/// PID reserved for the shell itself; may never be killed or reaped.
pub const SHELL_PID: u32 = 1;

/// First PID handed out to a spawned process.
pub const FIRST_SPAWNED_PID: u32 = 2;
