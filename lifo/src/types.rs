// /////////////////////////////////////////////////////////////////////////////
// Lifo
// SPDX-License-Identifier: MIT
// /////////////////////////////////////////////////////////////////////////////

//! Shared result/event shapes used by the VFS, its providers, and watchers.

use chrono::{DateTime, Utc};
use lifo_domain::inode::FileType;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stat {
    pub file_type: FileType,
    pub size: u64,
    pub mtime: DateTime<Utc>,
    pub ctime: DateTime<Utc>,
    pub mode: u32,
    pub mime: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    Create,
    Modify,
    Delete,
    Rename,
}

/// A single VFS mutation event, delivered to watchers after the mutation
/// that produced it has already applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VfsEvent {
    pub event_type: EventType,
    pub path: String,
    pub old_path: Option<String>,
    pub file_type: FileType,
}
