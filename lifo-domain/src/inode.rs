// /////////////////////////////////////////////////////////////////////////////
// Lifo
// SPDX-License-Identifier: MIT
// /////////////////////////////////////////////////////////////////////////////

//! The inode tree (spec §3 "Inode").
//!
//! Directories own their children by value, keyed by name, in insertion
//! order (iteration order is not part of the contract — callers that need a
//! stable order sort explicitly). There is no parent pointer: the tree is
//! navigated by path, never by a child-to-parent edge, so it can be owned
//! straightforwardly without `Rc`/`RefCell` cycles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A content chunk reference: the chunk's content hash and its byte length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRef {
    pub hash: String,
    pub size: u64,
}

/// How a file's bytes are represented. A file has exactly one of these at a
/// time (spec §3 invariant: chunking replaces, rather than supplements,
/// inline storage).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileRepr {
    /// Bytes live directly on the inode (size < `CHUNK_THRESHOLD`).
    Inline(Vec<u8>),
    /// Bytes live in the `ContentStore`/`BlobStore`, addressed by manifest.
    Chunked {
        manifest: Vec<ChunkRef>,
        total_size: u64,
    },
}

impl FileRepr {
    pub fn logical_size(&self) -> u64 {
        match self {
            FileRepr::Inline(bytes) => bytes.len() as u64,
            FileRepr::Chunked { total_size, .. } => *total_size,
        }
    }
}

/// An ordered, by-name map of directory children. Backed by a `Vec` rather
/// than a hash map so insertion order is preserved without pulling in an
/// indexmap dependency the rest of the stack doesn't otherwise need.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Children(Vec<(String, Inode)>);

impl Children {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn get(&self, name: &str) -> Option<&Inode> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, i)| i)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Inode> {
        self.0.iter_mut().find(|(n, _)| n == name).map(|(_, i)| i)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Insert or replace the child named `name`.
    pub fn insert(&mut self, name: String, inode: Inode) {
        if let Some(slot) = self.0.iter_mut().find(|(n, _)| n == &name) {
            slot.1 = inode;
        } else {
            self.0.push((name, inode));
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Inode> {
        let idx = self.0.iter().position(|(n, _)| n == name)?;
        Some(self.0.remove(idx).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Inode)> {
        self.0.iter().map(|(n, i)| (n.as_str(), i))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.0.iter().map(|(n, _)| n.clone()).collect()
    }
}

/// Common metadata shared by files and directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub name: String,
    pub ctime: DateTime<Utc>,
    pub mtime: DateTime<Utc>,
    /// Metadata-only permission bits (spec §1 Non-goals: not enforced).
    pub mode: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inode {
    File {
        meta: Metadata,
        repr: FileRepr,
        mime: Option<String>,
        blob_ref: Option<String>,
    },
    Directory {
        meta: Metadata,
        children: Children,
    },
}

impl Inode {
    pub fn new_file(name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Inode::File {
            meta: Metadata {
                name: name.into(),
                ctime: now,
                mtime: now,
                mode: 0o644,
            },
            repr: FileRepr::Inline(Vec::new()),
            mime: None,
            blob_ref: None,
        }
    }

    pub fn new_dir(name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Inode::Directory {
            meta: Metadata {
                name: name.into(),
                ctime: now,
                mtime: now,
                mode: 0o755,
            },
            children: Children::new(),
        }
    }

    pub fn meta(&self) -> &Metadata {
        match self {
            Inode::File { meta, .. } => meta,
            Inode::Directory { meta, .. } => meta,
        }
    }

    pub fn meta_mut(&mut self) -> &mut Metadata {
        match self {
            Inode::File { meta, .. } => meta,
            Inode::Directory { meta, .. } => meta,
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, Inode::Directory { .. })
    }

    pub fn is_file(&self) -> bool {
        matches!(self, Inode::File { .. })
    }

    /// Bump `mtime` forward, never backward (spec §3 invariant 3).
    pub fn touch(&mut self, now: DateTime<Utc>) {
        let meta = self.meta_mut();
        if now > meta.mtime {
            meta.mtime = now;
        }
    }

    pub fn size(&self) -> u64 {
        match self {
            Inode::File { repr, .. } => repr.logical_size(),
            Inode::Directory { children, .. } => children.len() as u64,
        }
    }
}

/// File kind as reported by `stat`/events; independent of storage
/// representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileType {
    File,
    Directory,
}
