// /////////////////////////////////////////////////////////////////////////////
// Lifo
// SPDX-License-Identifier: MIT
// /////////////////////////////////////////////////////////////////////////////

//! The tree serialization format.
//!
//! Field names are intentionally short (`t`, `n`, `ct`, ...) to match a
//! fixed, documented wire shape exactly, so a snapshot produced by another
//! compatible implementation round-trips through Lifo unchanged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lifo_domain::inode::{ChunkRef, Children, FileRepr, Inode, Metadata};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedChunkRef {
    pub h: String,
    pub s: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedNode {
    pub t: NodeType,
    pub n: String,
    pub ct: DateTime<Utc>,
    pub mt: DateTime<Utc>,
    pub m: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub d: Option<String>, // base64 inline bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ch: Option<Vec<SerializedChunkRef>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sz: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mi: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub br: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub c: Option<Vec<SerializedNode>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeType {
    #[serde(rename = "f")]
    File,
    #[serde(rename = "d")]
    Directory,
}

/// Virtual-provider mount prefixes excluded from every snapshot and export:
/// their content is synthetic and regenerated fresh on the next boot.
pub const VIRTUAL_PREFIXES: &[&str] = &["proc", "dev", "mnt"];

/// Serialize an inode subtree rooted at `name`, dropping any child whose
/// name matches a virtual-provider prefix when at the tree root.
pub fn serialize(inode: &Inode, at_root: bool) -> SerializedNode {
    match inode {
        Inode::File {
            meta,
            repr,
            mime,
            blob_ref,
        } => serialize_file(meta, repr, mime, blob_ref),
        Inode::Directory { meta, children } => serialize_dir(meta, children, at_root),
    }
}

fn serialize_file(
    meta: &Metadata,
    repr: &FileRepr,
    mime: &Option<String>,
    blob_ref: &Option<String>,
) -> SerializedNode {
    let (d, ch, sz) = match repr {
        FileRepr::Inline(bytes) => (
            Some(base64::Engine::encode(&base64::engine::general_purpose::STANDARD, bytes)),
            None,
            None,
        ),
        FileRepr::Chunked {
            manifest,
            total_size,
        } => (
            None,
            Some(
                manifest
                    .iter()
                    .map(|c| SerializedChunkRef {
                        h: c.hash.clone(),
                        s: c.size,
                    })
                    .collect(),
            ),
            Some(*total_size),
        ),
    };
    SerializedNode {
        t: NodeType::File,
        n: meta.name.clone(),
        ct: meta.ctime,
        mt: meta.mtime,
        m: meta.mode,
        d,
        ch,
        sz,
        mi: mime.clone(),
        br: blob_ref.clone(),
        c: None,
    }
}

fn serialize_dir(meta: &Metadata, children: &Children, at_root: bool) -> SerializedNode {
    let mut out = Vec::new();
    for (name, child) in children.iter() {
        if at_root && VIRTUAL_PREFIXES.contains(&name) {
            continue;
        }
        out.push(serialize(child, false));
    }
    SerializedNode {
        t: NodeType::Directory,
        n: meta.name.clone(),
        ct: meta.ctime,
        mt: meta.mtime,
        m: meta.mode,
        d: None,
        ch: None,
        sz: None,
        mi: None,
        br: None,
        c: Some(out),
    }
}

/// Reconstruct an inode subtree from a serialized node. Chunked files are
/// not re-assembled here — first read triggers assembly on demand.
pub fn deserialize(node: &SerializedNode) -> anyhow::Result<Inode> {
    match node.t {
        NodeType::File => {
            let repr = if let Some(d) = &node.d {
                let bytes = base64::Engine::decode(&base64::engine::general_purpose::STANDARD, d)?;
                FileRepr::Inline(bytes)
            } else if let Some(ch) = &node.ch {
                FileRepr::Chunked {
                    manifest: ch
                        .iter()
                        .map(|c| ChunkRef {
                            hash: c.h.clone(),
                            size: c.s,
                        })
                        .collect(),
                    total_size: node.sz.unwrap_or(0),
                }
            } else {
                FileRepr::Inline(Vec::new())
            };
            Ok(Inode::File {
                meta: Metadata {
                    name: node.n.clone(),
                    ctime: node.ct,
                    mtime: node.mt,
                    mode: node.m,
                },
                repr,
                mime: node.mi.clone(),
                blob_ref: node.br.clone(),
            })
        }
        NodeType::Directory => {
            let mut children = Children::new();
            for child in node.c.iter().flatten() {
                children.insert(child.n.clone(), deserialize(child)?);
            }
            Ok(Inode::Directory {
                meta: Metadata {
                    name: node.n.clone(),
                    ctime: node.ct,
                    mtime: node.mt,
                    mode: node.m,
                },
                children,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn inline_file_round_trips() {
        let now = Utc::now();
        let mut file = Inode::new_file("a.txt", now);
        if let Inode::File { repr, mime, .. } = &mut file {
            *repr = FileRepr::Inline(b"hello".to_vec());
            *mime = Some("text/plain".to_string());
        }
        let node = serialize(&file, false);
        let json = serde_json::to_string(&node).unwrap();
        let back: SerializedNode = serde_json::from_str(&json).unwrap();
        let restored = deserialize(&back).unwrap();
        assert_eq!(restored, file);
    }

    #[test]
    fn virtual_prefixes_excluded_at_root() {
        let now = Utc::now();
        let mut root = Inode::new_dir("", now);
        if let Inode::Directory { children, .. } = &mut root {
            children.insert("proc".into(), Inode::new_dir("proc", now));
            children.insert("home".into(), Inode::new_dir("home", now));
        }
        let node = serialize(&root, true);
        let names: Vec<_> = node.c.unwrap().into_iter().map(|n| n.n).collect();
        assert_eq!(names, vec!["home".to_string()]);
    }
}
