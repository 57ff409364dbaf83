// /////////////////////////////////////////////////////////////////////////////
// Lifo
// SPDX-License-Identifier: MIT
// /////////////////////////////////////////////////////////////////////////////

//! Tar (POSIX ustar) export/import for snapshots, optionally gzip-framed.
//!
//! The tar stream is purely mechanical: directory entries are written
//! before the entries of their children, and imported files always land as
//! inline bytes — re-chunking large imported files is the VFS's job when it
//! integrates the imported subtree, since chunking policy lives there.

use std::io::{Cursor, Read, Write};

use chrono::Utc;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use lifo_domain::inode::{Children, FileRepr, Inode, Metadata};

use super::serde_tree::VIRTUAL_PREFIXES;

/// Resolves a file's bytes for export. Inline files don't need it; chunked
/// files do (`ContentStore`, falling back to a cold `BlobStore`).
pub trait ChunkResolver {
    fn resolve(&mut self, manifest: &[lifo_domain::ChunkRef]) -> anyhow::Result<Vec<u8>>;
}

impl<F: FnMut(&[lifo_domain::ChunkRef]) -> anyhow::Result<Vec<u8>>> ChunkResolver for F {
    fn resolve(&mut self, manifest: &[lifo_domain::ChunkRef]) -> anyhow::Result<Vec<u8>> {
        self(manifest)
    }
}

pub fn export_tar(root: &Inode, resolver: &mut dyn ChunkResolver) -> anyhow::Result<Vec<u8>> {
    let mut builder = tar::Builder::new(Vec::new());
    write_children(&mut builder, root, String::new(), true, resolver)?;
    Ok(builder.into_inner()?)
}

pub fn export_tar_gz(root: &Inode, resolver: &mut dyn ChunkResolver) -> anyhow::Result<Vec<u8>> {
    let tar_bytes = export_tar(root, resolver)?;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&tar_bytes)?;
    Ok(encoder.finish()?)
}

fn write_children(
    builder: &mut tar::Builder<Vec<u8>>,
    node: &Inode,
    prefix: String,
    at_root: bool,
    resolver: &mut dyn ChunkResolver,
) -> anyhow::Result<()> {
    let Inode::Directory { children, .. } = node else {
        return Ok(());
    };
    for (name, child) in children.iter() {
        if at_root && VIRTUAL_PREFIXES.contains(&name) {
            continue;
        }
        let path = if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{prefix}/{name}")
        };
        match child {
            Inode::Directory { .. } => {
                let mut header = tar::Header::new_ustar();
                header.set_entry_type(tar::EntryType::Directory);
                header.set_mode(0o755);
                header.set_size(0);
                header.set_mtime(child.meta().mtime.timestamp() as u64);
                header.set_cksum();
                builder.append_data(&mut header, format!("{path}/"), Cursor::new([]))?;
                write_children(builder, child, path, false, resolver)?;
            }
            Inode::File { repr, meta, .. } => {
                let bytes = match repr {
                    FileRepr::Inline(bytes) => bytes.clone(),
                    FileRepr::Chunked { manifest, .. } => resolver.resolve(manifest)?,
                };
                let mut header = tar::Header::new_ustar();
                header.set_entry_type(tar::EntryType::Regular);
                header.set_mode(meta.mode);
                header.set_size(bytes.len() as u64);
                header.set_mtime(meta.mtime.timestamp() as u64);
                header.set_cksum();
                builder.append_data(&mut header, &path, Cursor::new(bytes))?;
            }
        }
    }
    Ok(())
}

pub fn import_tar(bytes: &[u8]) -> anyhow::Result<Inode> {
    let mut archive = tar::Archive::new(Cursor::new(bytes));
    build_tree_from_entries(&mut archive)
}

pub fn import_tar_gz(bytes: &[u8]) -> anyhow::Result<Inode> {
    let decoder = GzDecoder::new(Cursor::new(bytes));
    let mut archive = tar::Archive::new(decoder);
    build_tree_from_entries(&mut archive)
}

fn build_tree_from_entries<R: Read>(archive: &mut tar::Archive<R>) -> anyhow::Result<Inode> {
    let now = Utc::now();
    let mut root = Inode::new_dir("", now);
    for entry in archive.entries()? {
        let mut entry = entry?;
        let path = entry.path()?.to_string_lossy().trim_end_matches('/').to_string();
        if path.is_empty() {
            continue;
        }
        let is_dir = entry.header().entry_type().is_dir();
        let mut bytes = Vec::new();
        if !is_dir {
            entry.read_to_end(&mut bytes)?;
        }
        insert_at_path(&mut root, &path, is_dir, bytes, now);
    }
    Ok(root)
}

fn insert_at_path(root: &mut Inode, path: &str, is_dir: bool, bytes: Vec<u8>, now: chrono::DateTime<Utc>) {
    let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
    let mut cursor = root;
    for (i, part) in parts.iter().enumerate() {
        let is_last = i == parts.len() - 1;
        let Inode::Directory { children, .. } = cursor else {
            return;
        };
        ensure_child(children, part, is_last && !is_dir, bytes.clone(), now);
        cursor = children.get_mut(part).expect("just inserted");
    }
}

fn ensure_child(children: &mut Children, name: &str, is_file: bool, bytes: Vec<u8>, now: chrono::DateTime<Utc>) {
    if children.contains(name) {
        if is_file {
            if let Some(Inode::File { repr, meta, .. }) = children.get_mut(name) {
                *repr = FileRepr::Inline(bytes);
                meta.mtime = now;
            }
        }
        return;
    }
    let node = if is_file {
        let mime = lifo_domain::mime::detect(name).to_string();
        Inode::File {
            meta: Metadata {
                name: name.to_string(),
                ctime: now,
                mtime: now,
                mode: 0o644,
            },
            repr: FileRepr::Inline(bytes),
            mime: Some(mime),
            blob_ref: None,
        }
    } else {
        Inode::new_dir(name, now)
    };
    children.insert(name.to_string(), node);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_chunks(_: &[lifo_domain::ChunkRef]) -> anyhow::Result<Vec<u8>> {
        Ok(Vec::new())
    }

    #[test]
    fn export_then_import_round_trips_non_virtual_subtree() {
        let now = Utc::now();
        let mut root = Inode::new_dir("", now);
        if let Inode::Directory { children, .. } = &mut root {
            let mut home = Inode::new_dir("home", now);
            if let Inode::Directory { children: home_children, .. } = &mut home {
                let mut file = Inode::new_file("a.txt", now);
                if let Inode::File { repr, .. } = &mut file {
                    *repr = FileRepr::Inline(b"hello".to_vec());
                }
                home_children.insert("a.txt".to_string(), file);
            }
            children.insert("home".to_string(), home);
            children.insert("proc".to_string(), Inode::new_dir("proc", now));
        }

        let mut resolver = no_chunks;
        let bytes = export_tar(&root, &mut resolver).unwrap();
        let imported = import_tar(&bytes).unwrap();

        let Inode::Directory { children, .. } = &imported else {
            panic!("expected directory")
        };
        assert!(!children.contains("proc"));
        let Some(Inode::Directory { children: home_children, .. }) = children.get("home") else {
            panic!("expected home directory")
        };
        let Some(Inode::File { repr, .. }) = home_children.get("a.txt") else {
            panic!("expected file")
        };
        assert_eq!(*repr, FileRepr::Inline(b"hello".to_vec()));
    }
}
