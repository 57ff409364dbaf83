// /////////////////////////////////////////////////////////////////////////////
// Lifo
// SPDX-License-Identifier: MIT
// /////////////////////////////////////////////////////////////////////////////

//! The central synchronous VFS API.
//!
//! `Vfs` owns one in-memory inode tree plus a table of providers grafted in
//! at mount points. Every path is normalized and routed, in order, to a
//! virtual provider (longest prefix match), then a mount provider (longest
//! prefix match), then the in-memory tree. Reads take `&self` — the
//! `ContentStore` and `BlobStore` behind it tolerate concurrent access — but
//! every mutating call takes `&mut self`, so the borrow checker enforces a
//! single-writer policy rather than an internal lock.

use std::sync::Arc;

use chrono::Utc;

use lifo_domain::error::VfsResult;
use lifo_domain::inode::{FileRepr, FileType, Inode};
use lifo_domain::path::NormalizedPath;
use lifo_domain::{VfsError, CHUNK_THRESHOLD};

use crate::content_store::{should_chunk, ContentStore};
use crate::persistence::serde_tree::{self, SerializedNode};
use crate::persistence::BlobStore;
use crate::providers::{MountProvider, VirtualProvider};
use crate::types::{EventType, Stat, VfsEvent};
use crate::watch::{WatchId, Watchers};

enum ProviderEntry {
    Virtual(Arc<dyn VirtualProvider>),
    Mount(Arc<dyn MountProvider>),
}

/// What a provider registration is: a synthetic read-only (or
/// write-discard) subtree, or a proxy onto an external mutable filesystem.
pub enum Provider {
    Virtual(Arc<dyn VirtualProvider>),
    Mount(Arc<dyn MountProvider>),
}

enum Route {
    Virtual(Arc<dyn VirtualProvider>, String),
    Mount(Arc<dyn MountProvider>, String),
    Tree,
}

pub struct Vfs {
    root: Inode,
    content_store: Arc<ContentStore>,
    blob_store: Option<Arc<dyn BlobStore>>,
    providers: Vec<(String, ProviderEntry)>,
    watchers: Watchers,
}

impl Vfs {
    pub fn new(content_store: Arc<ContentStore>) -> Self {
        Self {
            root: Inode::new_dir("", Utc::now()),
            content_store,
            blob_store: None,
            providers: Vec::new(),
            watchers: Watchers::new(),
        }
    }

    pub fn with_blob_store(content_store: Arc<ContentStore>, blob_store: Arc<dyn BlobStore>) -> Self {
        Self {
            blob_store: Some(blob_store),
            ..Self::new(content_store)
        }
    }

    /// Graft a provider at `mount_point`. The prefix is normalized and must
    /// not be the root.
    pub fn register_provider(&mut self, mount_point: &str, provider: Provider) -> VfsResult<()> {
        let normalized = NormalizedPath::normalize(mount_point)?;
        if normalized.is_root() {
            return Err(VfsError::invalid("cannot register a provider at the root"));
        }
        let entry = match provider {
            Provider::Virtual(p) => ProviderEntry::Virtual(p),
            Provider::Mount(p) => ProviderEntry::Mount(p),
        };
        self.providers.push((normalized.as_str().to_string(), entry));
        Ok(())
    }

    pub fn get_root(&self) -> &Inode {
        &self.root
    }

    /// Replace the in-memory tree with a deserialized snapshot.
    /// Provider registrations are untouched — they are process-lifetime
    /// configuration, not part of the persisted tree.
    pub fn load_from_serialized(&mut self, node: &SerializedNode) -> anyhow::Result<()> {
        self.root = serde_tree::deserialize(node)?;
        Ok(())
    }

    fn route(&self, normalized: &NormalizedPath) -> Route {
        let mut virtual_best: Option<(&str, Arc<dyn VirtualProvider>)> = None;
        for (prefix, entry) in &self.providers {
            if let ProviderEntry::Virtual(p) = entry {
                if normalized.starts_with(prefix)
                    && virtual_best.as_ref().map_or(true, |(bp, _)| prefix.len() > bp.len())
                {
                    virtual_best = Some((prefix.as_str(), p.clone()));
                }
            }
        }
        if let Some((prefix, p)) = virtual_best {
            let sub = normalized.strip_prefix(prefix).unwrap_or_default();
            return Route::Virtual(p, sub);
        }

        let mut mount_best: Option<(&str, Arc<dyn MountProvider>)> = None;
        for (prefix, entry) in &self.providers {
            if let ProviderEntry::Mount(p) = entry {
                if normalized.starts_with(prefix)
                    && mount_best.as_ref().map_or(true, |(bp, _)| prefix.len() > bp.len())
                {
                    mount_best = Some((prefix.as_str(), p.clone()));
                }
            }
        }
        if let Some((prefix, p)) = mount_best {
            let sub = normalized.strip_prefix(prefix).unwrap_or_default();
            return Route::Mount(p, sub);
        }

        Route::Tree
    }

    // ---- reads ----------------------------------------------------------

    pub fn read_file(&self, path: &str) -> VfsResult<Vec<u8>> {
        let normalized = NormalizedPath::normalize(path)?;
        match self.route(&normalized) {
            Route::Virtual(p, sub) => p.read_file(&sub),
            Route::Mount(p, sub) => p.read_file(&sub),
            Route::Tree => self.tree_read(&normalized),
        }
    }

    pub fn read_file_string(&self, path: &str) -> VfsResult<String> {
        let bytes = self.read_file(path)?;
        String::from_utf8(bytes).map_err(|_| VfsError::invalid("not valid utf-8"))
    }

    fn tree_read(&self, normalized: &NormalizedPath) -> VfsResult<Vec<u8>> {
        let comps = normalized.components();
        let node = navigate(&self.root, &comps)?;
        match node {
            Inode::Directory { .. } => Err(VfsError::is_dir(normalized)),
            Inode::File { repr, blob_ref, .. } => match repr {
                FileRepr::Inline(bytes) => Ok(bytes.clone()),
                FileRepr::Chunked { manifest, .. } => {
                    if let Some(bytes) = self.content_store.load_chunked(manifest) {
                        return Ok(bytes);
                    }
                    match blob_ref.as_ref().and_then(|hash| self.load_cold_blob(hash)) {
                        Some(bytes) => Ok(bytes),
                        None => Err(VfsError::invalid(format!(
                            "chunk assembly failed and no cold blob reference for {normalized}"
                        ))),
                    }
                }
            },
        }
    }

    /// Block on the async `BlobStore` to fetch a cold blob. This is the one
    /// place `Vfs` suspends: assembly only falls back here when a chunk has
    /// been LRU-evicted from the in-memory `ContentStore`, which is rare.
    /// Assumes the enclosing runtime is multi-threaded (`lifo-bootstrap`
    /// starts one); falls back to `None` if there is no runtime at all.
    fn load_cold_blob(&self, hash: &str) -> Option<Vec<u8>> {
        let store = self.blob_store.as_ref()?.clone();
        let hash = hash.to_string();
        tokio::runtime::Handle::try_current().ok().and_then(|handle| {
            tokio::task::block_in_place(|| handle.block_on(store.get(&hash)))
        })
    }

    pub fn stat(&self, path: &str) -> VfsResult<Stat> {
        let normalized = NormalizedPath::normalize(path)?;
        match self.route(&normalized) {
            Route::Virtual(p, sub) => p.stat(&sub),
            Route::Mount(p, sub) => p.stat(&sub),
            Route::Tree => {
                let comps = normalized.components();
                navigate(&self.root, &comps).map(stat_of)
            }
        }
    }

    pub fn exists(&self, path: &str) -> bool {
        match NormalizedPath::normalize(path) {
            Ok(normalized) => self.exists_normalized(&normalized),
            Err(_) => false,
        }
    }

    fn exists_normalized(&self, normalized: &NormalizedPath) -> bool {
        match self.route(normalized) {
            Route::Virtual(p, sub) => p.exists(&sub),
            Route::Mount(p, sub) => p.exists(&sub),
            Route::Tree => navigate(&self.root, &normalized.components()).is_ok(),
        }
    }

    pub fn readdir(&self, path: &str) -> VfsResult<Vec<String>> {
        let normalized = NormalizedPath::normalize(path)?;
        match self.route(&normalized) {
            Route::Virtual(p, sub) => p.readdir(&sub),
            Route::Mount(p, sub) => p.readdir(&sub),
            Route::Tree => {
                let comps = normalized.components();
                match navigate(&self.root, &comps)? {
                    Inode::Directory { children, .. } => Ok(children.names()),
                    Inode::File { .. } => Err(VfsError::not_dir(normalized)),
                }
            }
        }
    }

    pub fn readdir_stat(&self, path: &str) -> VfsResult<Vec<(String, Stat)>> {
        let names = self.readdir(path)?;
        let base = path.trim_end_matches('/');
        let mut out = Vec::with_capacity(names.len());
        for name in names {
            let child_path = format!("{base}/{name}");
            let st = self.stat(&child_path)?;
            out.push((name, st));
        }
        Ok(out)
    }

    // ---- writes -----------------------------------------------------------

    pub fn write_file(&mut self, path: &str, data: &[u8]) -> VfsResult<()> {
        let normalized = NormalizedPath::normalize(path)?;
        let existed = self.exists_normalized(&normalized);
        match self.route(&normalized) {
            Route::Virtual(p, sub) => p.write_file(&sub, data)?,
            Route::Mount(p, sub) => p.write_file(&sub, data)?,
            Route::Tree => self.tree_write(&normalized, data)?,
        }
        self.emit(
            if existed { EventType::Modify } else { EventType::Create },
            normalized.as_str().to_string(),
            None,
            FileType::File,
        );
        Ok(())
    }

    pub fn append_file(&mut self, path: &str, data: &[u8]) -> VfsResult<()> {
        let mut existing = self.read_file(path).unwrap_or_default();
        existing.extend_from_slice(data);
        self.write_file(path, &existing)
    }

    pub fn copy_file(&mut self, from: &str, to: &str) -> VfsResult<()> {
        let bytes = self.read_file(from)?;
        self.write_file(to, &bytes)
    }

    fn tree_write(&mut self, normalized: &NormalizedPath, data: &[u8]) -> VfsResult<()> {
        let comps = normalized.components();
        if comps.is_empty() {
            return Err(VfsError::is_dir(normalized));
        }
        let now = Utc::now();
        let name = *comps.last().unwrap();
        let parent = resolve_parent_dir_mut(&mut self.root, &comps[..comps.len() - 1])?;
        let Inode::Directory { children, .. } = parent else {
            unreachable!("resolve_parent_dir_mut only returns directories")
        };
        if let Some(existing) = children.get(name) {
            if existing.is_dir() {
                return Err(VfsError::is_dir(normalized));
            }
        }
        let mime = lifo_domain::mime::detect(normalized.as_str()).to_string();
        let repr = if should_chunk(data.len() as u64) {
            FileRepr::Chunked {
                manifest: self.content_store.store_chunked(data),
                total_size: data.len() as u64,
            }
        } else {
            FileRepr::Inline(data.to_vec())
        };
        match children.get_mut(name) {
            Some(node) => {
                if let Inode::File { repr: r, mime: m, blob_ref, .. } = node {
                    *r = repr;
                    *m = Some(mime);
                    *blob_ref = None;
                }
                node.touch(now);
            }
            None => {
                let mut file = Inode::new_file(name, now);
                if let Inode::File { repr: r, mime: m, .. } = &mut file {
                    *r = repr;
                    *m = Some(mime);
                }
                children.insert(name.to_string(), file);
            }
        }
        Ok(())
    }

    pub fn mkdir(&mut self, path: &str, recursive: bool) -> VfsResult<()> {
        let normalized = NormalizedPath::normalize(path)?;
        match self.route(&normalized) {
            Route::Virtual(..) => Err(VfsError::invalid("virtual providers do not support mkdir")),
            Route::Mount(p, sub) => {
                p.mkdir(&sub, recursive)?;
                self.emit(EventType::Create, normalized.as_str().to_string(), None, FileType::Directory);
                Ok(())
            }
            Route::Tree => {
                self.tree_mkdir(&normalized, recursive)?;
                self.emit(EventType::Create, normalized.as_str().to_string(), None, FileType::Directory);
                Ok(())
            }
        }
    }

    fn tree_mkdir(&mut self, normalized: &NormalizedPath, recursive: bool) -> VfsResult<()> {
        let comps = normalized.components();
        if comps.is_empty() {
            return Err(VfsError::exists(normalized));
        }
        let now = Utc::now();
        if recursive {
            let mut current = &mut self.root;
            for (i, name) in comps.iter().enumerate() {
                current = match current {
                    Inode::Directory { children, .. } => {
                        if !children.contains(name) {
                            children.insert(name.to_string(), Inode::new_dir(*name, now));
                        }
                        let child = children.get_mut(name).unwrap();
                        if i < comps.len() - 1 && !child.is_dir() {
                            return Err(VfsError::not_dir(normalized));
                        }
                        child
                    }
                    Inode::File { .. } => return Err(VfsError::not_dir(normalized)),
                };
            }
            Ok(())
        } else {
            let name = *comps.last().unwrap();
            let parent = resolve_parent_dir_mut(&mut self.root, &comps[..comps.len() - 1])?;
            let Inode::Directory { children, .. } = parent else {
                unreachable!("resolve_parent_dir_mut only returns directories")
            };
            if children.contains(name) {
                return Err(VfsError::exists(normalized));
            }
            children.insert(name.to_string(), Inode::new_dir(name, now));
            Ok(())
        }
    }

    pub fn unlink(&mut self, path: &str) -> VfsResult<()> {
        let normalized = NormalizedPath::normalize(path)?;
        match self.route(&normalized) {
            Route::Virtual(..) => Err(VfsError::invalid("virtual providers do not support unlink")),
            Route::Mount(p, sub) => {
                p.unlink(&sub)?;
                self.emit(EventType::Delete, normalized.as_str().to_string(), None, FileType::File);
                Ok(())
            }
            Route::Tree => {
                let comps = normalized.components();
                if comps.is_empty() {
                    return Err(VfsError::is_dir(normalized));
                }
                let name = *comps.last().unwrap();
                let parent = resolve_parent_dir_mut(&mut self.root, &comps[..comps.len() - 1])?;
                let Inode::Directory { children, .. } = parent else {
                    unreachable!("resolve_parent_dir_mut only returns directories")
                };
                match children.get(name) {
                    None => return Err(VfsError::not_found(&normalized)),
                    Some(node) if node.is_dir() => return Err(VfsError::is_dir(&normalized)),
                    Some(_) => {}
                }
                children.remove(name);
                self.emit(EventType::Delete, normalized.as_str().to_string(), None, FileType::File);
                Ok(())
            }
        }
    }

    pub fn rmdir(&mut self, path: &str) -> VfsResult<()> {
        self.rmdir_impl(path, false)
    }

    pub fn rmdir_recursive(&mut self, path: &str) -> VfsResult<()> {
        self.rmdir_impl(path, true)
    }

    fn rmdir_impl(&mut self, path: &str, recursive: bool) -> VfsResult<()> {
        let normalized = NormalizedPath::normalize(path)?;
        match self.route(&normalized) {
            Route::Virtual(..) => Err(VfsError::invalid("virtual providers do not support rmdir")),
            Route::Mount(p, sub) => {
                p.rmdir(&sub, recursive)?;
                self.emit(EventType::Delete, normalized.as_str().to_string(), None, FileType::Directory);
                Ok(())
            }
            Route::Tree => {
                let comps = normalized.components();
                if comps.is_empty() {
                    return Err(VfsError::invalid("cannot remove the root directory"));
                }
                let name = *comps.last().unwrap();
                let parent = resolve_parent_dir_mut(&mut self.root, &comps[..comps.len() - 1])?;
                let Inode::Directory { children, .. } = parent else {
                    unreachable!("resolve_parent_dir_mut only returns directories")
                };
                match children.get(name) {
                    None => return Err(VfsError::not_found(&normalized)),
                    Some(node) if !node.is_dir() => return Err(VfsError::not_dir(&normalized)),
                    Some(Inode::Directory { children: grandchildren, .. }) => {
                        if !recursive && !grandchildren.is_empty() {
                            return Err(VfsError::not_empty(&normalized));
                        }
                    }
                    Some(_) => unreachable!(),
                }
                children.remove(name);
                self.emit(EventType::Delete, normalized.as_str().to_string(), None, FileType::Directory);
                Ok(())
            }
        }
    }

    pub fn rename(&mut self, from: &str, to: &str) -> VfsResult<()> {
        let from_n = NormalizedPath::normalize(from)?;
        let to_n = NormalizedPath::normalize(to)?;
        let file_type = match self.route(&from_n) {
            Route::Tree => {
                if !matches!(self.route(&to_n), Route::Tree) {
                    return Err(VfsError::invalid("rename across providers is not supported"));
                }
                self.tree_rename(&from_n, &to_n)?
            }
            Route::Mount(p1, sub1) => match self.route(&to_n) {
                Route::Mount(p2, sub2) if Arc::ptr_eq(&p1, &p2) => {
                    p1.rename(&sub1, &sub2)?;
                    p1.stat(&sub2).map(|s| s.file_type).unwrap_or(FileType::File)
                }
                _ => return Err(VfsError::invalid("rename across providers is not supported")),
            },
            Route::Virtual(..) => return Err(VfsError::invalid("virtual providers do not support rename")),
        };
        self.emit(EventType::Rename, to_n.as_str().to_string(), Some(from_n.as_str().to_string()), file_type);
        Ok(())
    }

    fn tree_rename(&mut self, from: &NormalizedPath, to: &NormalizedPath) -> VfsResult<FileType> {
        let from_comps = from.components();
        let to_comps = to.components();
        if from_comps.is_empty() || to_comps.is_empty() {
            return Err(VfsError::invalid("cannot rename the root directory"));
        }
        let from_name = *from_comps.last().unwrap();
        let mut moved = {
            let parent = resolve_parent_dir_mut(&mut self.root, &from_comps[..from_comps.len() - 1])?;
            let Inode::Directory { children, .. } = parent else {
                unreachable!("resolve_parent_dir_mut only returns directories")
            };
            children.remove(from_name).ok_or_else(|| VfsError::not_found(from))?
        };
        let to_name = *to_comps.last().unwrap();
        moved.meta_mut().name = to_name.to_string();
        let file_type = if moved.is_dir() { FileType::Directory } else { FileType::File };
        let parent = resolve_parent_dir_mut(&mut self.root, &to_comps[..to_comps.len() - 1])?;
        let Inode::Directory { children, .. } = parent else {
            unreachable!("resolve_parent_dir_mut only returns directories")
        };
        children.insert(to_name.to_string(), moved);
        Ok(file_type)
    }

    // ---- watch --------------------------------------------------------

    pub fn watch(
        &mut self,
        prefix: Option<&str>,
        listener: impl FnMut(&VfsEvent) + Send + 'static,
    ) -> WatchId {
        let prefix = prefix.and_then(|p| NormalizedPath::normalize(p).ok()).map(|p| p.as_str().to_string());
        self.watchers.add(prefix, Box::new(listener))
    }

    pub fn unwatch(&mut self, id: WatchId) {
        self.watchers.remove(id)
    }

    fn emit(&mut self, event_type: EventType, path: String, old_path: Option<String>, file_type: FileType) {
        let event = VfsEvent { event_type, path, old_path, file_type };
        self.watchers.dispatch(&event);
    }
}

fn stat_of(node: &Inode) -> Stat {
    match node {
        Inode::File { meta, repr, mime, .. } => Stat {
            file_type: FileType::File,
            size: repr.logical_size(),
            mtime: meta.mtime,
            ctime: meta.ctime,
            mode: meta.mode,
            mime: mime.clone(),
        },
        Inode::Directory { meta, children } => Stat {
            file_type: FileType::Directory,
            size: children.len() as u64,
            mtime: meta.mtime,
            ctime: meta.ctime,
            mode: meta.mode,
            mime: None,
        },
    }
}

fn navigate<'a>(node: &'a Inode, comps: &[&str]) -> VfsResult<&'a Inode> {
    if comps.is_empty() {
        return Ok(node);
    }
    match node {
        Inode::Directory { children, .. } => {
            let child = children
                .get(comps[0])
                .ok_or_else(|| VfsError::not_found(comps.join("/")))?;
            navigate(child, &comps[1..])
        }
        Inode::File { .. } => Err(VfsError::not_dir(comps.join("/"))),
    }
}

fn navigate_dir_mut<'a>(node: &'a mut Inode, comps: &[&str]) -> VfsResult<&'a mut Inode> {
    if comps.is_empty() {
        return Ok(node);
    }
    match node {
        Inode::Directory { children, .. } => {
            let child = children
                .get_mut(comps[0])
                .ok_or_else(|| VfsError::not_found(comps.join("/")))?;
            navigate_dir_mut(child, &comps[1..])
        }
        Inode::File { .. } => Err(VfsError::not_dir(comps.join("/"))),
    }
}

/// Navigate to a parent directory, erroring `ENOTDIR` if it turns out to be
/// a file rather than a directory.
fn resolve_parent_dir_mut<'a>(root: &'a mut Inode, comps: &[&str]) -> VfsResult<&'a mut Inode> {
    let node = navigate_dir_mut(root, comps)?;
    if node.is_dir() {
        Ok(node)
    } else {
        Err(VfsError::not_dir(comps.join("/")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc as StdArc;

    fn fresh_vfs() -> Vfs {
        Vfs::new(StdArc::new(ContentStore::with_default_budget()))
    }

    #[test]
    fn root_exists_and_is_a_directory() {
        let vfs = fresh_vfs();
        assert!(vfs.exists("/"));
        assert_eq!(vfs.stat("/").unwrap().file_type, FileType::Directory);
    }

    #[test]
    fn write_then_read_round_trips_inline() {
        let mut vfs = fresh_vfs();
        vfs.write_file("/a.txt", b"hello").unwrap();
        assert_eq!(vfs.read_file("/a.txt").unwrap(), b"hello");
        assert_eq!(vfs.stat("/a.txt").unwrap().mime.as_deref(), Some("text/plain"));
    }

    #[test]
    fn write_crossing_threshold_chunks_and_round_trips() {
        let mut vfs = fresh_vfs();
        let data = vec![9u8; CHUNK_THRESHOLD as usize + 123];
        vfs.write_file("/big.bin", &data).unwrap();
        assert_eq!(vfs.read_file("/big.bin").unwrap(), data);
    }

    #[test]
    fn mkdir_then_write_nested_file() {
        let mut vfs = fresh_vfs();
        vfs.mkdir("/a/b", true).unwrap();
        vfs.write_file("/a/b/c.txt", b"x").unwrap();
        assert_eq!(vfs.readdir("/a/b").unwrap(), vec!["c.txt".to_string()]);
    }

    #[test]
    fn mkdir_non_recursive_requires_existing_parent() {
        let mut vfs = fresh_vfs();
        assert!(vfs.mkdir("/a/b", false).is_err());
        vfs.mkdir("/a", false).unwrap();
        vfs.mkdir("/a/b", false).unwrap();
        assert!(vfs.exists("/a/b"));
    }

    #[test]
    fn unlink_removes_file_but_rejects_directories() {
        let mut vfs = fresh_vfs();
        vfs.mkdir("/d", false).unwrap();
        assert!(vfs.unlink("/d").is_err());
        vfs.write_file("/d/f.txt", b"x").unwrap();
        vfs.unlink("/d/f.txt").unwrap();
        assert!(!vfs.exists("/d/f.txt"));
    }

    #[test]
    fn rmdir_requires_empty_unless_recursive() {
        let mut vfs = fresh_vfs();
        vfs.mkdir("/d", false).unwrap();
        vfs.write_file("/d/f.txt", b"x").unwrap();
        assert!(vfs.rmdir("/d").is_err());
        vfs.rmdir_recursive("/d").unwrap();
        assert!(!vfs.exists("/d"));
    }

    #[test]
    fn readdir_on_a_file_is_not_a_directory() {
        let mut vfs = fresh_vfs();
        vfs.write_file("/f.txt", b"x").unwrap();
        assert!(vfs.readdir("/f.txt").is_err());
    }

    #[test]
    fn rename_moves_the_node_and_emits_one_event() {
        let mut vfs = fresh_vfs();
        vfs.write_file("/a.txt", b"hi").unwrap();
        let events = StdArc::new(AtomicUsize::new(0));
        let events2 = events.clone();
        vfs.watch(None, move |_e| {
            events2.fetch_add(1, Ordering::SeqCst);
        });
        vfs.rename("/a.txt", "/b.txt").unwrap();
        assert!(!vfs.exists("/a.txt"));
        assert!(vfs.exists("/b.txt"));
        assert_eq!(events.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn copy_file_duplicates_content_without_moving_source() {
        let mut vfs = fresh_vfs();
        vfs.write_file("/a.txt", b"hi").unwrap();
        vfs.copy_file("/a.txt", "/b.txt").unwrap();
        assert_eq!(vfs.read_file("/a.txt").unwrap(), b"hi");
        assert_eq!(vfs.read_file("/b.txt").unwrap(), b"hi");
    }

    #[test]
    fn append_file_grows_an_existing_file() {
        let mut vfs = fresh_vfs();
        vfs.write_file("/a.txt", b"hi").unwrap();
        vfs.append_file("/a.txt", b" there").unwrap();
        assert_eq!(vfs.read_file("/a.txt").unwrap(), b"hi there");
    }

    struct FixedProvider;
    impl VirtualProvider for FixedProvider {
        fn read_file(&self, _sub_path: &str) -> VfsResult<Vec<u8>> {
            Ok(b"synthetic".to_vec())
        }
        fn exists(&self, _sub_path: &str) -> bool {
            true
        }
        fn stat(&self, _sub_path: &str) -> VfsResult<Stat> {
            Ok(Stat {
                file_type: FileType::File,
                size: 9,
                mtime: Utc::now(),
                ctime: Utc::now(),
                mode: 0o444,
                mime: None,
            })
        }
        fn readdir(&self, _sub_path: &str) -> VfsResult<Vec<String>> {
            Ok(vec!["x".to_string()])
        }
    }

    #[test]
    fn virtual_provider_takes_precedence_and_rejects_writes() {
        let mut vfs = fresh_vfs();
        vfs.register_provider("/proc", Provider::Virtual(StdArc::new(FixedProvider))).unwrap();
        assert_eq!(vfs.read_file("/proc/uptime").unwrap(), b"synthetic");
        assert!(vfs.write_file("/proc/uptime", b"nope").is_err());
    }
}
