// /////////////////////////////////////////////////////////////////////////////
// Lifo
// SPDX-License-Identifier: MIT
// /////////////////////////////////////////////////////////////////////////////

//! The synchronous, in-memory content-addressed blob cache.
//!
//! `ContentStore` is the hot path for file content: small writes go
//! straight through it as a single blob, large writes are split into fixed
//! chunks first. It evicts by least-recently-used access order, tracked with
//! a monotonic counter rather than wall-clock time so eviction order is
//! deterministic in tests.

pub mod hash;

use std::collections::HashMap;

use lifo_domain::{ChunkRef, CHUNK_SIZE, CHUNK_THRESHOLD, DEFAULT_CONTENT_STORE_BUDGET};
use parking_lot::Mutex;

struct Entry {
    bytes: Vec<u8>,
    last_access: u64,
}

struct Inner {
    entries: HashMap<String, Entry>,
    total_bytes: u64,
    max_bytes: u64,
    access_clock: u64,
}

/// Synchronous CAS keyed by [`hash::content_hash`], with an LRU byte budget.
pub struct ContentStore {
    inner: Mutex<Inner>,
}

impl ContentStore {
    pub fn new(max_bytes: u64) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                total_bytes: 0,
                max_bytes,
                access_clock: 0,
            }),
        }
    }

    pub fn with_default_budget() -> Self {
        Self::new(DEFAULT_CONTENT_STORE_BUDGET)
    }

    /// Fetch a blob by hash. Refreshes recency on hit; never evicts.
    pub fn get(&self, digest: &str) -> Option<Vec<u8>> {
        let mut inner = self.inner.lock();
        inner.access_clock += 1;
        let tick = inner.access_clock;
        let entry = inner.entries.get_mut(digest)?;
        entry.last_access = tick;
        Some(entry.bytes.clone())
    }

    pub fn has(&self, digest: &str) -> bool {
        self.inner.lock().entries.contains_key(digest)
    }

    /// Store a blob, deduplicating by content hash. Returns the hash.
    pub fn put(&self, bytes: &[u8]) -> String {
        let digest = hash::content_hash(bytes);
        let mut inner = self.inner.lock();
        inner.access_clock += 1;
        let tick = inner.access_clock;
        if let Some(entry) = inner.entries.get_mut(&digest) {
            entry.last_access = tick;
            return digest;
        }
        inner.total_bytes += bytes.len() as u64;
        inner.entries.insert(
            digest.clone(),
            Entry {
                bytes: bytes.to_vec(),
                last_access: tick,
            },
        );
        Self::evict_locked(&mut inner);
        digest
    }

    pub fn delete(&self, digest: &str) {
        let mut inner = self.inner.lock();
        if let Some(entry) = inner.entries.remove(digest) {
            inner.total_bytes -= entry.bytes.len() as u64;
        }
    }

    /// Evict strictly-oldest-first until `total_bytes <= max_bytes`.
    fn evict_locked(inner: &mut Inner) {
        while inner.total_bytes > inner.max_bytes {
            let oldest = inner
                .entries
                .iter()
                .min_by_key(|(_, e)| e.last_access)
                .map(|(k, _)| k.clone());
            let Some(key) = oldest else { break };
            if let Some(entry) = inner.entries.remove(&key) {
                inner.total_bytes -= entry.bytes.len() as u64;
                tracing::debug!(digest = %key, "content store evicted chunk");
            }
        }
    }

    /// Split `bytes` into `CHUNK_SIZE` pieces (the last may be smaller),
    /// storing each and returning the ordered manifest.
    pub fn store_chunked(&self, bytes: &[u8]) -> Vec<ChunkRef> {
        bytes
            .chunks(CHUNK_SIZE as usize)
            .map(|chunk| ChunkRef {
                hash: self.put(chunk),
                size: chunk.len() as u64,
            })
            .collect()
    }

    /// Reassemble a chunked file. Returns `None` if any referenced chunk is
    /// missing (evicted), so the caller can escalate to the cold
    /// `BlobStore`.
    pub fn load_chunked(&self, manifest: &[ChunkRef]) -> Option<Vec<u8>> {
        let mut out = Vec::with_capacity(manifest.iter().map(|c| c.size as usize).sum());
        for chunk_ref in manifest {
            let chunk = self.get(&chunk_ref.hash)?;
            if chunk.len() as u64 != chunk_ref.size {
                return None;
            }
            out.extend_from_slice(&chunk);
        }
        Some(out)
    }

    pub fn total_bytes(&self) -> u64 {
        self.inner.lock().total_bytes
    }
}

/// True if a write of this size must be chunked rather than stored inline.
pub fn should_chunk(size: u64) -> bool {
    size >= CHUNK_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedupes_by_hash() {
        let store = ContentStore::with_default_budget();
        let h1 = store.put(b"same bytes");
        let h2 = store.put(b"same bytes");
        assert_eq!(h1, h2);
        assert_eq!(store.total_bytes(), "same bytes".len() as u64);
    }

    #[test]
    fn chunked_round_trip_is_byte_exact() {
        let store = ContentStore::with_default_budget();
        let data = vec![7u8; (CHUNK_THRESHOLD as usize) + 37];
        let manifest = store.store_chunked(&data);
        assert!(manifest.len() >= 2);
        let last = manifest.last().unwrap();
        assert!(last.size <= CHUNK_SIZE);
        let restored = store.load_chunked(&manifest).unwrap();
        assert_eq!(restored, data);
    }

    #[test]
    fn get_refreshes_recency_without_evicting() {
        let store = ContentStore::new(10); // tiny budget
        let h1 = store.put(b"12345");
        let _h2 = store.put(b"67890");
        // Touch h1 so it becomes the most recently used.
        assert!(store.get(&h1).is_some());
        // Now push total over budget; h2 should be evicted, not h1.
        let _h3 = store.put(b"abcde");
        assert!(store.get(&h1).is_some());
    }

    #[test]
    fn evicts_strictly_oldest_first() {
        let store = ContentStore::new(15);
        let h1 = store.put(b"aaaaa");
        let h2 = store.put(b"bbbbb");
        let _h3 = store.put(b"ccccc");
        // Budget of 15 fits exactly 3 five-byte entries; a fourth evicts h1.
        let _h4 = store.put(b"ddddd");
        assert!(store.get(&h1).is_none());
        assert!(store.get(&h2).is_some());
    }

    #[test]
    fn delete_does_not_touch_other_entries() {
        let store = ContentStore::with_default_budget();
        let h1 = store.put(b"x");
        store.delete(&h1);
        assert!(!store.has(&h1));
    }
}
