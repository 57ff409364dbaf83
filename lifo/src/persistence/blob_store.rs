// /////////////////////////////////////////////////////////////////////////////
// Lifo
// SPDX-License-Identifier: MIT
// /////////////////////////////////////////////////////////////////////////////

//! The asynchronous, cold content-addressed persistence backend.
//!
//! All methods must tolerate being called before `open` resolves — they
//! no-op or return `None` rather than panic, since a host embedder may start
//! issuing writes before the backend has finished opening its storage.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::serde_tree::SerializedNode;

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn open(&self) -> anyhow::Result<()>;
    async fn get(&self, hash: &str) -> Option<Vec<u8>>;
    /// Idempotent: storing the same hash twice keeps the first payload.
    async fn put(&self, hash: &str, bytes: &[u8]) -> anyhow::Result<()>;
    async fn has(&self, hash: &str) -> bool;
    async fn delete(&self, hash: &str) -> anyhow::Result<()>;
    async fn close(&self) -> anyhow::Result<()>;

    /// Save a full tree snapshot.
    async fn save_tree(&self, tree: &SerializedNode) -> anyhow::Result<()>;
    /// Load the last saved snapshot, or `None` if there is none yet.
    async fn load_tree(&self) -> anyhow::Result<Option<SerializedNode>>;
}

/// In-memory reference implementation — the default backend for embedders
/// that don't need durability across process restarts.
#[derive(Default)]
pub struct MemoryBlobStore {
    opened: Arc<Mutex<bool>>,
    blobs: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    tree: Arc<Mutex<Option<SerializedNode>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn open(&self) -> anyhow::Result<()> {
        *self.opened.lock().await = true;
        Ok(())
    }

    async fn get(&self, hash: &str) -> Option<Vec<u8>> {
        self.blobs.lock().await.get(hash).cloned()
    }

    async fn put(&self, hash: &str, bytes: &[u8]) -> anyhow::Result<()> {
        let mut blobs = self.blobs.lock().await;
        blobs.entry(hash.to_string()).or_insert_with(|| bytes.to_vec());
        Ok(())
    }

    async fn has(&self, hash: &str) -> bool {
        self.blobs.lock().await.contains_key(hash)
    }

    async fn delete(&self, hash: &str) -> anyhow::Result<()> {
        self.blobs.lock().await.remove(hash);
        Ok(())
    }

    async fn close(&self) -> anyhow::Result<()> {
        *self.opened.lock().await = false;
        Ok(())
    }

    async fn save_tree(&self, tree: &SerializedNode) -> anyhow::Result<()> {
        *self.tree.lock().await = Some(tree.clone());
        Ok(())
    }

    async fn load_tree(&self) -> anyhow::Result<Option<SerializedNode>> {
        Ok(self.tree.lock().await.clone())
    }
}

/// `sqlx`/SQLite-backed durable store, the idiomatic Rust stand-in for a
/// browser-style durable blob store. Blobs and the latest tree snapshot
/// live in two tables in the same database file.
pub struct SqliteBlobStore {
    pool: sqlx::SqlitePool,
}

impl SqliteBlobStore {
    pub async fn open_at(path: &str) -> anyhow::Result<Self> {
        use sqlx::sqlite::SqliteConnectOptions;
        use std::str::FromStr;

        let options = SqliteConnectOptions::from_str(&format!("sqlite://{path}"))?
            .create_if_missing(true);
        let pool = sqlx::SqlitePool::connect_with(options).await?;
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS blobs (hash TEXT PRIMARY KEY, bytes BLOB NOT NULL)",
        )
        .execute(&pool)
        .await?;
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS tree_snapshot (id INTEGER PRIMARY KEY CHECK (id = 0), json TEXT NOT NULL)",
        )
        .execute(&pool)
        .await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl BlobStore for SqliteBlobStore {
    async fn open(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn get(&self, hash: &str) -> Option<Vec<u8>> {
        sqlx::query_scalar::<_, Vec<u8>>("SELECT bytes FROM blobs WHERE hash = ?")
            .bind(hash)
            .fetch_optional(&self.pool)
            .await
            .ok()
            .flatten()
    }

    async fn put(&self, hash: &str, bytes: &[u8]) -> anyhow::Result<()> {
        sqlx::query("INSERT OR IGNORE INTO blobs (hash, bytes) VALUES (?, ?)")
            .bind(hash)
            .bind(bytes)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn has(&self, hash: &str) -> bool {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM blobs WHERE hash = ?")
            .bind(hash)
            .fetch_one(&self.pool)
            .await
            .map(|c| c > 0)
            .unwrap_or(false)
    }

    async fn delete(&self, hash: &str) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM blobs WHERE hash = ?")
            .bind(hash)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn close(&self) -> anyhow::Result<()> {
        self.pool.close().await;
        Ok(())
    }

    async fn save_tree(&self, tree: &SerializedNode) -> anyhow::Result<()> {
        let json = serde_json::to_string(tree)?;
        sqlx::query(
            "INSERT INTO tree_snapshot (id, json) VALUES (0, ?) \
             ON CONFLICT(id) DO UPDATE SET json = excluded.json",
        )
        .bind(json)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn load_tree(&self) -> anyhow::Result<Option<SerializedNode>> {
        let row: Option<String> =
            sqlx::query_scalar("SELECT json FROM tree_snapshot WHERE id = 0")
                .fetch_optional(&self.pool)
                .await?;
        match row {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_put_is_idempotent() {
        let store = MemoryBlobStore::new();
        store.open().await.unwrap();
        store.put("h1", b"first").await.unwrap();
        store.put("h1", b"second").await.unwrap();
        assert_eq!(store.get("h1").await.unwrap(), b"first");
    }

    #[tokio::test]
    async fn methods_tolerate_being_called_before_open() {
        let store = MemoryBlobStore::new();
        assert!(store.get("missing").await.is_none());
        assert!(!store.has("missing").await);
    }
}
