// /////////////////////////////////////////////////////////////////////////////
// Lifo
// SPDX-License-Identifier: MIT
// /////////////////////////////////////////////////////////////////////////////

//! The debounced persistence manager.
//!
//! `schedule_save` cancels any pending timer and starts a fresh one; only
//! the last root scheduled within a quiet window is ever written. Save
//! errors are swallowed (best-effort persistence) but logged.

use std::sync::Arc;
use std::time::Duration;

use lifo_domain::inode::Inode;
use lifo_domain::PERSISTENCE_DEBOUNCE_MS;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use super::blob_store::BlobStore;
use super::serde_tree::serialize;

pub struct PersistenceManager {
    backend: Arc<dyn BlobStore>,
    debounce: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl PersistenceManager {
    pub fn new(backend: Arc<dyn BlobStore>) -> Self {
        Self {
            backend,
            debounce: Duration::from_millis(PERSISTENCE_DEBOUNCE_MS),
            pending: Mutex::new(None),
        }
    }

    #[cfg(test)]
    pub fn with_debounce(backend: Arc<dyn BlobStore>, debounce: Duration) -> Self {
        Self {
            backend,
            debounce,
            pending: Mutex::new(None),
        }
    }

    /// Debounce a save of `root`. Each call cancels any timer started by a
    /// previous call and schedules a fresh one; only the final root within
    /// the quiet window is ever written to the backend.
    pub async fn schedule_save(&self, root: Inode) {
        let mut pending = self.pending.lock().await;
        if let Some(handle) = pending.take() {
            handle.abort();
        }
        let backend = self.backend.clone();
        let debounce = self.debounce;
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            let node = serialize(&root, true);
            if let Err(err) = backend.save_tree(&node).await {
                tracing::warn!(error = %err, "persistence save failed, swallowing");
            } else {
                tracing::debug!("persisted tree snapshot");
            }
        }));
    }

    /// Block until any in-flight debounce timer has fired. Intended for
    /// tests and for a clean shutdown path in the embedding host.
    pub async fn flush(&self) {
        let handle = self.pending.lock().await.take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    pub async fn load(&self) -> Option<Inode> {
        match self.backend.load_tree().await {
            Ok(Some(node)) => super::serde_tree::deserialize(&node).ok(),
            Ok(None) => None,
            Err(err) => {
                tracing::warn!(error = %err, "persistence load failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::blob_store::MemoryBlobStore;
    use chrono::Utc;

    #[tokio::test]
    async fn only_the_last_scheduled_save_within_the_window_is_written() {
        let backend: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());
        backend.open().await.unwrap();
        let manager = PersistenceManager::with_debounce(backend.clone(), Duration::from_millis(50));

        let now = Utc::now();
        manager.schedule_save(Inode::new_dir("first", now)).await;
        manager.schedule_save(Inode::new_dir("second", now)).await;
        manager.schedule_save(Inode::new_dir("final", now)).await;
        manager.flush().await;

        let saved = manager.load().await.unwrap();
        match saved {
            Inode::Directory { meta, .. } => assert_eq!(meta.name, "final"),
            _ => panic!("expected directory"),
        }
    }
}
