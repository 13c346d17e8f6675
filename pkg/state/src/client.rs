use crate::watch::{EventLog, EventType};
use slatedb::Db;
use slatedb::object_store::local::LocalFileSystem;
use slatedb::object_store::path::Path;
use std::sync::Arc;
use tracing::info;

/// Persistent state store backed by SlateDB on a local filesystem.
/// In production this would use S3/R2/MinIO via the `object_store` crate.
///
/// Every successful mutation is mirrored into the attached watch log, so
/// controllers can react to changes without polling the whole keyspace.
#[derive(Clone)]
pub struct StateStore {
    db: Db,
    pub event_log: EventLog,
}

impl StateStore {
    /// Open (or create) a state store rooted at `path` on the local filesystem.
    pub async fn new(path: &str) -> anyhow::Result<Self> {
        info!("Opening SlateDB state store at {}", path);

        // Ensure the data directory exists before opening the object store
        std::fs::create_dir_all(path)
            .map_err(|e| anyhow::anyhow!("Failed to create data directory {}: {}", path, e))?;

        let object_store = Arc::new(
            LocalFileSystem::new_with_prefix(path)
                .map_err(|e| anyhow::anyhow!("Failed to create local object store: {}", e))?,
        );
        let db = Db::open(Path::from("/"), object_store)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to open SlateDB: {}", e))?;
        Ok(Self {
            db,
            event_log: EventLog::new(),
        })
    }

    /// Store a value under the given key.
    pub async fn put(&self, key: &str, value: &[u8]) -> anyhow::Result<()> {
        self.db
            .put(key.as_bytes(), value)
            .await
            .map_err(|e| anyhow::anyhow!("SlateDB put failed: {}", e))?;
        self.event_log.emit(EventType::Put, key.to_string());
        Ok(())
    }

    /// Retrieve the value for a key, or `None` if it does not exist.
    pub async fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        match self.db.get(key.as_bytes()).await {
            Ok(Some(bytes)) => Ok(Some(bytes.to_vec())),
            Ok(None) => Ok(None),
            Err(e) => Err(anyhow::anyhow!("SlateDB get failed: {}", e)),
        }
    }

    /// Delete a key from the store.
    pub async fn delete(&self, key: &str) -> anyhow::Result<()> {
        self.db
            .delete(key.as_bytes())
            .await
            .map_err(|e| anyhow::anyhow!("SlateDB delete failed: {}", e))?;
        self.event_log.emit(EventType::Delete, key.to_string());
        Ok(())
    }

    /// List all key-value pairs whose keys start with `prefix`.
    /// Returns them as `(key_string, raw_bytes)`.
    pub async fn list_prefix(&self, prefix: &str) -> anyhow::Result<Vec<(String, Vec<u8>)>> {
        let mut results = Vec::new();
        let mut iter = self
            .db
            .scan_prefix(prefix.as_bytes())
            .await
            .map_err(|e| anyhow::anyhow!("SlateDB scan_prefix failed: {}", e))?;

        while let Ok(Some(kv)) = iter.next().await {
            let key = String::from_utf8_lossy(&kv.key).to_string();
            results.push((key, kv.value.to_vec()));
        }
        Ok(results)
    }

    /// Gracefully close the state store.
    pub async fn close(self) -> anyhow::Result<()> {
        info!("Closing SlateDB state store");
        self.db
            .close()
            .await
            .map_err(|e| anyhow::anyhow!("SlateDB close failed: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    async fn scratch_store() -> StateStore {
        let dir = std::env::temp_dir().join(format!("authsync-state-test-{}", Uuid::new_v4()));
        StateStore::new(dir.to_str().unwrap()).await.unwrap()
    }

    #[tokio::test]
    async fn put_get_delete_roundtrip() {
        let store = scratch_store().await;
        let key = "/registry/grants/g1";

        assert!(store.get(key).await.unwrap().is_none());
        store.put(key, b"v1").await.unwrap();
        assert_eq!(store.get(key).await.unwrap().unwrap(), b"v1");
        store.delete(key).await.unwrap();
        assert!(store.get(key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_prefix_scopes_to_prefix() {
        let store = scratch_store().await;
        store.put("/registry/grants/g1", b"a").await.unwrap();
        store.put("/registry/grants/g2", b"b").await.unwrap();
        store.put("/registry/clusterroles/r1", b"c").await.unwrap();

        let grants = store.list_prefix("/registry/grants/").await.unwrap();
        assert_eq!(grants.len(), 2);
        assert!(grants.iter().all(|(k, _)| k.starts_with("/registry/grants/")));
    }

    #[tokio::test]
    async fn mutations_feed_the_watch_log() {
        let store = scratch_store().await;
        let mut rx = store.event_log.subscribe();

        store.put("/registry/grants/g1", b"v").await.unwrap();
        store.delete("/registry/grants/g1").await.unwrap();

        let put = rx.recv().await.unwrap();
        assert_eq!(put.event_type, EventType::Put);
        assert_eq!(put.key, "/registry/grants/g1");
        let del = rx.recv().await.unwrap();
        assert_eq!(del.event_type, EventType::Delete);
    }
}
