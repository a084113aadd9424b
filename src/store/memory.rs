use super::{check_key, Error, Result, Store};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub const SCHEME: &str = "memory";

/// MemStore keeps blobs in process memory. Clones share the same map, so a
/// test can hand one clone to a backend and inspect the other.
#[derive(Clone, Debug, Default)]
pub struct MemStore {
    blobs: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn blobs(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>>> {
        self.blobs
            .lock()
            .map_err(|_| Error::Other(anyhow::anyhow!("memory store lock poisoned")))
    }
}

#[async_trait::async_trait]
impl Store for MemStore {
    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        check_key(key)?;
        self.blobs()?.get(key).cloned().ok_or(Error::KeyNotFound)
    }

    async fn set(&self, key: &str, blob: &[u8]) -> Result<()> {
        check_key(key)?;
        self.blobs()?.insert(key.to_string(), blob.to_vec());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        check_key(key)?;
        self.blobs()?.remove(key);
        Ok(())
    }

    fn url(&self) -> String {
        format!("{}://", SCHEME)
    }
}
