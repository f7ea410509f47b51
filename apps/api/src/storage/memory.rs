use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use super::{ArtifactStore, StorageError};

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub bytes: Bytes,
    pub content_type: String,
}

/// In-memory artifact store. Keys listed in `fail_puts` reject writes.
#[derive(Default)]
pub struct MemoryArtifactStore {
    objects: Mutex<HashMap<String, StoredObject>>,
    fail_puts: Mutex<Vec<String>>,
}

impl MemoryArtifactStore {
    pub fn object(&self, key: &str) -> Option<StoredObject> {
        self.objects.lock().expect("lock").get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.lock().expect("lock").keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn inject_put_failure(&self, key_suffix: impl Into<String>) {
        self.fail_puts.lock().expect("lock").push(key_suffix.into());
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<(), StorageError> {
        if self
            .fail_puts
            .lock()
            .expect("lock")
            .iter()
            .any(|suffix| key.ends_with(suffix.as_str()))
        {
            return Err(StorageError::S3(format!("injected failure for {key}")));
        }
        self.objects.lock().expect("lock").insert(
            key.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Bytes, StorageError> {
        self.objects
            .lock()
            .expect("lock")
            .get(key)
            .map(|o| o.bytes.clone())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn presign(
        &self,
        key: &str,
        filename: &str,
        ttl: Duration,
    ) -> Result<String, StorageError> {
        if !self.objects.lock().expect("lock").contains_key(key) {
            return Err(StorageError::NotFound(key.to_string()));
        }
        Ok(format!(
            "memory://artifacts/{key}?filename={filename}&expires={}",
            ttl.as_secs()
        ))
    }
}
