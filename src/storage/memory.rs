//! In-memory object store
//!
//! Used by tests and demos. Conditional writes have real compare-and-swap
//! semantics under the write lock, and puts can be made to fail on matching
//! keys to exercise storage-failure paths.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{object_tag, ObjectStore, StorageError};

#[derive(Default)]
pub struct MemoryObjectStore {
    objects: RwLock<HashMap<String, Vec<u8>>>,
    fail_puts_matching: RwLock<Option<String>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent put whose key contains `fragment` fail with an
    /// I/O error. Pass `None` to clear.
    pub async fn fail_puts_matching(&self, fragment: Option<&str>) {
        *self.fail_puts_matching.write().await = fragment.map(|s| s.to_string());
    }

    /// Overwrite an object's bytes directly, bypassing the put checks.
    /// Test hook for simulating on-disk corruption.
    pub async fn corrupt(&self, key: &str, data: Vec<u8>) {
        self.objects.write().await.insert(key.to_string(), data);
    }

    async fn check_fault(&self, key: &str) -> Result<(), StorageError> {
        if let Some(fragment) = self.fail_puts_matching.read().await.as_deref() {
            if key.contains(fragment) {
                return Err(StorageError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    format!("injected write failure for '{}'", key),
                )));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        self.objects
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn put(&self, key: &str, data: Vec<u8>) -> Result<(), StorageError> {
        self.check_fault(key).await?;
        self.objects.write().await.insert(key.to_string(), data);
        Ok(())
    }

    async fn put_if_tag(
        &self,
        key: &str,
        data: Vec<u8>,
        expected_tag: Option<&str>,
    ) -> Result<(), StorageError> {
        self.check_fault(key).await?;
        let mut objects = self.objects.write().await;
        match (expected_tag, objects.get(key)) {
            (None, Some(_)) => {
                return Err(StorageError::PreconditionFailed(format!(
                    "object '{}' already exists",
                    key
                )));
            }
            (Some(tag), Some(bytes)) if object_tag(bytes) != tag => {
                return Err(StorageError::PreconditionFailed(format!(
                    "object '{}' was modified concurrently",
                    key
                )));
            }
            (Some(_), None) => {
                return Err(StorageError::PreconditionFailed(format!(
                    "object '{}' no longer exists",
                    key
                )));
            }
            _ => {}
        }
        objects.insert(key.to_string(), data);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.objects
            .write()
            .await
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.objects.read().await.contains_key(key))
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let mut keys: Vec<String> = self
            .objects
            .read()
            .await
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }
}
