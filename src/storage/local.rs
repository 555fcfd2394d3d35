//! Local file system object store
//!
//! Keys map directly onto paths under a base directory. Conditional writes
//! are serialized behind one in-process mutex; the filesystem itself has no
//! compare-and-swap primitive to lean on.

use std::path::{Component, Path, PathBuf};
use async_trait::async_trait;
use tokio::fs as tokio_fs;
use tokio::sync::Mutex;

use super::{object_tag, ObjectStore, StorageConfig, StorageError};

/// An object store backed by the local file system
pub struct LocalObjectStore {
    base_dir: PathBuf,
    cas_lock: Mutex<()>,
}

impl LocalObjectStore {
    /// Create a new local object store
    pub async fn new(config: StorageConfig) -> Result<Self, StorageError> {
        let base_dir = config.base_dir.clone();

        if !base_dir.exists() {
            tokio_fs::create_dir_all(&base_dir).await?;
        }

        Ok(Self {
            base_dir,
            cas_lock: Mutex::new(()),
        })
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        if key.is_empty() {
            return Err(StorageError::InvalidKey("empty key".to_string()));
        }
        let relative = Path::new(key);
        // Keys must stay inside the base directory
        for component in relative.components() {
            match component {
                Component::Normal(_) => {}
                _ => return Err(StorageError::InvalidKey(key.to_string())),
            }
        }
        Ok(self.base_dir.join(relative))
    }

    async fn ensure_parent(&self, path: &Path) -> Result<(), StorageError> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                tokio_fs::create_dir_all(parent).await?;
            }
        }
        Ok(())
    }

    async fn read_if_present(&self, path: &Path) -> Result<Option<Vec<u8>>, StorageError> {
        match tokio_fs::read(path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.path_for(key)?;
        self.read_if_present(&path)
            .await?
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn put(&self, key: &str, data: Vec<u8>) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        self.ensure_parent(&path).await?;
        tokio_fs::write(&path, data).await?;
        Ok(())
    }

    async fn put_if_tag(
        &self,
        key: &str,
        data: Vec<u8>,
        expected_tag: Option<&str>,
    ) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        let _guard = self.cas_lock.lock().await;

        let current = self.read_if_present(&path).await?;
        match (expected_tag, current) {
            (None, Some(_)) => {
                return Err(StorageError::PreconditionFailed(format!(
                    "object '{}' already exists",
                    key
                )));
            }
            (Some(tag), Some(bytes)) if object_tag(&bytes) != tag => {
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

        self.ensure_parent(&path).await?;
        tokio_fs::write(&path, data).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        if !path.exists() {
            return Err(StorageError::NotFound(key.to_string()));
        }
        tokio_fs::remove_file(&path).await?;

        // Try to clean up empty parent directories up to the base
        let mut parent = path.parent();
        while let Some(dir) = parent {
            if dir == self.base_dir {
                break;
            }
            if tokio_fs::remove_dir(dir).await.is_err() {
                break;
            }
            parent = dir.parent();
        }
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        let path = self.path_for(key)?;
        Ok(path.exists())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let mut keys = Vec::new();
        if !self.base_dir.exists() {
            return Ok(keys);
        }

        // Depth-first walk collecting file keys relative to the base
        let mut pending = vec![self.base_dir.clone()];
        while let Some(dir) = pending.pop() {
            let mut entries = tokio_fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if path.is_dir() {
                    pending.push(path);
                } else if let Ok(relative) = path.strip_prefix(&self.base_dir) {
                    let key = relative.to_string_lossy().replace('\\', "/");
                    if key.starts_with(prefix) {
                        keys.push(key);
                    }
                }
            }
        }

        keys.sort();
        Ok(keys)
    }
}
