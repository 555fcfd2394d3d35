//! Object storage abstraction
//!
//! The version store persists documents through this seam: flat string keys
//! mapping to opaque byte objects. Conditional writes are expressed with
//! content tags (SHA-256 of the stored bytes) so an index update can detect
//! that another writer got there first.

use sha2::{Digest, Sha256};
use std::path::PathBuf;
use thiserror::Error;

pub mod local;
pub mod memory;

pub use local::LocalObjectStore;
pub use memory::MemoryObjectStore;

/// Error types for storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

/// Content tag for conditional writes
pub fn object_tag(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Trait for object storage backends
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    /// Retrieve an object's bytes
    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Store an object unconditionally
    async fn put(&self, key: &str, data: Vec<u8>) -> Result<(), StorageError>;

    /// Store an object only if the current content matches `expected_tag`.
    /// `None` means the object must not exist yet (create-only).
    async fn put_if_tag(
        &self,
        key: &str,
        data: Vec<u8>,
        expected_tag: Option<&str>,
    ) -> Result<(), StorageError>;

    /// Delete an object
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Check if an object exists
    async fn exists(&self, key: &str) -> Result<bool, StorageError>;

    /// List all keys under a prefix
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError>;
}

/// Configuration for storage backends
#[derive(Clone, Debug)]
pub struct StorageConfig {
    /// Base directory for filesystem-backed storage
    pub base_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("./weftline_data"),
        }
    }
}
