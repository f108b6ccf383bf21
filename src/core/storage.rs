use std::{
    collections::HashMap,
    path::{Component, Path, PathBuf},
};

use async_trait::async_trait;
use tokio::sync::RwLock;

/// Blob storage for uploaded files. Paths are relative to the storage root.
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Store `bytes` under `suggested_name` and return the stored path.
    async fn store(&self, bytes: &[u8], suggested_name: &str) -> anyhow::Result<String>;

    async fn exists(&self, path: &str) -> bool;
}

fn validate_relative_path(path: &str) -> anyhow::Result<()> {
    let relative = Path::new(path);
    if path.is_empty()
        || relative
            .components()
            .any(|x| !matches!(x, Component::Normal(_)))
    {
        anyhow::bail!("invalid storage path: {}", path);
    }
    Ok(())
}

/// Stores blobs as files below a root directory.
pub struct LocalBlobStorage {
    root: PathBuf,
}

impl LocalBlobStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl BlobStorage for LocalBlobStorage {
    async fn store(&self, bytes: &[u8], suggested_name: &str) -> anyhow::Result<String> {
        validate_relative_path(suggested_name)?;
        let full_path = self.root.join(suggested_name);
        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&full_path, bytes).await?;
        tracing::debug!("stored {} bytes at {}", bytes.len(), full_path.display());
        Ok(suggested_name.to_string())
    }

    async fn exists(&self, path: &str) -> bool {
        if validate_relative_path(path).is_err() {
            return false;
        }
        tokio::fs::try_exists(self.root.join(path))
            .await
            .unwrap_or(false)
    }
}

/// In-memory storage, used in place of the filesystem in tests.
#[derive(Default)]
pub struct MemoryBlobStorage {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.blobs.read().await.get(path).cloned()
    }
}

#[async_trait]
impl BlobStorage for MemoryBlobStorage {
    async fn store(&self, bytes: &[u8], suggested_name: &str) -> anyhow::Result<String> {
        validate_relative_path(suggested_name)?;
        self.blobs
            .write()
            .await
            .insert(suggested_name.to_string(), bytes.to_vec());
        Ok(suggested_name.to_string())
    }

    async fn exists(&self, path: &str) -> bool {
        self.blobs.read().await.contains_key(path)
    }
}
