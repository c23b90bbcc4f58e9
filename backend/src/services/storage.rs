use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::StorageError;

pub type StorageResult<T> = Result<T, StorageError>;

/// Blob storage primitive used by the storage probe
#[async_trait]
pub trait BlobStorage: Send + Sync {
    async fn put(&self, name: &str, contents: &[u8]) -> StorageResult<()>;

    async fn exists(&self, name: &str) -> StorageResult<bool>;

    async fn get(&self, name: &str) -> StorageResult<Vec<u8>>;

    /// Remove `name`, returning whether it existed
    async fn delete(&self, name: &str) -> StorageResult<bool>;

    /// Driver name reported in probe details
    fn driver(&self) -> &'static str;
}

/// Files on the local disk under a root directory
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a relative object name below the root
    fn path_for(&self, name: &str) -> StorageResult<PathBuf> {
        let relative = Path::new(name);
        let is_plain = !name.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));

        if !is_plain {
            return Err(StorageError::InvalidPath(name.to_string()));
        }

        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStorage for LocalStorage {
    async fn put(&self, name: &str, contents: &[u8]) -> StorageResult<()> {
        let path = self.path_for(name)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(&path).await?;
        file.write_all(contents).await?;
        file.flush().await?;
        Ok(())
    }

    async fn exists(&self, name: &str) -> StorageResult<bool> {
        let path = self.path_for(name)?;
        Ok(fs::try_exists(&path).await?)
    }

    async fn get(&self, name: &str) -> StorageResult<Vec<u8>> {
        let path = self.path_for(name)?;
        Ok(fs::read(&path).await?)
    }

    async fn delete(&self, name: &str) -> StorageResult<bool> {
        let path = self.path_for(name)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn driver(&self) -> &'static str {
        "local"
    }
}
