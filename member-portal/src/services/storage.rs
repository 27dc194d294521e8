//! Object storage for uploaded files, behind a capability trait so the
//! repository logic is independent of the backing store.

use async_trait::async_trait;
use site_core::error::AppError;
use std::path::PathBuf;
use tokio::fs;

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn put(&self, key: &str, data: Vec<u8>) -> Result<(), AppError>;

    async fn fetch(&self, key: &str) -> Result<Vec<u8>, AppError>;

    /// Remove the object. Removing an absent key is a no-op.
    async fn remove(&self, key: &str) -> Result<(), AppError>;
}

/// Filesystem-backed storage. Keys are flat (no directories).
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub async fn new(base_path: impl Into<PathBuf>) -> Result<Self, AppError> {
        let base_path = base_path.into();
        if !base_path.exists() {
            fs::create_dir_all(&base_path).await?;
        }
        Ok(Self { base_path })
    }

    /// Resolve a key under the base directory, rejecting anything that
    /// could escape it. Generated keys are already sanitized; this guards
    /// against keys read back from the metadata store.
    fn resolve(&self, key: &str) -> Result<PathBuf, AppError> {
        if key.is_empty() || key.contains(['/', '\\']) || key.contains("..") {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "invalid storage key {:?}",
                key
            )));
        }
        Ok(self.base_path.join(key))
    }
}

#[async_trait]
impl ObjectStorage for LocalStorage {
    async fn put(&self, key: &str, data: Vec<u8>) -> Result<(), AppError> {
        let path = self.resolve(key)?;
        fs::write(path, data).await?;
        Ok(())
    }

    async fn fetch(&self, key: &str) -> Result<Vec<u8>, AppError> {
        let path = self.resolve(key)?;
        match fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(AppError::NotFound(
                anyhow::anyhow!("no object under key {:?}", key),
            )),
            Err(e) => Err(e.into()),
        }
    }

    async fn remove(&self, key: &str) -> Result<(), AppError> {
        let path = self.resolve(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
