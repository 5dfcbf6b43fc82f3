//! File operations

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::errors::EngineError;
use crate::utils::generate_uuid;

/// A file wrapper with path
#[derive(Debug, Clone)]
pub struct File {
    path: PathBuf,
}

impl File {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn exists(&self) -> bool {
        fs::metadata(&self.path).await.is_ok()
    }

    /// Read file contents as string
    pub async fn read_string(&self) -> Result<String, EngineError> {
        Ok(fs::read_to_string(&self.path).await?)
    }

    /// Read file as JSON
    pub async fn read_json<T: DeserializeOwned>(&self) -> Result<T, EngineError> {
        let contents = self.read_string().await?;
        let value = serde_json::from_str(&contents)?;
        Ok(value)
    }

    /// Write JSON to file, replacing any previous content
    pub async fn write_json<T: Serialize>(&self, value: &T) -> Result<(), EngineError> {
        let contents = serde_json::to_string_pretty(value)?;
        self.write_atomic(contents.as_bytes()).await
    }

    /// Write JSON to a file that must not exist yet
    pub async fn create_json<T: Serialize>(&self, value: &T) -> Result<(), EngineError> {
        let contents = serde_json::to_string_pretty(value)?;
        self.create_atomic(contents.as_bytes()).await
    }

    /// Atomic write using a temporary file
    pub async fn write_atomic(&self, contents: &[u8]) -> Result<(), EngineError> {
        let temp_path = self.write_temp(contents).await?;
        fs::rename(&temp_path, &self.path).await?;
        Ok(())
    }

    /// Atomic write that fails with `StorageError` if the target exists.
    ///
    /// The content is staged in a temporary file and hard-linked into place,
    /// so readers never observe a partial file and an existing file is never
    /// replaced.
    pub async fn create_atomic(&self, contents: &[u8]) -> Result<(), EngineError> {
        let temp_path = self.write_temp(contents).await?;
        let linked = fs::hard_link(&temp_path, &self.path).await;
        let _ = fs::remove_file(&temp_path).await;

        match linked {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(EngineError::StorageError(
                format!("{} already exists", self.path.display()),
            )),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_temp(&self, contents: &[u8]) -> Result<PathBuf, EngineError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let temp_path = self
            .path
            .with_file_name(format!(".{}.{}.tmp", file_name, generate_uuid()));

        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(contents).await?;
        file.sync_all().await?;
        Ok(temp_path)
    }
}
