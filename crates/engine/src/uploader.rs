//! Receipt image uploads.

use std::path::PathBuf;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{EngineError, LocalImage, ResultEngine};

/// Folder tag used for transaction receipts.
pub const TRANSACTIONS_FOLDER: &str = "transactions";

/// Stores a raw image and returns a reference to it.
#[async_trait]
pub trait ImageUploader: Send + Sync {
    async fn upload(&self, image: &LocalImage, folder: &str) -> ResultEngine<String>;
}

/// Uploader writing images under a local directory.
///
/// Files land in `<root>/<folder>/<uuid>-<file name>`; the returned reference
/// is that path.
#[derive(Clone, Debug)]
pub struct DirectoryUploader {
    root: PathBuf,
}

impl DirectoryUploader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ImageUploader for DirectoryUploader {
    async fn upload(&self, image: &LocalImage, folder: &str) -> ResultEngine<String> {
        let file_name = PathBuf::from(&image.file_name)
            .file_name()
            .and_then(|name| name.to_str())
            .filter(|name| !name.is_empty())
            .map(ToString::to_string)
            .ok_or_else(|| EngineError::UploadFailed("image has no file name".to_string()))?;

        let dir = self.root.join(folder);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|err| EngineError::UploadFailed(err.to_string()))?;

        let path = dir.join(format!("{}-{file_name}", Uuid::new_v4()));
        tokio::fs::write(&path, &image.bytes)
            .await
            .map_err(|err| EngineError::UploadFailed(err.to_string()))?;

        tracing::debug!(path = %path.display(), "stored image");
        Ok(path.display().to_string())
    }
}

/// Uploader for setups without image storage; every upload fails.
#[derive(Clone, Copy, Debug, Default)]
pub struct DisabledUploader;

#[async_trait]
impl ImageUploader for DisabledUploader {
    async fn upload(&self, _image: &LocalImage, _folder: &str) -> ResultEngine<String> {
        Err(EngineError::UploadFailed(
            "image uploads are not configured".to_string(),
        ))
    }
}
