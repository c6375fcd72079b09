use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::error::Error;
use crate::validation::validate_file_name;

#[derive(Debug, Error)]
pub enum ImageStorageError {
    #[error("object not found")]
    NotFound,
    #[error("invalid object name")]
    InvalidName,
    #[error("storage operation timed out")]
    Timeout,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ImageStorageError {
    fn from_io(e: std::io::Error) -> Self {
        if e.kind() == ErrorKind::NotFound {
            Self::NotFound
        } else {
            Self::Io(e)
        }
    }
}

impl From<ImageStorageError> for Error {
    fn from(e: ImageStorageError) -> Self {
        match e {
            ImageStorageError::NotFound => Error::NotFound,
            ImageStorageError::InvalidName => Error::validation("Invalid file name"),
            ImageStorageError::Timeout => Error::Timeout("image storage"),
            ImageStorageError::Io(e) => Error::Io(e),
        }
    }
}

/// Filesystem object store for uploaded pictures, laid out as
/// `<data_dir>/images/<user_id>/<file_name>`.
pub struct ImageStorage {
    base_path: PathBuf,
    timeout: Duration,
}

impl ImageStorage {
    pub fn new(data_dir: &Path, timeout: Duration) -> Self {
        Self {
            base_path: data_dir.join("images"),
            timeout,
        }
    }

    /// Storage path as recorded in the images table.
    #[must_use]
    pub fn object_key(user_id: &str, file_name: &str) -> String {
        format!("{user_id}/{file_name}")
    }

    fn object_path(&self, user_id: &str, file_name: &str) -> Result<PathBuf, ImageStorageError> {
        if validate_file_name(file_name).is_err() || !is_valid_segment(user_id) {
            return Err(ImageStorageError::InvalidName);
        }
        Ok(self.base_path.join(user_id).join(file_name))
    }

    fn temp_path(&self, user_id: &str) -> PathBuf {
        self.base_path
            .join(user_id)
            .join(".tmp")
            .join(Uuid::new_v4().to_string())
    }

    async fn bounded<T, F>(&self, fut: F) -> Result<T, ImageStorageError>
    where
        F: Future<Output = Result<T, ImageStorageError>>,
    {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| ImageStorageError::Timeout)?
    }

    pub async fn exists(&self, user_id: &str, file_name: &str) -> Result<bool, ImageStorageError> {
        let path = self.object_path(user_id, file_name)?;
        self.bounded(async move { Ok(fs::try_exists(&path).await?) })
            .await
    }

    pub async fn open(
        &self,
        user_id: &str,
        file_name: &str,
    ) -> Result<(File, u64), ImageStorageError> {
        let path = self.object_path(user_id, file_name)?;
        self.bounded(async move {
            let file = File::open(&path).await.map_err(ImageStorageError::from_io)?;
            let size = file.metadata().await?.len();
            Ok((file, size))
        })
        .await
    }

    /// Writes through a temp file so readers never observe a partial object.
    pub async fn put(
        &self,
        user_id: &str,
        file_name: &str,
        data: &[u8],
    ) -> Result<(), ImageStorageError> {
        let final_path = self.object_path(user_id, file_name)?;
        let temp_path = self.temp_path(user_id);

        self.bounded(async move {
            if let Some(parent) = temp_path.parent() {
                fs::create_dir_all(parent).await?;
            }

            let mut temp_file = File::create(&temp_path).await?;
            temp_file.write_all(data).await?;
            temp_file.sync_all().await?;

            if let Some(parent) = final_path.parent() {
                fs::create_dir_all(parent).await?;
            }
            fs::rename(&temp_path, &final_path).await?;
            Ok(())
        })
        .await
    }

    pub async fn delete(&self, user_id: &str, file_name: &str) -> Result<bool, ImageStorageError> {
        let path = self.object_path(user_id, file_name)?;
        self.bounded(async move {
            match fs::remove_file(&path).await {
                Ok(()) => Ok(true),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
                Err(e) => Err(ImageStorageError::Io(e)),
            }
        })
        .await
    }
}

fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && !segment.starts_with('.')
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
