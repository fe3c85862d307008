//! Local storage for expected-output images.
//!
//! Stored paths are relative to the media root and are what the `prompts`
//! table keeps in `expected_output`. They are published under [`MEDIA_URL_PREFIX`].

use image::ImageFormat;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

pub const MEDIA_URL_PREFIX: &str = "/media/";

const EXPECTED_OUTPUT_DIR: &str = "prompts/expected_output";

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Unsupported image type: {0}")]
    UnsupportedType(String),

    #[error("Upload of {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: usize, limit: usize },

    #[error("Invalid media path: {0}")]
    InvalidPath(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
    max_bytes: usize,
}

/// Public URL of a stored media path.
pub fn public_url(stored: &str) -> String {
    format!("{}{}", MEDIA_URL_PREFIX, stored)
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            root: root.into(),
            max_bytes,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Store an uploaded image and return its stored path. The format is
    /// read from the bytes; the client's file name only shows up in errors.
    pub async fn save_image(&self, file_name: &str, data: &[u8]) -> Result<String, MediaError> {
        if data.len() > self.max_bytes {
            return Err(MediaError::TooLarge {
                size: data.len(),
                limit: self.max_bytes,
            });
        }

        let ext = image_extension(file_name, data)?;
        let stored = format!(
            "{}/{}.{}",
            EXPECTED_OUTPUT_DIR,
            uuid::Uuid::now_v7(),
            ext
        );

        let path = self.resolve(&stored)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, data).await?;

        tracing::info!(path = %stored, bytes = data.len(), "Stored image");
        Ok(stored)
    }

    /// Remove a stored file. Missing files are not an error.
    pub async fn remove(&self, stored: &str) -> Result<(), MediaError> {
        let path = self.resolve(stored)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!(path = %stored, "Removed image");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Best-effort removal used after the owning rows are already gone.
    pub async fn discard(&self, stored: &str) {
        if let Err(e) = self.remove(stored).await {
            tracing::warn!(path = %stored, "Failed to remove image: {}", e);
        }
    }

    /// Read a stored file, returning its bytes and content type.
    pub async fn read(&self, stored: &str) -> Result<Option<(Vec<u8>, String)>, MediaError> {
        let path = self.resolve(stored)?;
        match tokio::fs::read(&path).await {
            Ok(data) => {
                let mime = mime_guess::from_path(&path).first_or_octet_stream();
                Ok(Some((data, mime.as_ref().to_string())))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn resolve(&self, stored: &str) -> Result<PathBuf, MediaError> {
        let relative = Path::new(stored);
        let clean = !stored.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !clean {
            return Err(MediaError::InvalidPath(stored.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

/// Raster formats accepted for upload, keyed by their stored extension.
fn image_extension(file_name: &str, data: &[u8]) -> Result<&'static str, MediaError> {
    let format = image::guess_format(data)
        .map_err(|_| MediaError::UnsupportedType(file_name.to_string()))?;
    match format {
        ImageFormat::Png => Ok("png"),
        ImageFormat::Jpeg => Ok("jpg"),
        ImageFormat::Gif => Ok("gif"),
        ImageFormat::WebP => Ok("webp"),
        other => Err(MediaError::UnsupportedType(format!(
            "{} ({:?})",
            file_name, other
        ))),
    }
}
