use anyhow::Context;
use image::ImageFormat;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::config::MAX_UPLOAD_BYTES;
use crate::error::LoadError;
use crate::models::UploadedImage;

/// A binary resource as handed over by the operator
#[derive(Debug, Clone)]
pub struct ImageFile {
    pub name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl ImageFile {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes,
        }
    }

    /// Read a file from disk, declaring its media type from the extension
    pub async fn from_path<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let media_type = ImageFormat::from_path(path)
            .map(|format| format.to_mime_type())
            .unwrap_or("application/octet-stream");
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(name, media_type, bytes))
    }

    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Validates and decodes uploads
#[derive(Debug, Clone, Copy)]
pub struct ImageLoader {
    max_upload_bytes: u64,
}

impl ImageLoader {
    pub fn new(max_upload_bytes: u64) -> Self {
        Self { max_upload_bytes }
    }

    /// Check the declared media type, then the size
    pub fn validate(&self, media_type: &str, size_bytes: u64) -> Result<(), LoadError> {
        if !media_type.starts_with("image/") {
            return Err(LoadError::UnsupportedType(media_type.to_string()));
        }
        if size_bytes > self.max_upload_bytes {
            return Err(LoadError::TooLarge {
                size: size_bytes,
                limit: self.max_upload_bytes,
            });
        }
        Ok(())
    }

    /// Validate and decode `file` into an [`UploadedImage`].
    /// Decoding runs on the blocking pool.
    pub async fn load(&self, file: ImageFile) -> Result<UploadedImage, LoadError> {
        let size_bytes = file.size_bytes();
        self.validate(&file.media_type, size_bytes)?;

        let ImageFile { name, bytes, .. } = file;
        let raster = tokio::task::spawn_blocking(move || image::load_from_memory(&bytes))
            .await
            .map_err(|e| LoadError::Decode(e.to_string()))??;

        debug!(source = %name, width = raster.width(), height = raster.height(), "decoded image");

        Ok(UploadedImage {
            source_name: name,
            size_bytes,
            width: raster.width(),
            height: raster.height(),
            raster: Arc::new(raster),
        })
    }
}

impl Default for ImageLoader {
    fn default() -> Self {
        Self::new(MAX_UPLOAD_BYTES)
    }
}

/// Holds the session's current image; replacing or releasing drops the old raster
#[derive(Debug, Default)]
pub struct ImageSlot {
    current: Option<UploadedImage>,
}

impl ImageSlot {
    pub fn current(&self) -> Option<&UploadedImage> {
        self.current.as_ref()
    }

    pub fn install(&mut self, image: UploadedImage) {
        if let Some(previous) = self.current.replace(image) {
            debug!(source = %previous.source_name, "released previous image");
        }
    }

    /// Returns true when an image was held
    pub fn release(&mut self) -> bool {
        match self.current.take() {
            Some(previous) => {
                debug!(source = %previous.source_name, "released image");
                true
            }
            None => false,
        }
    }
}
