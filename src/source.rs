//! The uploaded product photo.

use std::path::Path;

use image::{ImageFormat, RgbaImage};

use crate::config::ADVISORY_UPLOAD_LIMIT;
use crate::error::{Error, Result};

/// A decoded upload together with the bytes it came from.
///
/// Immutable once loaded. The original bytes are kept because they are what
/// gets sent to the background-removal service.
#[derive(Debug, Clone)]
pub struct SourceImage {
    bytes: Vec<u8>,
    format: ImageFormat,
    pixels: RgbaImage,
}

impl SourceImage {
    /// Decode an in-memory upload.
    ///
    /// Uploads above the advisory 5 MB limit are accepted with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedFormat`] if the format cannot be detected
    /// and [`Error::Image`] if decoding fails.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let format =
            image::guess_format(&bytes).map_err(|e| Error::UnsupportedFormat(e.to_string()))?;
        if bytes.len() > ADVISORY_UPLOAD_LIMIT {
            tracing::warn!(
                len = bytes.len(),
                limit = ADVISORY_UPLOAD_LIMIT,
                "upload is larger than recommended"
            );
        }
        let pixels = image::load_from_memory_with_format(&bytes, format)?.to_rgba8();
        Ok(Self {
            bytes,
            format,
            pixels,
        })
    }

    /// Read and decode an image file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read, otherwise the same
    /// errors as [`SourceImage::from_bytes`].
    pub fn open(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(bytes)
    }

    /// The bytes as uploaded.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Detected container format.
    #[must_use]
    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// MIME type of the upload.
    #[must_use]
    pub fn mime_type(&self) -> &'static str {
        self.format.to_mime_type()
    }

    /// Decoded pixels.
    #[must_use]
    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }
}
