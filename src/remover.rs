//! Contract for the external background-removal service.

use std::future::Future;

use crate::error::Result;
use crate::source::SourceImage;

/// Instruction sent along with the photo.
pub const ISOLATION_PROMPT: &str = "Extract the main product from this image and place it on a \
pure, solid white background (#FFFFFF). The product must be clean, sharp, and centered. \
Do not add any extra text or graphics. Return only the product on white.";

/// Something that isolates the subject of a photo on plain white.
///
/// Implementations return an encoded image in any format the `image` crate
/// can decode.
pub trait BackgroundRemover {
    /// Return the subject of `source` on a white background.
    ///
    /// # Errors
    ///
    /// [`crate::Error::ExtractionFailed`] when the answer holds no usable
    /// image, [`crate::Error::CollaboratorUnavailable`] when the service
    /// cannot be reached or rejects the request.
    fn remove_background(
        &self,
        source: &SourceImage,
    ) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

/// Hands the upload back untouched.
///
/// For photos that already show the product on white.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl BackgroundRemover for Passthrough {
    fn remove_background(
        &self,
        source: &SourceImage,
    ) -> impl Future<Output = Result<Vec<u8>>> + Send {
        std::future::ready(Ok(source.bytes().to_vec()))
    }
}
