//! JPEG encoding under a size budget.
//!
//! The budget is checked against the base64 text length of the payload,
//! since variants are handed out as `data:` URLs. Quality starts high and
//! drops by a fixed step until the payload fits or the floor is reached.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;

use crate::config::EncodeOptions;
use crate::error::Result;

/// Raster format of an encoded payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Baseline JPEG.
    Jpeg,
}

impl OutputFormat {
    /// MIME type of the format.
    #[must_use]
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
        }
    }

    /// File extension without the dot.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime_type())
    }
}

/// An encoded image and how it was produced.
#[derive(Clone, PartialEq, Eq)]
pub struct EncodedImage {
    bytes: Vec<u8>,
    format: OutputFormat,
    quality: u8,
    attempts: u32,
    within_budget: bool,
}

impl fmt::Debug for EncodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedImage")
            .field("len", &self.bytes.len())
            .field("format", &self.format)
            .field("quality", &self.quality)
            .field("attempts", &self.attempts)
            .field("within_budget", &self.within_budget)
            .finish()
    }
}

impl EncodedImage {
    /// The encoded payload.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Payload format.
    #[must_use]
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Quality of the final encode, in percent.
    #[must_use]
    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Number of encodes performed.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// False when the floor was reached and the payload is still over budget.
    #[must_use]
    pub fn within_budget(&self) -> bool {
        self.within_budget
    }

    /// The payload as a `data:` URL.
    #[must_use]
    pub fn data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.format.mime_type(),
            STANDARD.encode(&self.bytes)
        )
    }
}

/// Length of `len` bytes once base64 encoded with padding.
#[must_use]
pub fn base64_len(len: usize) -> usize {
    len.div_ceil(3) * 4
}

/// Whether a payload of `len` bytes fits `max_kilobytes` after base64
/// expansion, i.e. `base64_len(len) <= max_kilobytes * 1024 * 4 / 3`.
#[must_use]
pub fn fits_budget(len: usize, max_kilobytes: u32) -> bool {
    // compare 3 * text <= 4 * 1024 * kb to stay in integers
    let text = base64_len(len) as u128;
    text * 3 <= u128::from(max_kilobytes) * 1024 * 4
}

/// Encode `image` as JPEG, lowering quality until it fits the budget.
///
/// Starts at `initial_quality`, then steps down by `quality_step` (never below
/// `min_quality`) while the payload is over budget. Reaching the floor while
/// still over budget is accepted and reported by
/// [`EncodedImage::within_budget`].
///
/// # Errors
///
/// Returns [`crate::Error::InvalidConfig`] for malformed options and
/// [`crate::Error::Image`] if the encoder fails.
pub fn encode_within_budget(image: &RgbImage, opts: &EncodeOptions) -> Result<EncodedImage> {
    opts.validate()?;

    let mut quality = opts.initial_quality;
    let mut bytes = encode_jpeg(image, quality)?;
    let mut attempts = 1;
    tracing::debug!(quality, len = bytes.len(), "encoded frame");

    while !fits_budget(bytes.len(), opts.max_kilobytes) && quality > opts.min_quality {
        quality = quality
            .saturating_sub(opts.quality_step)
            .max(opts.min_quality);
        bytes = encode_jpeg(image, quality)?;
        attempts += 1;
        tracing::debug!(quality, len = bytes.len(), "re-encoded frame");
    }

    let within_budget = fits_budget(bytes.len(), opts.max_kilobytes);
    if !within_budget {
        tracing::debug!(
            quality,
            len = bytes.len(),
            max_kb = opts.max_kilobytes,
            "quality floor reached above budget, keeping result"
        );
    }

    Ok(EncodedImage {
        bytes,
        format: OutputFormat::Jpeg,
        quality,
        attempts,
        within_budget,
    })
}

/// Encode `image` as JPEG at `quality` percent.
///
/// # Errors
///
/// Returns [`crate::Error::Image`] if encoding fails.
pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality).encode_image(image)?;
    Ok(buf)
}
