//! Tunable constants of the variant pipeline.

use crate::color::{ColorSpec, BACKGROUND_PALETTE, BORDER_PALETTE};
use crate::error::{Error, Result};

/// Edge length of every output frame, in pixels.
pub const CANVAS_SIZE: u32 = 1000;
/// Fraction of the canvas edge that bounds the subject's longer side.
pub const PRODUCT_SCALE: f64 = 0.68;
/// Fraction of the canvas edge used as border thickness.
pub const BORDER_FRACTION: f64 = 0.07;
/// Size budget per encoded variant, in kilobytes.
pub const MAX_FILE_SIZE_KB: u32 = 200;
/// Variant counts a run may ask for.
pub const ALLOWED_VARIANT_COUNTS: [usize; 4] = [1, 3, 5, 10];
/// First JPEG quality tried, in percent.
pub const INITIAL_QUALITY: u8 = 92;
/// JPEG quality the encoder never goes below, in percent.
pub const MIN_QUALITY: u8 = 10;
/// Quality decrement between encode attempts, in percent.
pub const QUALITY_STEP: u8 = 10;
/// Uploads larger than this are accepted but logged as oversized.
pub const ADVISORY_UPLOAD_LIMIT: usize = 5 * 1024 * 1024;

/// Settings for the size-constrained encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Size budget in kilobytes.
    pub max_kilobytes: u32,
    /// First quality tried (1-100).
    pub initial_quality: u8,
    /// Lowest quality tried (1-100).
    pub min_quality: u8,
    /// Amount quality drops per retry.
    pub quality_step: u8,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            max_kilobytes: MAX_FILE_SIZE_KB,
            initial_quality: INITIAL_QUALITY,
            min_quality: MIN_QUALITY,
            quality_step: QUALITY_STEP,
        }
    }
}

impl EncodeOptions {
    /// Check that the quality search is well formed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] for qualities outside 1-100, a floor
    /// above the initial quality, or a zero step.
    pub fn validate(&self) -> Result<()> {
        if !(1..=100).contains(&self.initial_quality) || !(1..=100).contains(&self.min_quality) {
            return Err(Error::InvalidConfig(format!(
                "qualities must be within 1-100 (initial {}, floor {})",
                self.initial_quality, self.min_quality
            )));
        }
        if self.min_quality > self.initial_quality {
            return Err(Error::InvalidConfig(format!(
                "quality floor {} is above initial quality {}",
                self.min_quality, self.initial_quality
            )));
        }
        if self.quality_step == 0 {
            return Err(Error::InvalidConfig("quality step must be positive".into()));
        }
        Ok(())
    }
}

/// Everything a generation run needs besides the subject image.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogConfig {
    /// Output edge length in pixels.
    pub canvas_size: u32,
    /// Subject envelope as a fraction of the canvas edge.
    pub product_scale: f64,
    /// Border thickness as a fraction of the canvas edge.
    pub border_fraction: f64,
    /// Counts accepted by [`CatalogConfig::check_variant_count`].
    pub allowed_counts: Vec<usize>,
    /// Encoder settings.
    pub encode: EncodeOptions,
    /// Colors drawn for frame backgrounds.
    pub background_palette: Vec<ColorSpec>,
    /// Colors drawn for frame borders.
    pub border_palette: Vec<ColorSpec>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            canvas_size: CANVAS_SIZE,
            product_scale: PRODUCT_SCALE,
            border_fraction: BORDER_FRACTION,
            allowed_counts: ALLOWED_VARIANT_COUNTS.to_vec(),
            encode: EncodeOptions::default(),
            background_palette: BACKGROUND_PALETTE.to_vec(),
            border_palette: BORDER_PALETTE.to_vec(),
        }
    }
}

impl CatalogConfig {
    /// Check every field.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] for a zero canvas or a fraction outside
    /// `(0, 1)`, [`Error::EmptyPalette`] for an empty palette, and whatever
    /// [`EncodeOptions::validate`] reports.
    pub fn validate(&self) -> Result<()> {
        if self.canvas_size == 0 {
            return Err(Error::InvalidConfig("canvas size must be positive".into()));
        }
        for (name, value) in [
            ("product scale", self.product_scale),
            ("border fraction", self.border_fraction),
        ] {
            if !(value > 0.0 && value < 1.0) {
                return Err(Error::InvalidConfig(format!(
                    "{name} must be between 0 and 1, got {value}"
                )));
            }
        }
        if self.background_palette.is_empty() {
            return Err(Error::EmptyPalette("background"));
        }
        if self.border_palette.is_empty() {
            return Err(Error::EmptyPalette("border"));
        }
        self.encode.validate()
    }

    /// Accept `count` only if it is one of [`CatalogConfig::allowed_counts`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedVariantCount`] otherwise.
    pub fn check_variant_count(&self, count: usize) -> Result<usize> {
        if self.allowed_counts.contains(&count) {
            Ok(count)
        } else {
            Err(Error::UnsupportedVariantCount {
                requested: count,
                allowed: self.allowed_counts.clone(),
            })
        }
    }
}
