//! Error types for the catalog-variants crate.

/// Errors that can occur while extracting, composing, and encoding variants.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The background-removal collaborator answered without a usable image.
    #[error("failed to extract product from image: {reason}")]
    ExtractionFailed {
        /// What was missing or malformed in the collaborator's answer.
        reason: String,
    },

    /// The background-removal collaborator could not be reached or refused the call.
    #[error("background removal service unavailable: {0}")]
    CollaboratorUnavailable(String),

    /// A drawing surface of the requested size could not be allocated.
    #[error("could not acquire a {width}x{height} drawing surface")]
    SurfaceAcquisition {
        /// Requested width in pixels.
        width: u32,
        /// Requested height in pixels.
        height: u32,
    },

    /// The requested number of variants is not one of the allowed choices.
    #[error("cannot generate {requested} variants (allowed: {allowed:?})")]
    UnsupportedVariantCount {
        /// Number of variants asked for.
        requested: usize,
        /// Counts the configuration accepts.
        allowed: Vec<usize>,
    },

    /// A color palette has no entries.
    #[error("the {0} palette is empty")]
    EmptyPalette(&'static str),

    /// A color string is not a `#rrggbb` hex value.
    #[error("invalid color {0:?}: expected #rrggbb")]
    InvalidColor(String),

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Generation was requested before any source image was selected.
    #[error("no source image selected")]
    NoSource,

    /// Variants were requested before the product was cut out of the source.
    #[error("product has not been extracted from the source image yet")]
    NoCutout,

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The image format is not supported.
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// An error occurred during image decoding or encoding.
    #[error("image processing error: {0}")]
    Image(#[from] image::ImageError),
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
