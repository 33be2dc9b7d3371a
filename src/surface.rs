//! Owned RGBA drawing surface.
//!
//! A [`Surface`] is a single-writer pixel buffer. The keyer and the frame
//! composer draw into one; the variant loop reuses the same surface for every
//! frame instead of allocating a new canvas per variant.

use image::buffer::ConvertBuffer;
use image::{RgbImage, Rgba, RgbaImage};

use crate::error::{Error, Result};

/// Largest edge a surface may have, in pixels.
pub const MAX_SURFACE_EDGE: u32 = 32_767;

/// Largest pixel count a surface may hold (16384 x 16384).
pub const MAX_SURFACE_AREA: u64 = 268_435_456;

/// A pixel buffer that drawing operations write into.
#[derive(Debug, Clone)]
pub struct Surface {
    pixels: RgbaImage,
}

impl Surface {
    /// Allocate a transparent surface of the given size.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SurfaceAcquisition`] when either edge is zero, the size
    /// exceeds [`MAX_SURFACE_EDGE`] or [`MAX_SURFACE_AREA`], or the buffer
    /// cannot be allocated.
    pub fn acquire(width: u32, height: u32) -> Result<Self> {
        let pixels = allocate(width, height)?;
        Ok(Self { pixels })
    }

    /// Resize the surface to `width` x `height`, reusing the buffer when the
    /// size already matches. Contents are unspecified afterwards.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Surface::acquire`].
    pub fn ensure(&mut self, width: u32, height: u32) -> Result<()> {
        if self.pixels.dimensions() != (width, height) {
            self.pixels = allocate(width, height)?;
        }
        Ok(())
    }

    /// Surface width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    /// Surface height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Overwrite every pixel with `color`.
    pub fn fill(&mut self, color: Rgba<u8>) {
        for px in self.pixels.pixels_mut() {
            *px = color;
        }
    }

    /// Read access to the pixels.
    #[must_use]
    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Write access to the pixels.
    pub fn pixels_mut(&mut self) -> &mut RgbaImage {
        &mut self.pixels
    }

    /// Give up the surface and keep its pixels.
    #[must_use]
    pub fn into_pixels(self) -> RgbaImage {
        self.pixels
    }

    /// Copy the pixels into an RGB image, dropping alpha.
    ///
    /// Meant for surfaces whose every pixel is already opaque, such as a
    /// composed frame.
    #[must_use]
    pub fn to_rgb(&self) -> RgbImage {
        self.pixels.convert()
    }
}

fn allocate(width: u32, height: u32) -> Result<RgbaImage> {
    let refused = || Error::SurfaceAcquisition { width, height };

    if width == 0 || height == 0 || width > MAX_SURFACE_EDGE || height > MAX_SURFACE_EDGE {
        return Err(refused());
    }
    let area = u64::from(width) * u64::from(height);
    if area > MAX_SURFACE_AREA {
        return Err(refused());
    }

    let len = usize::try_from(area * 4).map_err(|_| refused())?;
    let mut buf: Vec<u8> = Vec::new();
    buf.try_reserve_exact(len).map_err(|_| refused())?;
    buf.resize(len, 0);

    RgbaImage::from_raw(width, height, buf).ok_or_else(refused)
}
