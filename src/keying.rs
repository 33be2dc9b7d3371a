//! Near-white classification and alpha keying.
//!
//! The background-removal service returns the product on plain white. A pixel
//! counts as background when all three color channels exceed
//! [`BACKGROUND_THRESHOLD`]; alpha plays no part in the decision. Keying turns
//! exactly those pixels transparent and leaves everything else alone.

use image::{Rgba, RgbaImage};

use crate::surface::Surface;

/// Channels strictly above this value are "white enough" to be background.
pub const BACKGROUND_THRESHOLD: u8 = 245;

/// Whether a pixel belongs to the white backdrop rather than the subject.
///
/// True iff red, green, and blue are all greater than [`BACKGROUND_THRESHOLD`].
#[inline]
#[must_use]
pub fn is_background(pixel: &Rgba<u8>) -> bool {
    let Rgba([r, g, b, _]) = *pixel;
    r > BACKGROUND_THRESHOLD && g > BACKGROUND_THRESHOLD && b > BACKGROUND_THRESHOLD
}

/// Produce a copy of `image` whose background pixels have alpha 0.
///
/// Subject pixels keep their RGB and alpha. Dimensions never change. If no
/// working surface can be acquired for the image, a warning is logged and an
/// unchanged copy is returned instead of an error.
#[must_use]
pub fn key_white_background(image: &RgbaImage) -> RgbaImage {
    let (width, height) = image.dimensions();
    let mut surface = match Surface::acquire(width, height) {
        Ok(surface) => surface,
        Err(e) => {
            tracing::warn!("keying skipped, returning image unchanged: {e}");
            return image.clone();
        }
    };

    let out = surface.pixels_mut();
    out.copy_from_slice(image.as_raw());
    key_in_place(out);
    surface.into_pixels()
}

#[cfg(feature = "rayon")]
fn key_in_place(buf: &mut [u8]) {
    use rayon::prelude::*;
    buf.par_chunks_exact_mut(4).for_each(key_pixel);
}

#[cfg(not(feature = "rayon"))]
fn key_in_place(buf: &mut [u8]) {
    buf.chunks_exact_mut(4).for_each(key_pixel);
}

#[inline]
fn key_pixel(px: &mut [u8]) {
    if is_background(&Rgba([px[0], px[1], px[2], px[3]])) {
        px[3] = 0;
    }
}
