//! Subject bounding-box detection.
//!
//! Scans every pixel of a raster and reports the tightest axis-aligned box
//! around the pixels that are not near-white background.

use image::RgbaImage;

use crate::keying::is_background;

/// Axis-aligned pixel rectangle.
///
/// `width` and `height` are the distance between the extreme subject pixels,
/// so a lone pixel produces a box of zero width and height.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    /// Leftmost subject column.
    pub x: u32,
    /// Topmost subject row.
    pub y: u32,
    /// Rightmost minus leftmost subject column.
    pub width: u32,
    /// Bottom minus top subject row.
    pub height: u32,
}

/// Find the box enclosing all non-background pixels.
///
/// Returns `None` when every pixel is background. The scan always covers the
/// full image at full resolution.
#[must_use]
pub fn find_subject_bounds(image: &RgbaImage) -> Option<BoundingBox> {
    let (width, height) = image.dimensions();
    // [min_x, min_y, max_x, max_y]
    let mut bounds = [width, height, 0, 0];
    let mut found = false;

    for (x, y, pixel) in image.enumerate_pixels() {
        if !is_background(pixel) {
            update_bounds(&mut bounds, x, y);
            found = true;
        }
    }

    found.then(|| BoundingBox {
        x: bounds[0],
        y: bounds[1],
        width: bounds[2] - bounds[0],
        height: bounds[3] - bounds[1],
    })
}

fn update_bounds(bounds: &mut [u32; 4], x: u32, y: u32) {
    bounds[0] = bounds[0].min(x);
    bounds[1] = bounds[1].min(y);
    bounds[2] = bounds[2].max(x);
    bounds[3] = bounds[3].max(y);
}

#[cfg(test)]
mod tests {
    use image::Rgba;

    use super::*;

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
    const INK: Rgba<u8> = Rgba([20, 20, 20, 255]);

    #[test]
    fn all_background_is_not_found() {
        let image = RgbaImage::from_pixel(16, 9, WHITE);
        assert_eq!(find_subject_bounds(&image), None);
    }

    #[test]
    fn single_pixel_gives_zero_area_box() {
        let mut image = RgbaImage::from_pixel(10, 10, WHITE);
        image.put_pixel(5, 5, INK);
        assert_eq!(
            find_subject_bounds(&image),
            Some(BoundingBox {
                x: 5,
                y: 5,
                width: 0,
                height: 0
            })
        );
    }

    #[test]
    fn full_subject_spans_whole_canvas() {
        let image = RgbaImage::from_pixel(7, 4, INK);
        assert_eq!(
            find_subject_bounds(&image),
            Some(BoundingBox {
                x: 0,
                y: 0,
                width: 6,
                height: 3
            })
        );
    }

    #[test]
    fn scattered_pixels_are_enclosed() {
        let mut image = RgbaImage::from_pixel(20, 20, WHITE);
        image.put_pixel(3, 12, INK);
        image.put_pixel(15, 4, INK);
        image.put_pixel(9, 17, INK);
        assert_eq!(
            find_subject_bounds(&image),
            Some(BoundingBox {
                x: 3,
                y: 4,
                width: 12,
                height: 13
            })
        );
    }

    #[test]
    fn transparent_dark_pixels_still_count_as_subject() {
        let mut image = RgbaImage::from_pixel(4, 4, WHITE);
        image.put_pixel(1, 2, Rgba([0, 0, 0, 0]));
        assert_eq!(
            find_subject_bounds(&image).map(|b| (b.x, b.y)),
            Some((1, 2))
        );
    }
}
