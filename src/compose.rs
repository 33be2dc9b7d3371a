//! Frame composition: background fill, border stroke, centered subject.

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::map::map_colors;
use imageproc::rect::Rect;

use crate::color::ColorSpec;
use crate::config::CatalogConfig;
use crate::error::Result;
use crate::surface::Surface;

/// Where and how large the subject lands on a square frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameLayout {
    /// Edge length of the square canvas.
    pub canvas_size: u32,
    /// Border stroke thickness in pixels.
    pub border_thickness: u32,
    /// Uniform factor applied to the subject.
    pub scale: f64,
    /// Subject width on the canvas.
    pub draw_width: u32,
    /// Subject height on the canvas.
    pub draw_height: u32,
    /// Left edge of the subject on the canvas.
    pub offset_x: u32,
    /// Top edge of the subject on the canvas.
    pub offset_y: u32,
}

impl FrameLayout {
    /// Fit a `subject_width` x `subject_height` subject into a square canvas.
    ///
    /// The scale is `min(L*P / w, L*P / h)` so the longer side fills the
    /// `L*P` envelope and aspect ratio is preserved. Drawn sizes are rounded
    /// to whole pixels and clamped to the envelope; offsets center the
    /// subject, rounding down. A subject with a zero edge, or a zero canvas,
    /// gets a zero-sized draw area.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::similar_names
    )]
    pub fn fit(
        canvas_size: u32,
        product_scale: f64,
        border_fraction: f64,
        subject_width: u32,
        subject_height: u32,
    ) -> Self {
        let edge = f64::from(canvas_size);
        let border_thickness = ((edge * border_fraction).round().max(0.0) as u32).min(canvas_size);

        let inner = edge * product_scale;
        if canvas_size == 0 || subject_width == 0 || subject_height == 0 {
            return Self {
                canvas_size,
                border_thickness,
                scale: 0.0,
                draw_width: 0,
                draw_height: 0,
                offset_x: canvas_size / 2,
                offset_y: canvas_size / 2,
            };
        }

        let scale = (inner / f64::from(subject_width)).min(inner / f64::from(subject_height));
        // the epsilon keeps 679.9999.. from flooring a pixel short
        let envelope = ((inner + 1e-9).floor() as u32).clamp(1, canvas_size.max(1));
        let fit = |len: u32| ((f64::from(len) * scale).round() as u32).clamp(1, envelope);
        let draw_width = fit(subject_width);
        let draw_height = fit(subject_height);

        Self {
            canvas_size,
            border_thickness,
            scale,
            draw_width,
            draw_height,
            offset_x: (canvas_size - draw_width) / 2,
            offset_y: (canvas_size - draw_height) / 2,
        }
    }
}

/// Compose one finished frame onto `surface`.
///
/// The surface is resized to the configured canvas, filled with `background`,
/// stroked with a `border` band whose outer edge is the canvas edge, and the
/// subject is scaled and alpha-blended at the center. Every output pixel is
/// opaque.
///
/// # Errors
///
/// Returns [`crate::Error::SurfaceAcquisition`] when the canvas cannot be
/// allocated. There is no fallback.
pub fn compose_frame(
    surface: &mut Surface,
    subject: &RgbaImage,
    background: ColorSpec,
    border: ColorSpec,
    config: &CatalogConfig,
) -> Result<FrameLayout> {
    let size = config.canvas_size;
    surface.ensure(size, size)?;
    surface.fill(background.to_rgba());

    let layout = FrameLayout::fit(
        size,
        config.product_scale,
        config.border_fraction,
        subject.width(),
        subject.height(),
    );
    stroke_border(surface, layout.border_thickness, border);

    if layout.draw_width > 0 && layout.draw_height > 0 {
        // resample premultiplied so keyed-out white cannot bleed into the edges
        let premultiplied = map_colors(subject, premultiply);
        let scaled = imageops::resize(
            &premultiplied,
            layout.draw_width,
            layout.draw_height,
            FilterType::Triangle,
        );
        blend_premultiplied(
            surface.pixels_mut(),
            &scaled,
            layout.offset_x,
            layout.offset_y,
        );
    }

    Ok(layout)
}

#[allow(clippy::cast_possible_truncation)]
fn premultiply(Rgba([red, green, blue, alpha]): Rgba<u8>) -> Rgba<u8> {
    let scale = |c: u8| ((u16::from(c) * u16::from(alpha) + 127) / 255) as u8;
    Rgba([scale(red), scale(green), scale(blue), alpha])
}

/// Porter-Duff "over" of a premultiplied `top` onto an opaque `canvas`.
///
/// `top` must fit inside `canvas` at (`x0`, `y0`).
#[allow(clippy::cast_possible_truncation)]
fn blend_premultiplied(canvas: &mut RgbaImage, top: &RgbaImage, x0: u32, y0: u32) {
    for (x, y, src) in top.enumerate_pixels() {
        let alpha = src[3];
        let keep = 255 - u16::from(alpha);
        let dst = canvas.get_pixel_mut(x0 + x, y0 + y);
        for (d, &s) in dst.0.iter_mut().zip(&src.0).take(3) {
            let under = (u16::from(*d) * keep + 127) / 255;
            *d = (u16::from(s.min(alpha)) + under).min(255) as u8;
        }
        dst[3] = u8::MAX;
    }
}

/// Paint the four sides of a square frame `thickness` pixels wide.
///
/// Same coverage as stroking the rectangle inset by `thickness / 2` with a
/// `thickness` line width.
#[allow(clippy::cast_possible_wrap)]
fn stroke_border(surface: &mut Surface, thickness: u32, color: ColorSpec) {
    let size = surface.width();
    if thickness == 0 || size == 0 {
        return;
    }
    let band = thickness.min(size);
    let far = (size - band) as i32;
    let color = color.to_rgba();

    for rect in [
        Rect::at(0, 0).of_size(size, band),
        Rect::at(0, far).of_size(size, band),
        Rect::at(0, 0).of_size(band, size),
        Rect::at(far, 0).of_size(band, size),
    ] {
        draw_filled_rect_mut(surface.pixels_mut(), rect, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgba<u8> = Rgba([200, 30, 30, 255]);

    fn small_config() -> CatalogConfig {
        CatalogConfig {
            canvas_size: 100,
            ..CatalogConfig::default()
        }
    }

    #[test]
    fn worked_example_layout() {
        let layout = FrameLayout::fit(1000, 0.68, 0.07, 500, 300);
        assert!((layout.scale - 1.36).abs() < 1e-12);
        assert_eq!((layout.draw_width, layout.draw_height), (680, 408));
        assert_eq!((layout.offset_x, layout.offset_y), (160, 296));
        assert_eq!(layout.border_thickness, 70);
    }

    #[test]
    fn small_subjects_are_upscaled_into_the_envelope() {
        let layout = FrameLayout::fit(1000, 0.68, 0.07, 10, 20);
        assert_eq!((layout.draw_width, layout.draw_height), (340, 680));
        assert_eq!((layout.offset_x, layout.offset_y), (330, 160));
    }

    #[test]
    fn zero_sized_subject_draws_nothing() {
        let layout = FrameLayout::fit(1000, 0.68, 0.07, 0, 50);
        assert_eq!((layout.draw_width, layout.draw_height), (0, 0));
    }

    #[test]
    fn output_is_square_for_any_aspect_ratio() {
        let config = small_config();
        let mut surface = Surface::acquire(1, 1).unwrap();
        for (w, h) in [(64, 64), (160, 90), (90, 160), (1, 100)] {
            let subject = RgbaImage::from_pixel(w, h, RED);
            let layout = compose_frame(
                &mut surface,
                &subject,
                ColorSpec::from_hex(0x264653),
                ColorSpec::from_hex(0xffffff),
                &config,
            )
            .unwrap();
            assert_eq!((surface.width(), surface.height()), (100, 100));
            assert!(layout.draw_width <= 68 && layout.draw_height <= 68);
            assert_eq!(layout.draw_width.max(layout.draw_height), 68);
        }
    }

    #[test]
    fn frame_has_border_background_and_centered_subject() {
        let config = small_config();
        let mut surface = Surface::acquire(100, 100).unwrap();
        let background = ColorSpec::from_hex(0x2a9d8f);
        let border = ColorSpec::from_hex(0xffeb3b);
        let subject = RgbaImage::from_pixel(40, 40, RED);

        let layout = compose_frame(&mut surface, &subject, background, border, &config).unwrap();
        let px = surface.pixels();

        assert_eq!(layout.border_thickness, 7);
        for (x, y) in [(0, 0), (99, 99), (6, 50), (50, 93), (93, 10)] {
            assert_eq!(px.get_pixel(x, y), &border.to_rgba(), "border at ({x},{y})");
        }
        for (x, y) in [(7, 50), (50, 92), (10, 10)] {
            assert_eq!(px.get_pixel(x, y), &background.to_rgba(), "fill at ({x},{y})");
        }
        assert_eq!(px.get_pixel(50, 50), &RED);
        assert!(px.pixels().all(|p| p[3] == 255));
    }

    #[test]
    fn transparent_subject_pixels_show_the_background() {
        let config = small_config();
        let mut surface = Surface::acquire(100, 100).unwrap();
        let background = ColorSpec::from_hex(0xd62828);
        let subject = RgbaImage::from_pixel(10, 10, Rgba([255, 255, 255, 0]));

        compose_frame(
            &mut surface,
            &subject,
            background,
            ColorSpec::from_hex(0x000000),
            &config,
        )
        .unwrap();
        assert_eq!(surface.pixels().get_pixel(50, 50), &background.to_rgba());
    }

    /// Left half opaque product, right half keyed-out white.
    fn half_keyed_subject() -> RgbaImage {
        RgbaImage::from_fn(4, 2, |x, _| {
            if x < 2 {
                Rgba([200, 30, 40, 255])
            } else {
                Rgba([255, 255, 255, 0])
            }
        })
    }

    #[test]
    fn keyed_edges_leave_no_white_fringe() {
        let config = small_config();
        let mut surface = Surface::acquire(100, 100).unwrap();
        let black = ColorSpec::from_hex(0x000000);

        compose_frame(&mut surface, &half_keyed_subject(), black, black, &config).unwrap();

        let (max_g, max_b) = surface
            .pixels()
            .pixels()
            .fold((0, 0), |(g, b), p| (g.max(p[1]), b.max(p[2])));
        assert!(max_g <= 30 && max_b <= 40, "fringe: g {max_g}, b {max_b}");
        // the edge is actually blended, not cut hard
        assert!(surface
            .pixels()
            .pixels()
            .any(|p| p[0] > 0 && p[0] < 200));
    }

    #[test]
    fn edge_pixels_mix_subject_and_background_only() {
        let config = small_config();
        let mut surface = Surface::acquire(100, 100).unwrap();
        let background = ColorSpec::from_hex(0x2a9d8f);

        let layout = compose_frame(
            &mut surface,
            &half_keyed_subject(),
            background,
            background,
            &config,
        )
        .unwrap();

        let Rgba(bg) = background.to_rgba();
        let product = [200u8, 30, 40];
        let y = layout.offset_y + layout.draw_height / 2;
        for x in layout.offset_x..layout.offset_x + layout.draw_width {
            let px = surface.pixels().get_pixel(x, y);
            for ((&value, &b), &p) in px.0.iter().zip(&bg).zip(&product) {
                let low = b.min(p).saturating_sub(2);
                let high = b.max(p).saturating_add(2);
                assert!(
                    (low..=high).contains(&value),
                    "{px:?} at x={x} leaves {low}..={high}"
                );
            }
        }
    }

    #[test]
    fn zero_canvas_gets_an_empty_layout() {
        let layout = FrameLayout::fit(0, 0.68, 0.07, 10, 10);
        assert_eq!((layout.draw_width, layout.draw_height), (0, 0));
        assert_eq!((layout.offset_x, layout.offset_y), (0, 0));
        assert_eq!(layout.border_thickness, 0);
    }

    #[test]
    fn oversized_canvas_is_a_hard_failure() {
        let config = CatalogConfig {
            canvas_size: 40_000,
            ..CatalogConfig::default()
        };
        let mut surface = Surface::acquire(1, 1).unwrap();
        let subject = RgbaImage::from_pixel(2, 2, RED);
        let result = compose_frame(
            &mut surface,
            &subject,
            ColorSpec::from_hex(0xffffff),
            ColorSpec::from_hex(0x000000),
            &config,
        );
        assert!(matches!(
            result,
            Err(crate::Error::SurfaceAcquisition { width: 40_000, .. })
        ));
    }
}
