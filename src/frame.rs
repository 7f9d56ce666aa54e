//! Frame compositor.
//!
//! Layers logo, watermark, and bottom-row images over a normalized square,
//! bottom-to-top in that order (the caption is a separate stage, see
//! [`crate::text`]). An auxiliary asset that fails to decode is skipped with
//! a warning; the remaining layers still draw.

use crate::{
    assets::decode::{self, RasterImage},
    config::FrameConfig,
    foundation::error::SquarepostResult,
    surface::Surface,
};

/// Logo box side as a fraction of target size (long axis, aspect preserved).
pub const LOGO_FRAC: f64 = 0.15;
/// Padding and gutter unit as a fraction of target size.
pub const PADDING_FRAC: f64 = 0.02;
/// Bottom strip height as a fraction of target size.
pub const STRIP_HEIGHT_FRAC: f64 = 0.15;
/// Bottom strip width as a fraction of target size.
pub const STRIP_WIDTH_FRAC: f64 = 0.8;
/// Bottom-row images beyond this count are ignored.
pub const MAX_BOTTOM_IMAGES: usize = 3;

/// Axis-aligned destination rectangle in surface pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FitRect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

/// Draw every configured frame layer onto `surface`.
pub fn composite(surface: &mut Surface, frame: &FrameConfig) -> SquarepostResult<()> {
    let frame = frame.normalized();
    let size = f64::from(surface.width());

    if let Some(logo_ref) = &frame.logo {
        match decode::load_raster(logo_ref) {
            Ok(logo) => draw_logo(surface, &logo, size)?,
            Err(err) => tracing::warn!(%err, "skipping logo layer"),
        }
    }

    if let Some(wm) = &frame.watermark {
        if !wm.image.is_empty() {
            match decode::load_raster(&wm.image) {
                Ok(raster) => {
                    // Stretches to the square box; only logo and bottom
                    // images preserve aspect ratio.
                    let box_size = size * f64::from(wm.size) / 100.0;
                    let cx = f64::from(wm.position.x) / 100.0 * size;
                    let cy = f64::from(wm.position.y) / 100.0 * size;
                    // Opacity is scoped to this one draw call.
                    surface.draw_raster(
                        &raster,
                        cx - box_size / 2.0,
                        cy - box_size / 2.0,
                        box_size,
                        box_size,
                        wm.opacity,
                    )?;
                }
                Err(err) => tracing::warn!(%err, "skipping watermark layer"),
            }
        }
    }

    if !frame.bottom_images.is_empty() {
        draw_bottom_images(surface, &frame.bottom_images, size)?;
    }

    Ok(())
}

fn draw_logo(surface: &mut Surface, logo: &RasterImage, size: f64) -> SquarepostResult<()> {
    let padding = size * PADDING_FRAC;
    let box_size = size * LOGO_FRAC;
    let (w, h) = fit_long_axis(logo.width, logo.height, box_size);
    surface.draw_raster(logo, padding, padding, w, h, 1.0)
}

fn draw_bottom_images(
    surface: &mut Surface,
    refs: &[String],
    size: f64,
) -> SquarepostResult<()> {
    let count = refs.len().min(MAX_BOTTOM_IMAGES);
    let strip_h = size * STRIP_HEIGHT_FRAC;
    let strip_w = size * STRIP_WIDTH_FRAC;
    let gutter = size * PADDING_FRAC;
    let strip_x = (size - strip_w) / 2.0;
    let strip_y = size - strip_h - gutter;
    let cell_w = (strip_w - gutter * (count as f64 - 1.0)) / count as f64;

    for (i, raster_ref) in refs.iter().take(count).enumerate() {
        let raster = match decode::load_raster(raster_ref) {
            Ok(r) => r,
            Err(err) => {
                tracing::warn!(%err, index = i, "skipping bottom image");
                continue;
            }
        };
        let cell = FitRect {
            x: strip_x + i as f64 * (cell_w + gutter),
            y: strip_y,
            w: cell_w,
            h: strip_h,
        };
        let dst = fit_rect(raster.width, raster.height, cell);
        surface.draw_raster(&raster, dst.x, dst.y, dst.w, dst.h, 1.0)?;
    }
    Ok(())
}

/// Scale `(img_w, img_h)` so its longer axis equals `box_size`, preserving
/// aspect ratio.
pub(crate) fn fit_long_axis(img_w: u32, img_h: u32, box_size: f64) -> (f64, f64) {
    let (w, h) = (f64::from(img_w.max(1)), f64::from(img_h.max(1)));
    if w >= h {
        (box_size, box_size * h / w)
    } else {
        (box_size * w / h, box_size)
    }
}

/// Aspect-fit `(img_w, img_h)` inside `cell`, centered in the leftover space.
pub(crate) fn fit_rect(img_w: u32, img_h: u32, cell: FitRect) -> FitRect {
    let (w, h) = (f64::from(img_w.max(1)), f64::from(img_h.max(1)));
    let scale = (cell.w / w).min(cell.h / h);
    let (fit_w, fit_h) = (w * scale, h * scale);
    FitRect {
        x: cell.x + (cell.w - fit_w) / 2.0,
        y: cell.y + (cell.h - fit_h) / 2.0,
        w: fit_w,
        h: fit_h,
    }
}
