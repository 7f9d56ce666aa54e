//! Square normalizer.
//!
//! Forces an arbitrary source raster into a fixed-size square surface.
//! Landscape and square sources center-crop-and-scale; portrait sources
//! scale to fit height over a blurred, edge-filling copy of themselves.

use crate::{
    assets::decode::RasterImage,
    blur,
    foundation::error::SquarepostResult,
    surface::Surface,
};

/// Target size at which [`BACKGROUND_BLUR_PX`] is specified; the effective
/// sigma scales linearly with the actual target size.
pub const REFERENCE_SIZE: f64 = 1080.0;

/// Background blur strength for portrait sources, in pixels at
/// [`REFERENCE_SIZE`].
pub const BACKGROUND_BLUR_PX: f64 = 20.0;

/// Normalize `source` onto a `size`×`size` surface.
///
/// The base is filled white first so fully opaque output (and hence JPEG
/// encoding) is the common case.
pub fn normalize(source: &RasterImage, size: u32) -> SquarepostResult<Surface> {
    let mut surface = Surface::new(size)?;
    surface.fill([255, 255, 255, 255]);

    let target = f64::from(size);
    let (w, h) = (f64::from(source.width), f64::from(source.height));

    if source.is_portrait() {
        // Blurred cover-scaled background filling the whole square.
        let fill_scale = (target / w).max(target / h);
        let (fill_w, fill_h) = (w * fill_scale, h * fill_scale);
        surface.draw_raster(
            source,
            (target - fill_w) / 2.0,
            (target - fill_h) / 2.0,
            fill_w,
            fill_h,
            1.0,
        )?;

        let sigma = (BACKGROUND_BLUR_PX * target / REFERENCE_SIZE) as f32;
        let blurred = blur::blur_rgba8_premul(
            surface.data(),
            size,
            size,
            blur::radius_for_sigma(sigma),
            sigma,
        )?;
        surface.data_mut().copy_from_slice(&blurred);

        // Sharp copy scaled to full height, horizontally centered.
        let fit_scale = target / h;
        let fit_w = w * fit_scale;
        surface.draw_raster(source, (target - fit_w) / 2.0, 0.0, fit_w, target, 1.0)?;
    } else {
        // Center crop: scale so the short axis fills the square; the long
        // axis overflows and is clipped by the surface bounds.
        let scale = target / w.min(h);
        let (scaled_w, scaled_h) = (w * scale, h * scale);
        surface.draw_raster(
            source,
            (target - scaled_w) / 2.0,
            (target - scaled_h) / 2.0,
            scaled_w,
            scaled_h,
            1.0,
        )?;
    }

    Ok(surface)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(w: u32, h: u32, rgba: [u8; 4]) -> RasterImage {
        RasterImage::from_rgba8(w, h, rgba.to_vec().repeat((w * h) as usize)).unwrap()
    }

    fn px(s: &Surface, x: u32, y: u32) -> [u8; 4] {
        let i = ((y * s.width() + x) * 4) as usize;
        let d = s.data();
        [d[i], d[i + 1], d[i + 2], d[i + 3]]
    }

    #[test]
    fn square_source_fills_exactly_without_blur() {
        let src = solid(6, 6, [0, 200, 0, 255]);
        let out = normalize(&src, 64).unwrap();
        assert_eq!((out.width(), out.height()), (64, 64));
        // Every pixel is the plain scaled source; no white base or blur halo
        // survives anywhere, including the corners.
        for (x, y) in [(0, 0), (63, 0), (32, 32), (0, 63), (63, 63)] {
            let p = px(&out, x, y);
            assert!(p[1] > 180 && p[0] < 40 && p[2] < 40, "pixel {x},{y}: {p:?}");
        }
    }

    #[test]
    fn landscape_center_crops_both_sides_equally() {
        // Left half red, right half blue; after the center crop the output
        // midline must still sit on the color boundary.
        let (w, h) = (16u32, 8u32);
        let mut data = Vec::with_capacity((w * h * 4) as usize);
        for _y in 0..h {
            for x in 0..w {
                if x < w / 2 {
                    data.extend_from_slice(&[255, 0, 0, 255]);
                } else {
                    data.extend_from_slice(&[0, 0, 255, 255]);
                }
            }
        }
        let src = RasterImage::from_rgba8(w, h, data).unwrap();
        let out = normalize(&src, 64).unwrap();

        let left = px(&out, 8, 32);
        let right = px(&out, 55, 32);
        assert!(left[0] > 180 && left[2] < 60, "left: {left:?}");
        assert!(right[2] > 180 && right[0] < 60, "right: {right:?}");
    }

    #[test]
    fn portrait_fills_margins_with_blurred_source() {
        let src = solid(4, 8, [200, 30, 30, 255]);
        let out = normalize(&src, 64).unwrap();

        // Sharp strip covers the middle; margins carry the blurred source,
        // not the white base and not transparency.
        let center = px(&out, 32, 32);
        let margin = px(&out, 2, 32);
        assert!(center[0] > 150 && center[1] < 80, "center: {center:?}");
        assert!(margin[0] > 120 && margin[1] < 110, "margin: {margin:?}");
        assert_eq!(margin[3], 255);
    }

    #[test]
    fn output_is_fully_opaque_even_for_transparent_sources() {
        let src = solid(4, 4, [10, 10, 10, 0]);
        let out = normalize(&src, 32).unwrap();
        assert!(!out.has_alpha());
    }
}
