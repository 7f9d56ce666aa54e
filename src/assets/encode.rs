//! Surface encoding.
//!
//! Turns a finished premultiplied surface back into straight-alpha pixels
//! and serializes them as PNG, JPEG, or lossless WebP bytes.

use base64::Engine as _;
use base64::engine::general_purpose;
use image::{
    ImageEncoder,
    codecs::{jpeg::JpegEncoder, png::PngEncoder, webp::WebPEncoder},
};

use crate::{
    config::OutputFormat,
    foundation::error::{SquarepostError, SquarepostResult},
    surface::Surface,
};

/// JPEG quality used for every export.
pub const JPEG_QUALITY: u8 = 95;

/// Encode `surface` as `format` bytes.
///
/// JPEG drops the alpha channel by compositing over the surface content as-is
/// (frames always start from an opaque base, so this is a plain channel drop).
pub fn encode_surface(surface: &Surface, format: OutputFormat) -> SquarepostResult<Vec<u8>> {
    let width = surface.width();
    let height = surface.height();
    let rgba = unpremultiply_rgba8(surface.data());

    let mut out = Vec::new();
    match format {
        OutputFormat::Png => {
            PngEncoder::new(&mut out)
                .write_image(&rgba, width, height, image::ExtendedColorType::Rgba8)
                .map_err(|e| SquarepostError::Other(anyhow::Error::new(e)))?;
        }
        OutputFormat::Jpeg => {
            let rgb: Vec<u8> = rgba
                .chunks_exact(4)
                .flat_map(|px| [px[0], px[1], px[2]])
                .collect();
            JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY)
                .write_image(&rgb, width, height, image::ExtendedColorType::Rgb8)
                .map_err(|e| SquarepostError::Other(anyhow::Error::new(e)))?;
        }
        OutputFormat::Webp => {
            WebPEncoder::new_lossless(&mut out)
                .write_image(&rgba, width, height, image::ExtendedColorType::Rgba8)
                .map_err(|e| SquarepostError::Other(anyhow::Error::new(e)))?;
        }
    }
    Ok(out)
}

/// Wrap encoded bytes as a `data:` URI for the given format.
pub fn to_data_uri(bytes: &[u8], format: OutputFormat) -> String {
    format!(
        "data:{};base64,{}",
        format.mime(),
        general_purpose::STANDARD.encode(bytes)
    )
}

/// Convert premultiplied RGBA8 to straight alpha.
pub(crate) fn unpremultiply_rgba8(premul: &[u8]) -> Vec<u8> {
    let mut out = premul.to_vec();
    for px in out.chunks_exact_mut(4) {
        let a = px[3];
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
        } else if a != 255 {
            let af = f32::from(a);
            for c in &mut px[..3] {
                *c = (f32::from(*c) * 255.0 / af).round().min(255.0) as u8;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpremultiply_restores_straight_alpha() {
        // 50% alpha mid-red premultiplied: r = 200 * 128/255 ~= 100.
        let premul = [100u8, 0, 0, 128];
        let straight = unpremultiply_rgba8(&premul);
        assert!((i16::from(straight[0]) - 199).abs() <= 1, "{straight:?}");
        assert_eq!(straight[3], 128);
    }

    #[test]
    fn unpremultiply_zeroes_fully_transparent() {
        let straight = unpremultiply_rgba8(&[40, 40, 40, 0]);
        assert_eq!(straight, vec![0, 0, 0, 0]);
    }

    #[test]
    fn encodes_all_formats_and_round_trips_png() {
        let mut s = Surface::with_dims(8, 8).unwrap();
        s.fill([10, 200, 30, 255]);

        for format in [OutputFormat::Png, OutputFormat::Jpeg, OutputFormat::Webp] {
            let bytes = encode_surface(&s, format).unwrap();
            assert!(!bytes.is_empty());
            let decoded = image::load_from_memory(&bytes).unwrap();
            assert_eq!((decoded.width(), decoded.height()), (8, 8));
        }

        let png = encode_surface(&s, OutputFormat::Png).unwrap();
        let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(decoded.get_pixel(4, 4).0, [10, 200, 30, 255]);
    }

    #[test]
    fn png_round_trip_preserves_partial_alpha() {
        let mut s = Surface::with_dims(4, 4).unwrap();
        s.fill([200, 40, 10, 128]);
        assert!(s.has_alpha());

        let png = encode_surface(&s, OutputFormat::Png).unwrap();
        let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
        let px = decoded.get_pixel(2, 2).0;
        assert_eq!(px[3], 128);
        // Unpremultiply round-trips the straight color within quantization.
        assert!((i16::from(px[0]) - 200).abs() <= 1, "{px:?}");
        assert!((i16::from(px[1]) - 40).abs() <= 1, "{px:?}");
        assert!((i16::from(px[2]) - 10).abs() <= 1, "{px:?}");
    }

    #[test]
    fn data_uri_carries_mime_and_base64_payload() {
        let uri = to_data_uri(&[1, 2, 3], OutputFormat::Webp);
        assert!(uri.starts_with("data:image/webp;base64,"));
        let decoded = crate::assets::decode::decode_data_uri(&uri).unwrap();
        assert_eq!(decoded, vec![1, 2, 3]);
    }
}
