use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose};

use crate::foundation::error::{SquarepostError, SquarepostResult};

/// Decoded, premultiplied source raster.
///
/// Immutable once decoded; the pipeline only reads it. Pixel data is
/// premultiplied RGBA8 so it can feed [`crate::surface::Surface`] draws
/// without further conversion.
#[derive(Clone)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    rgba8_premul: Arc<Vec<u8>>,
}

impl std::fmt::Debug for RasterImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.rgba8_premul.len())
            .finish()
    }
}

impl RasterImage {
    /// Build from straight-alpha RGBA8 pixels (premultiplies internally).
    pub fn from_rgba8(width: u32, height: u32, mut rgba8: Vec<u8>) -> SquarepostResult<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(4))
            .ok_or_else(|| SquarepostError::validation("raster size overflow"))?;
        if rgba8.len() != expected {
            return Err(SquarepostError::validation(
                "from_rgba8 expects width*height*4 bytes",
            ));
        }
        premultiply_rgba8_in_place(&mut rgba8);
        Ok(Self {
            width,
            height,
            rgba8_premul: Arc::new(rgba8),
        })
    }

    /// Premultiplied RGBA8 pixel data, row-major.
    pub fn data(&self) -> &[u8] {
        &self.rgba8_premul
    }

    pub fn is_portrait(&self) -> bool {
        self.height > self.width
    }
}

/// Decode an encoded image (PNG/JPEG/WEBP/GIF) into a premultiplied raster.
pub fn decode_image(bytes: &[u8]) -> SquarepostResult<RasterImage> {
    let dyn_img = image::load_from_memory(bytes)
        .map_err(|e| SquarepostError::decode(format!("decode image from memory: {e}")))?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);

    Ok(RasterImage {
        width,
        height,
        rgba8_premul: Arc::new(rgba8_premul),
    })
}

/// Resolve a RasterRef to a decoded raster.
///
/// A RasterRef is a `data:` URI in persisted configurations; the CLI also
/// passes plain filesystem paths through here.
pub fn load_raster(raster_ref: &str) -> SquarepostResult<RasterImage> {
    let bytes = if raster_ref.starts_with("data:") {
        decode_data_uri(raster_ref)?
    } else {
        std::fs::read(raster_ref)
            .map_err(|e| SquarepostError::decode(format!("read '{raster_ref}': {e}")))?
    };
    decode_image(&bytes)
}

/// Extract the raw bytes from a base64 `data:` URI.
pub fn decode_data_uri(uri: &str) -> SquarepostResult<Vec<u8>> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| SquarepostError::decode("not a data URI"))?;
    let (_, payload) = rest
        .split_once(";base64,")
        .ok_or_else(|| SquarepostError::decode("data URI is not base64-encoded"))?;
    general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| SquarepostError::decode(format!("data URI base64: {e}")))
}

pub(crate) fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 255 {
            continue;
        }
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn png_bytes(rgba: Vec<u8>, w: u32, h: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_raw(w, h, rgba).unwrap();
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn decode_image_png_dimensions_and_premul() {
        let buf = png_bytes(vec![100, 50, 200, 128], 1, 1);
        let raster = decode_image(&buf).unwrap();
        assert_eq!(raster.width, 1);
        assert_eq!(raster.height, 1);
        assert_eq!(
            raster.data(),
            &[
                ((100u16 * 128 + 127) / 255) as u8,
                ((50u16 * 128 + 127) / 255) as u8,
                ((200u16 * 128 + 127) / 255) as u8,
                128u8
            ]
        );
    }

    #[test]
    fn decode_image_garbage_is_decode_error() {
        let err = decode_image(b"not an image").unwrap_err();
        assert!(matches!(err, SquarepostError::Decode(_)));
    }

    #[test]
    fn load_raster_accepts_data_uri() {
        let buf = png_bytes(vec![10, 20, 30, 255], 1, 1);
        let uri = format!(
            "data:image/png;base64,{}",
            general_purpose::STANDARD.encode(&buf)
        );
        let raster = load_raster(&uri).unwrap();
        assert_eq!((raster.width, raster.height), (1, 1));
    }

    #[test]
    fn decode_data_uri_rejects_non_base64() {
        assert!(decode_data_uri("data:image/png,plain").is_err());
        assert!(decode_data_uri("http://example/x.png").is_err());
    }

    #[test]
    fn from_rgba8_validates_length() {
        assert!(RasterImage::from_rgba8(2, 2, vec![0u8; 3]).is_err());
        let r = RasterImage::from_rgba8(1, 2, vec![255u8; 8]).unwrap();
        assert!(r.is_portrait());
    }
}
