//! Zip export.
//!
//! Packs processed images into a single archive with `image-N.<ext>` entry
//! names. Entries are stored uncompressed since every payload is already a
//! compressed image format.

use std::io::{Cursor, Write as _};

use zip::{CompressionMethod, ZipWriter, write::SimpleFileOptions};

use crate::{
    foundation::error::{SquarepostError, SquarepostResult},
    pipeline::ProcessedImage,
};

/// Suggested filename for the produced archive.
pub const DEFAULT_ARCHIVE_NAME: &str = "processed-images.zip";

/// Build a zip archive from `images`, preserving order.
///
/// Entry names are 1-based: `image-1.jpg`, `image-2.png`, and so on. An empty
/// slice returns [`SquarepostError::EmptyExport`].
pub fn build_archive(images: &[ProcessedImage]) -> SquarepostResult<Vec<u8>> {
    if images.is_empty() {
        return Err(SquarepostError::EmptyExport);
    }

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

    for (i, image) in images.iter().enumerate() {
        let name = format!("image-{}.{}", i + 1, image.format.extension());
        writer
            .start_file(&name, options)
            .map_err(|e| SquarepostError::Other(anyhow::Error::new(e)))?;
        writer
            .write_all(&image.bytes)
            .map_err(|e| SquarepostError::Other(anyhow::Error::new(e)))?;
    }

    let cursor = writer
        .finish()
        .map_err(|e| SquarepostError::Other(anyhow::Error::new(e)))?;
    tracing::debug!(entries = images.len(), bytes = cursor.get_ref().len(), "archive built");
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputFormat;

    fn fake(format: OutputFormat, bytes: &[u8]) -> ProcessedImage {
        ProcessedImage {
            bytes: bytes.to_vec(),
            format,
            has_alpha: format == OutputFormat::Png,
        }
    }

    #[test]
    fn empty_batch_is_rejected() {
        assert!(matches!(
            build_archive(&[]),
            Err(SquarepostError::EmptyExport)
        ));
    }

    #[test]
    fn entries_are_numbered_with_format_extensions() {
        let images = vec![
            fake(OutputFormat::Jpeg, b"jjj"),
            fake(OutputFormat::Png, b"ppp"),
            fake(OutputFormat::Webp, b"www"),
        ];
        let bytes = build_archive(&images).unwrap();

        let mut zip = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(zip.len(), 3);
        let names: Vec<String> = (0..zip.len())
            .map(|i| zip.by_index(i).unwrap().name().to_string())
            .collect();
        assert_eq!(names, ["image-1.jpg", "image-2.png", "image-3.webp"]);

        use std::io::Read as _;
        let mut payload = Vec::new();
        zip.by_name("image-2.png")
            .unwrap()
            .read_to_end(&mut payload)
            .unwrap();
        assert_eq!(payload, b"ppp");
    }
}
