//! End-to-end processing pipeline.
//!
//! One image flows normalize -> filters -> frame -> caption -> encode. The
//! batch entry point fans the per-image work out over rayon and keeps input
//! order; a decode failure poisons only its own slot.

use rayon::prelude::*;

use crate::{
    assets::{decode, encode},
    config::{FilterConfig, FrameConfig, OutputFormat},
    foundation::error::{SquarepostError, SquarepostResult},
    fx, frame, square,
    text::CaptionEngine,
};

/// Default output side length in pixels.
pub const DEFAULT_TARGET_SIZE: u32 = 1080;
/// Smallest accepted output side length.
pub const MIN_TARGET_SIZE: u32 = 300;
/// Largest accepted output side length.
pub const MAX_TARGET_SIZE: u32 = 2000;

/// Knobs shared by every image in a batch.
#[derive(Clone, Debug)]
pub struct ProcessOptions {
    /// Output side length in pixels, clamped to [300, 2000].
    pub target_size: u32,
    /// Forces every image to this format instead of choosing by alpha.
    pub format: Option<OutputFormat>,
    pub filters: FilterConfig,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            target_size: DEFAULT_TARGET_SIZE,
            format: None,
            filters: FilterConfig::default(),
        }
    }
}

impl ProcessOptions {
    pub fn normalized(&self) -> Self {
        Self {
            target_size: self.target_size.clamp(MIN_TARGET_SIZE, MAX_TARGET_SIZE),
            format: self.format,
            filters: self.filters.normalized(),
        }
    }
}

/// Encoded output for one source image.
#[derive(Clone, Debug)]
pub struct ProcessedImage {
    pub bytes: Vec<u8>,
    pub format: OutputFormat,
    /// Whether the rendered surface still carried transparency before
    /// encoding. Decides PNG vs JPEG when no format override is set.
    pub has_alpha: bool,
}

impl ProcessedImage {
    pub fn data_uri(&self) -> String {
        encode::to_data_uri(&self.bytes, self.format)
    }
}

/// Process one decoded source image through the full pipeline.
#[tracing::instrument(skip_all, fields(w = source.width, h = source.height))]
pub fn process(
    source: &decode::RasterImage,
    frame_cfg: &FrameConfig,
    opts: &ProcessOptions,
) -> SquarepostResult<ProcessedImage> {
    let opts = opts.normalized();

    let mut surface = square::normalize(source, opts.target_size)?;
    fx::apply_filters(&mut surface, &opts.filters)?;
    if !frame_cfg.is_empty() {
        frame::composite(&mut surface, frame_cfg)?;
        if let Some(text) = &frame_cfg.text {
            CaptionEngine::new().draw_caption(&mut surface, text)?;
        }
    }

    let has_alpha = surface.has_alpha();
    let format = opts.format.unwrap_or(if has_alpha {
        OutputFormat::Png
    } else {
        OutputFormat::Jpeg
    });
    let bytes = encode::encode_surface(&surface, format)?;
    tracing::debug!(?format, out_bytes = bytes.len(), "image processed");

    Ok(ProcessedImage {
        bytes,
        format,
        has_alpha,
    })
}

/// Process a batch of encoded images in parallel.
///
/// Returns one result per input, in input order. Fails up front with
/// [`SquarepostError::MissingConfig`] when no frame configuration is given;
/// per-image decode or render failures stay inside their own slot.
pub fn process_batch(
    inputs: &[Vec<u8>],
    frame_cfg: Option<&FrameConfig>,
    opts: &ProcessOptions,
) -> SquarepostResult<Vec<SquarepostResult<ProcessedImage>>> {
    let frame_cfg = frame_cfg
        .ok_or_else(|| SquarepostError::missing_config("no frame configuration selected"))?;
    let opts = opts.normalized();

    tracing::info!(count = inputs.len(), size = opts.target_size, "processing batch");
    let results = inputs
        .par_iter()
        .map(|bytes| {
            let source = decode::decode_image(bytes)?;
            process(&source, frame_cfg, &opts)
        })
        .collect();
    Ok(results)
}
