//! Squarepost is a batch photo processor for square social-media posts.
//!
//! Each source image is normalized to a square (center-crop for landscape,
//! blur-fill for portrait), run through color filters, composited with a
//! configurable frame (logo, bottom-row images, watermark, caption), and
//! encoded to PNG, JPEG, or WebP. Batches run in parallel and can be packed
//! into a single zip archive.
//!
//! # Pipeline overview
//!
//! 1. **Decode**: bytes or `data:` URI -> [`RasterImage`] (premultiplied RGBA8)
//! 2. **Normalize**: [`square::normalize`] produces the square [`Surface`]
//! 3. **Filter**: [`fx::apply_filters`] applies brightness/contrast/saturation,
//!    blur, and the named filter in a fixed order
//! 4. **Frame**: [`frame::composite`] plus [`CaptionEngine`] draw the overlay
//! 5. **Encode**: [`assets::encode::encode_surface`], format chosen by alpha
//!    unless overridden
//!
//! Key constraints:
//!
//! - **No unsafe**: `unsafe` is forbidden in this crate.
//! - **Premultiplied RGBA8 end-to-end**: straight alpha exists only at the
//!   decode and encode boundaries.
//! - **Per-image fault isolation**: one bad input never fails a batch.
#![forbid(unsafe_code)]

pub mod archive;
pub mod assets;
mod blur;
pub mod config;
pub mod foundation;
pub mod frame;
pub mod fx;
pub mod pipeline;
pub mod square;
pub mod store;
pub mod surface;
pub mod text;

pub use assets::decode::{RasterImage, decode_image, load_raster};
pub use assets::encode::{encode_surface, to_data_uri};
pub use archive::{DEFAULT_ARCHIVE_NAME, build_archive};
pub use config::{
    FilterConfig, FrameConfig, NamedFilter, OutputFormat, PositionPercent, TextConfig,
    TextDirection, WatermarkConfig,
};
pub use foundation::error::{SquarepostError, SquarepostResult};
pub use pipeline::{
    DEFAULT_TARGET_SIZE, MAX_TARGET_SIZE, MIN_TARGET_SIZE, ProcessOptions, ProcessedImage,
    process, process_batch,
};
pub use store::{FsKvStore, KvStore, MemoryKvStore, TemplateEntry, TemplateStore};
pub use surface::Surface;
pub use text::CaptionEngine;
