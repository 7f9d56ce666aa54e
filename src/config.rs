//! Plain-data configuration model.
//!
//! Everything here is a serde-friendly value type: the UI (or CLI) builds these,
//! the pipeline reads them, and [`crate::store`] persists them as JSON. Field
//! names serialize as camelCase so persisted blobs and the template
//! export/import file keep one stable shape.
//!
//! All numeric knobs have documented ranges; `normalized()` clamps out-of-range
//! values instead of erroring, so a stale or hand-edited config never aborts a
//! batch.

/// Named color filter applied after the numeric adjustments.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamedFilter {
    /// No named filter; contributes no transform.
    #[default]
    None,
    Grayscale,
    Sepia,
}

/// Color/blur adjustments for one pipeline invocation.
///
/// Percent fields use 100 as identity; `blur` is in pixels at target-size
/// scale. Defaults are the identity configuration.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterConfig {
    /// 0..=200 percent, 100 = identity.
    pub brightness: f32,
    /// 0..=200 percent, 100 = identity.
    pub contrast: f32,
    /// 0..=200 percent, 100 = identity.
    pub saturation: f32,
    /// 0..=10 pixels, fractional allowed, 0 = identity.
    pub blur: f32,
    pub filter: NamedFilter,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            brightness: 100.0,
            contrast: 100.0,
            saturation: 100.0,
            blur: 0.0,
            filter: NamedFilter::None,
        }
    }
}

impl FilterConfig {
    /// Copy with every field clamped to its documented range.
    pub fn normalized(self) -> Self {
        Self {
            brightness: clamp_finite(self.brightness, 0.0, 200.0, 100.0),
            contrast: clamp_finite(self.contrast, 0.0, 200.0, 100.0),
            saturation: clamp_finite(self.saturation, 0.0, 200.0, 100.0),
            blur: clamp_finite(self.blur, 0.0, 10.0, 0.0),
            filter: self.filter,
        }
    }

    /// True when applying this config would change nothing.
    pub fn is_identity(&self) -> bool {
        let n = self.normalized();
        n.brightness == 100.0
            && n.contrast == 100.0
            && n.saturation == 100.0
            && n.blur == 0.0
            && n.filter == NamedFilter::None
    }
}

/// Caption alignment direction: `Rtl` anchors the caption bottom-right
/// instead of bottom-left. Run order inside the text follows Unicode
/// content detection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextDirection {
    #[default]
    Ltr,
    Rtl,
}

/// Caption drawn over the composited square.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextConfig {
    pub text: String,
    pub direction: TextDirection,
    /// Installed font family name; silently falls back to a generic
    /// sans-serif when the family cannot be resolved.
    pub font: Option<String>,
}

/// Watermark center point as a percentage of target size.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PositionPercent {
    pub x: f32,
    pub y: f32,
}

impl Default for PositionPercent {
    fn default() -> Self {
        Self { x: 50.0, y: 50.0 }
    }
}

/// Freely positioned watermark image with scoped opacity.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WatermarkConfig {
    /// RasterRef: data URI (or filesystem path when driven from the CLI).
    pub image: String,
    /// 0..=1, applies to this layer only.
    pub opacity: f32,
    /// Square bounding box side as a percentage of target size, 5..=100.
    pub size: f32,
    /// Center point, each axis 0..=100 percent of target size.
    pub position: PositionPercent,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            image: String::new(),
            opacity: 0.5,
            size: 30.0,
            position: PositionPercent::default(),
        }
    }
}

impl WatermarkConfig {
    pub fn normalized(&self) -> Self {
        Self {
            image: self.image.clone(),
            opacity: clamp_finite(self.opacity, 0.0, 1.0, 0.5),
            size: clamp_finite(self.size, 5.0, 100.0, 30.0),
            position: PositionPercent {
                x: clamp_finite(self.position.x, 0.0, 100.0, 50.0),
                y: clamp_finite(self.position.y, 0.0, 100.0, 50.0),
            },
        }
    }
}

/// The full frame drawn over a normalized square: logo, bottom-row images,
/// watermark, and caption. Persisted as the active configuration or as a
/// named template (see [`crate::store`]).
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FrameConfig {
    /// RasterRef drawn top-left.
    pub logo: Option<String>,
    /// RasterRefs for the bottom strip; only the first
    /// [`crate::frame::MAX_BOTTOM_IMAGES`] are used.
    pub bottom_images: Vec<String>,
    pub watermark: Option<WatermarkConfig>,
    pub text: Option<TextConfig>,
}

impl FrameConfig {
    /// Copy with nested numeric fields clamped to their documented ranges.
    pub fn normalized(&self) -> Self {
        Self {
            logo: self.logo.clone(),
            bottom_images: self.bottom_images.clone(),
            watermark: self.watermark.as_ref().map(WatermarkConfig::normalized),
            text: self.text.clone(),
        }
    }

    /// True when compositing this frame would draw nothing.
    pub fn is_empty(&self) -> bool {
        self.logo.is_none()
            && self.bottom_images.is_empty()
            && self.watermark.is_none()
            && self
                .text
                .as_ref()
                .is_none_or(|t| t.text.trim().is_empty())
    }
}

/// Encoded output format for a processed image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum OutputFormat {
    #[serde(rename = "image/jpeg")]
    Jpeg,
    #[serde(rename = "image/png")]
    Png,
    #[serde(rename = "image/webp")]
    Webp,
}

impl OutputFormat {
    pub fn mime(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Webp => "image/webp",
        }
    }

    /// Archive/file extension for this format.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Webp => "webp",
        }
    }

    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime {
            "image/jpeg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            "image/webp" => Some(Self::Webp),
            _ => None,
        }
    }
}

fn clamp_finite(v: f32, min: f32, max: f32, fallback: f32) -> f32 {
    if v.is_finite() { v.clamp(min, max) } else { fallback }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_default_is_identity() {
        assert!(FilterConfig::default().is_identity());
    }

    #[test]
    fn filter_normalized_clamps_ranges() {
        let cfg = FilterConfig {
            brightness: 300.0,
            contrast: -5.0,
            saturation: f32::NAN,
            blur: 99.0,
            filter: NamedFilter::Sepia,
        }
        .normalized();
        assert_eq!(cfg.brightness, 200.0);
        assert_eq!(cfg.contrast, 0.0);
        assert_eq!(cfg.saturation, 100.0);
        assert_eq!(cfg.blur, 10.0);
        assert_eq!(cfg.filter, NamedFilter::Sepia);
    }

    #[test]
    fn watermark_defaults_match_ui_sliders() {
        let wm = WatermarkConfig::default();
        assert_eq!(wm.opacity, 0.5);
        assert_eq!(wm.size, 30.0);
        assert_eq!(wm.position, PositionPercent { x: 50.0, y: 50.0 });
    }

    #[test]
    fn frame_config_json_uses_camel_case() {
        let cfg = FrameConfig {
            logo: Some("data:image/png;base64,xyz".to_string()),
            bottom_images: vec!["a".to_string()],
            watermark: None,
            text: None,
        };
        let json = serde_json::to_string(&cfg).unwrap();
        assert!(json.contains("\"bottomImages\""));

        let back: FrameConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cfg);
    }

    #[test]
    fn frame_config_tolerates_missing_fields() {
        let cfg: FrameConfig = serde_json::from_str("{}").unwrap();
        assert!(cfg.is_empty());
    }

    #[test]
    fn output_format_mime_round_trip() {
        for f in [OutputFormat::Jpeg, OutputFormat::Png, OutputFormat::Webp] {
            assert_eq!(OutputFormat::from_mime(f.mime()), Some(f));
        }
        assert_eq!(OutputFormat::from_mime("image/gif"), None);
    }
}
