//! Caption rendering.
//!
//! Shapes the caption with parley against the system font collection and
//! paints it onto the surface as a black stroke outline under a white fill,
//! anchored to the bottom-left (LTR) or bottom-right (RTL) corner.

use crate::{
    config::{TextConfig, TextDirection},
    foundation::error::SquarepostResult,
    surface::Surface,
};

/// Caption font size as a fraction of target size.
pub const FONT_FRAC: f64 = 0.03;
/// Caption edge padding as a fraction of target size.
pub const PADDING_FRAC: f64 = 0.02;
/// Stroke width as a fraction of the font size.
pub const STROKE_FRAC: f32 = 0.15;

/// Per-range brush carried through parley styling. The caption uses a single
/// brush, but the layout type requires one.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TextBrushRgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

/// Owns the parley font and layout contexts. Not `Sync`, so parallel batch
/// work builds one engine per image.
pub struct CaptionEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrushRgba8>,
}

impl Default for CaptionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptionEngine {
    pub fn new() -> Self {
        Self {
            font_ctx: parley::FontContext::new(),
            layout_ctx: parley::LayoutContext::new(),
        }
    }

    /// Draw `cfg.text` onto `surface`. Empty text is a no-op, and a font
    /// family that the system cannot resolve falls back to `sans-serif`
    /// rather than failing the image.
    pub fn draw_caption(
        &mut self,
        surface: &mut Surface,
        cfg: &TextConfig,
    ) -> SquarepostResult<()> {
        if cfg.text.trim().is_empty() {
            return Ok(());
        }

        let size = f64::from(surface.width());
        let font_size = (size * FONT_FRAC) as f32;
        let padding = size * PADDING_FRAC;
        let layout = self.layout(&cfg.text, cfg.font.as_deref(), font_size);

        let Some(last_line) = layout.lines().last() else {
            return Ok(());
        };
        let baseline = f64::from(last_line.metrics().baseline);
        // `direction` picks the anchoring edge only. parley 0.7 has no base
        // direction knob, so bidi run order comes from content detection: a
        // mixed-script rtl caption that opens with a strong LTR character
        // shapes with an LTR base run order.
        let tx = match cfg.direction {
            TextDirection::Ltr => padding,
            TextDirection::Rtl => size - padding - f64::from(layout.width()),
        };
        // Anchor the last baseline at size - padding; earlier lines extend
        // upward from there.
        let ty = size - padding - baseline;

        let stroke_width = font_size * STROKE_FRAC;
        render_layout(surface, &layout, tx, ty, stroke_width)
    }

    fn layout(
        &mut self,
        text: &str,
        family: Option<&str>,
        font_size: f32,
    ) -> parley::Layout<TextBrushRgba8> {
        // A trailing generic keeps shaping alive when the named family is
        // missing from the system collection.
        let stack = match family {
            Some(name) if !name.trim().is_empty() => format!("{name}, sans-serif"),
            _ => "sans-serif".to_string(),
        };

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(stack)),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(font_size));
        builder.push_default(parley::style::StyleProperty::Brush(TextBrushRgba8 {
            r: 255,
            g: 255,
            b: 255,
            a: 255,
        }));

        let mut layout: parley::Layout<TextBrushRgba8> = builder.build(text);
        layout.break_all_lines(None);
        layout
    }
}

fn render_layout(
    surface: &mut Surface,
    layout: &parley::Layout<TextBrushRgba8>,
    tx: f64,
    ty: f64,
    stroke_width: f32,
) -> SquarepostResult<()> {
    surface.render(|ctx| {
        ctx.set_transform(vello_cpu::kurbo::Affine::translate((tx, ty)));
        ctx.set_stroke(vello_cpu::kurbo::Stroke {
            width: f64::from(stroke_width),
            join: vello_cpu::kurbo::Join::Round,
            start_cap: vello_cpu::kurbo::Cap::Round,
            end_cap: vello_cpu::kurbo::Cap::Round,
            ..Default::default()
        });

        for line in layout.lines() {
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };

                // parley and vello_cpu pin different peniko releases, so the
                // font handle is rebuilt from its raw bytes.
                let parley_font = run.run().font();
                let font = vello_cpu::peniko::FontData::new(
                    vello_cpu::peniko::Blob::from(parley_font.data.as_ref().to_vec()),
                    parley_font.index,
                );
                let font_size = run.run().font_size();
                let glyphs: Vec<vello_cpu::Glyph> = run
                    .glyphs()
                    .map(|g| vello_cpu::Glyph {
                        id: g.id,
                        x: g.x,
                        y: g.y,
                    })
                    .collect();

                ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(0, 0, 0, 255));
                ctx.glyph_run(&font)
                    .font_size(font_size)
                    .stroke_glyphs(glyphs.iter().copied());

                let brush = run.style().brush;
                ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                    brush.r, brush.g, brush.b, brush.a,
                ));
                ctx.glyph_run(&font)
                    .font_size(font_size)
                    .fill_glyphs(glyphs.into_iter());
            }
        }
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opaque_surface(size: u32, rgb: [u8; 3]) -> Surface {
        let mut s = Surface::new(size).unwrap();
        s.fill([rgb[0], rgb[1], rgb[2], 255]);
        s
    }

    #[test]
    fn empty_caption_is_a_no_op() {
        let mut engine = CaptionEngine::new();
        let mut s = opaque_surface(64, [10, 20, 30]);
        let before = s.data().to_vec();
        let cfg = TextConfig {
            text: "   ".to_string(),
            direction: TextDirection::Ltr,
            font: None,
        };
        engine.draw_caption(&mut s, &cfg).unwrap();
        assert_eq!(s.data(), &before[..]);
    }

    #[test]
    fn caption_marks_bottom_band_when_fonts_available() {
        let mut engine = CaptionEngine::new();
        let mut s = opaque_surface(400, [255, 0, 0]);
        let cfg = TextConfig {
            text: "Hello".to_string(),
            direction: TextDirection::Ltr,
            font: None,
        };
        engine.draw_caption(&mut s, &cfg).unwrap();

        // Skip gracefully on fontless CI; otherwise expect some non-red pixel
        // near the bottom-left corner.
        if engine.layout("Hello", None, 12.0).lines().next().is_none() {
            return;
        }
        let changed = (360..400).any(|y| {
            (0..120).any(|x| {
                let i = ((y * 400 + x) * 4) as usize;
                let d = s.data();
                d[i] != 255 || d[i + 1] != 0 || d[i + 2] != 0
            })
        });
        assert!(changed, "expected caption pixels near bottom-left");
    }

    #[test]
    fn unknown_family_does_not_error() {
        let mut engine = CaptionEngine::new();
        let mut s = opaque_surface(128, [0, 0, 0]);
        let cfg = TextConfig {
            text: "fallback".to_string(),
            direction: TextDirection::Rtl,
            font: Some("No Such Family 9000".to_string()),
        };
        engine.draw_caption(&mut s, &cfg).unwrap();
    }
}
