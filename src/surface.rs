//! Off-screen drawing surface.
//!
//! Wraps a `vello_cpu` pixmap holding premultiplied RGBA8 pixels. Every draw
//! call takes its opacity as an explicit parameter; there is no shared
//! save/restore context state to discipline.

use std::sync::Arc;

use crate::{
    assets::decode::RasterImage,
    foundation::error::{SquarepostError, SquarepostResult},
};

pub struct Surface {
    width: u16,
    height: u16,
    pixmap: vello_cpu::Pixmap,
}

impl Surface {
    /// Allocate a square surface, transparent black.
    pub fn new(size: u32) -> SquarepostResult<Self> {
        Self::with_dims(size, size)
    }

    pub fn with_dims(width: u32, height: u32) -> SquarepostResult<Self> {
        if width == 0 || height == 0 {
            return Err(SquarepostError::validation(
                "surface dimensions must be > 0",
            ));
        }
        let width_u16: u16 = width
            .try_into()
            .map_err(|_| SquarepostError::validation("surface width exceeds u16"))?;
        let height_u16: u16 = height
            .try_into()
            .map_err(|_| SquarepostError::validation("surface height exceeds u16"))?;
        Ok(Self {
            width: width_u16,
            height: height_u16,
            pixmap: vello_cpu::Pixmap::new(width_u16, height_u16),
        })
    }

    pub fn width(&self) -> u32 {
        u32::from(self.width)
    }

    pub fn height(&self) -> u32 {
        u32::from(self.height)
    }

    /// Premultiplied RGBA8 pixel data, row-major.
    pub fn data(&self) -> &[u8] {
        self.pixmap.data_as_u8_slice()
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        self.pixmap.data_as_u8_slice_mut()
    }

    /// Flood-fill with a straight-alpha color.
    pub fn fill(&mut self, rgba: [u8; 4]) {
        let premul = premul_rgba8(rgba[0], rgba[1], rgba[2], rgba[3]);
        for px in self.pixmap.data_as_u8_slice_mut().chunks_exact_mut(4) {
            px.copy_from_slice(&premul);
        }
    }

    /// True when any pixel is not fully opaque.
    pub fn has_alpha(&self) -> bool {
        self.data().chunks_exact(4).any(|px| px[3] < 255)
    }

    /// Draw `raster` scaled into the rect `(x, y, w, h)`, blended source-over
    /// at `opacity`. The destination rect may overflow the surface; overflow
    /// is clipped by the surface bounds.
    pub fn draw_raster(
        &mut self,
        raster: &RasterImage,
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        opacity: f32,
    ) -> SquarepostResult<()> {
        if w <= 0.0 || h <= 0.0 || opacity <= 0.0 {
            return Ok(());
        }
        let paint = image_paint(raster)?;
        let (iw, ih) = (f64::from(raster.width), f64::from(raster.height));
        let opacity = opacity.clamp(0.0, 1.0);

        self.render(|ctx| {
            ctx.set_transform(
                vello_cpu::kurbo::Affine::translate((x, y))
                    * vello_cpu::kurbo::Affine::scale_non_uniform(w / iw, h / ih),
            );
            ctx.set_paint(paint);
            if opacity < 1.0 {
                ctx.push_opacity_layer(opacity);
            }
            ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, iw, ih));
            if opacity < 1.0 {
                ctx.pop_layer();
            }
        });
        Ok(())
    }

    /// Record draw ops with `f` and composite them over the current pixels.
    pub(crate) fn render(&mut self, f: impl FnOnce(&mut vello_cpu::RenderContext)) {
        let mut ctx = vello_cpu::RenderContext::new(self.width, self.height);
        f(&mut ctx);
        ctx.flush();
        ctx.render_to_pixmap(&mut self.pixmap);
    }
}

/// Build an image paint from a premultiplied raster.
pub(crate) fn image_paint(raster: &RasterImage) -> SquarepostResult<vello_cpu::Image> {
    let w: u16 = raster
        .width
        .try_into()
        .map_err(|_| SquarepostError::validation("raster width exceeds u16"))?;
    let h: u16 = raster
        .height
        .try_into()
        .map_err(|_| SquarepostError::validation("raster height exceeds u16"))?;

    let mut may_have_opacities = false;
    let mut pixels = Vec::with_capacity(raster.width as usize * raster.height as usize);
    for px in raster.data().chunks_exact(4) {
        let a = px[3];
        may_have_opacities |= a != 255;
        pixels.push(vello_cpu::peniko::color::PremulRgba8 {
            r: px[0],
            g: px[1],
            b: px[2],
            a,
        });
    }

    let pixmap = vello_cpu::Pixmap::from_parts_with_opacity(pixels, w, h, may_have_opacities);
    Ok(vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    })
}

fn premul_rgba8(r: u8, g: u8, b: u8, a: u8) -> [u8; 4] {
    let af = (a as u16) + 1;
    let premul = |c: u8| -> u8 { (((c as u16) * af) >> 8) as u8 };
    [premul(r), premul(g), premul(b), a]
}
