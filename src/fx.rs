//! Filter engine.
//!
//! A [`FilterConfig`] compiles into an ordered plan of [`FilterOp`]s; identity
//! terms are omitted so the identity configuration touches no pixels. Plan
//! order is fixed (brightness, contrast, saturation, blur, named filter) and
//! significant: consumers that re-implement it must keep the same order for
//! visual parity.

use crate::{
    blur,
    config::{FilterConfig, NamedFilter},
    foundation::error::SquarepostResult,
    surface::Surface,
};

/// One step of the compiled filter plan.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FilterOp {
    /// Multiply channels by the factor (1.0 = identity).
    Brightness(f32),
    /// Scale channels around mid-gray (1.0 = identity).
    Contrast(f32),
    /// Lerp between luma and the original color (1.0 = identity).
    Saturate(f32),
    Blur { radius: u32, sigma: f32 },
    Grayscale,
    Sepia,
}

/// Compile a config into its non-identity ops, in application order.
pub fn plan_filters(cfg: &FilterConfig) -> Vec<FilterOp> {
    let cfg = cfg.normalized();
    let mut plan = Vec::new();
    if cfg.brightness != 100.0 {
        plan.push(FilterOp::Brightness(cfg.brightness / 100.0));
    }
    if cfg.contrast != 100.0 {
        plan.push(FilterOp::Contrast(cfg.contrast / 100.0));
    }
    if cfg.saturation != 100.0 {
        plan.push(FilterOp::Saturate(cfg.saturation / 100.0));
    }
    if cfg.blur > 0.0 {
        plan.push(FilterOp::Blur {
            radius: blur::radius_for_sigma(cfg.blur),
            sigma: cfg.blur,
        });
    }
    match cfg.filter {
        NamedFilter::None => {}
        NamedFilter::Grayscale => plan.push(FilterOp::Grayscale),
        NamedFilter::Sepia => plan.push(FilterOp::Sepia),
    }
    plan
}

/// Apply the compiled plan to the surface in place. Geometry is unchanged.
pub fn apply_filters(surface: &mut Surface, cfg: &FilterConfig) -> SquarepostResult<()> {
    for op in plan_filters(cfg) {
        match op {
            FilterOp::Blur { radius, sigma } => {
                let (w, h) = (surface.width(), surface.height());
                let blurred = blur::blur_rgba8_premul(surface.data(), w, h, radius, sigma)?;
                surface.data_mut().copy_from_slice(&blurred);
            }
            _ => apply_point_op(surface.data_mut(), op),
        }
    }
    Ok(())
}

/// Rec. 709 luma weights, as used by CSS filter matrices.
const LUMA: [f32; 3] = [0.2126, 0.7152, 0.0722];

fn apply_point_op(data: &mut [u8], op: FilterOp) {
    for px in data.chunks_exact_mut(4) {
        let a = px[3];
        if a == 0 {
            continue;
        }
        // Color math happens on straight alpha; the buffer is premultiplied.
        let af = f32::from(a);
        let mut rgb = [
            f32::from(px[0]) / af,
            f32::from(px[1]) / af,
            f32::from(px[2]) / af,
        ];

        rgb = match op {
            FilterOp::Brightness(f) => rgb.map(|c| c * f),
            FilterOp::Contrast(f) => rgb.map(|c| (c - 0.5) * f + 0.5),
            FilterOp::Saturate(f) => {
                let l = luma(rgb);
                rgb.map(|c| l + (c - l) * f)
            }
            FilterOp::Grayscale => {
                let l = luma(rgb);
                [l, l, l]
            }
            FilterOp::Sepia => [
                0.393 * rgb[0] + 0.769 * rgb[1] + 0.189 * rgb[2],
                0.349 * rgb[0] + 0.686 * rgb[1] + 0.168 * rgb[2],
                0.272 * rgb[0] + 0.534 * rgb[1] + 0.131 * rgb[2],
            ],
            FilterOp::Blur { .. } => unreachable!("blur is a pass, not a point op"),
        };

        for c in 0..3 {
            px[c] = (rgb[c].clamp(0.0, 1.0) * af).round() as u8;
        }
    }
}

fn luma(rgb: [f32; 3]) -> f32 {
    LUMA[0] * rgb[0] + LUMA[1] * rgb[1] + LUMA[2] * rgb[2]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NamedFilter;

    #[test]
    fn identity_config_compiles_to_empty_plan() {
        assert!(plan_filters(&FilterConfig::default()).is_empty());
    }

    #[test]
    fn plan_order_is_fixed() {
        let cfg = FilterConfig {
            brightness: 120.0,
            contrast: 80.0,
            saturation: 150.0,
            blur: 2.0,
            filter: NamedFilter::Sepia,
        };
        let plan = plan_filters(&cfg);
        assert_eq!(plan.len(), 5);
        assert!(matches!(plan[0], FilterOp::Brightness(_)));
        assert!(matches!(plan[1], FilterOp::Contrast(_)));
        assert!(matches!(plan[2], FilterOp::Saturate(_)));
        assert!(matches!(plan[3], FilterOp::Blur { .. }));
        assert_eq!(plan[4], FilterOp::Sepia);
    }

    #[test]
    fn identity_apply_is_pixel_identical() {
        let mut s = Surface::new(3).unwrap();
        s.fill([13, 77, 200, 255]);
        let before = s.data().to_vec();
        apply_filters(&mut s, &FilterConfig::default()).unwrap();
        assert_eq!(s.data(), &before[..]);
    }

    #[test]
    fn brightness_zero_blacks_out() {
        let mut s = Surface::new(2).unwrap();
        s.fill([200, 100, 50, 255]);
        let cfg = FilterConfig {
            brightness: 0.0,
            ..FilterConfig::default()
        };
        apply_filters(&mut s, &cfg).unwrap();
        for px in s.data().chunks_exact(4) {
            assert_eq!(&px[..3], &[0, 0, 0]);
            assert_eq!(px[3], 255);
        }
    }

    #[test]
    fn grayscale_equalizes_channels() {
        let mut s = Surface::new(2).unwrap();
        s.fill([255, 0, 0, 255]);
        let cfg = FilterConfig {
            filter: NamedFilter::Grayscale,
            ..FilterConfig::default()
        };
        apply_filters(&mut s, &cfg).unwrap();
        let px = &s.data()[..4];
        assert_eq!(px[0], px[1]);
        assert_eq!(px[1], px[2]);
        let expected = (0.2126f32 * 255.0).round() as i32;
        assert!((i32::from(px[0]) - expected).abs() <= 1);
    }

    #[test]
    fn saturate_zero_matches_grayscale() {
        let mut a = Surface::new(2).unwrap();
        let mut b = Surface::new(2).unwrap();
        a.fill([30, 180, 90, 255]);
        b.fill([30, 180, 90, 255]);

        apply_filters(
            &mut a,
            &FilterConfig {
                saturation: 0.0,
                ..FilterConfig::default()
            },
        )
        .unwrap();
        apply_filters(
            &mut b,
            &FilterConfig {
                filter: NamedFilter::Grayscale,
                ..FilterConfig::default()
            },
        )
        .unwrap();

        for (pa, pb) in a.data().iter().zip(b.data()) {
            assert!((i32::from(*pa) - i32::from(*pb)).abs() <= 1);
        }
    }

    #[test]
    fn contrast_preserves_mid_gray() {
        let mut s = Surface::new(2).unwrap();
        s.fill([128, 128, 128, 255]);
        let cfg = FilterConfig {
            contrast: 200.0,
            ..FilterConfig::default()
        };
        apply_filters(&mut s, &cfg).unwrap();
        for c in &s.data()[..3] {
            assert!((i32::from(*c) - 128).abs() <= 2);
        }
    }
}
