//! Separable Gaussian blur over premultiplied RGBA8 buffers.
//!
//! Fixed-point (Q16) kernel weights keep the result deterministic across
//! platforms. Edge pixels clamp, matching canvas-style blur where the border
//! bleeds outward instead of darkening.

use crate::foundation::error::{SquarepostError, SquarepostResult};

/// Blur `src` (premultiplied RGBA8, `width*height*4` bytes) in a fresh buffer.
pub fn blur_rgba8_premul(
    src: &[u8],
    width: u32,
    height: u32,
    radius: u32,
    sigma: f32,
) -> SquarepostResult<Vec<u8>> {
    let expected_len = (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(4))
        .ok_or_else(|| SquarepostError::validation("blur buffer size overflow"))?;
    if src.len() != expected_len {
        return Err(SquarepostError::validation(
            "blur_rgba8_premul expects src matching width*height*4",
        ));
    }
    if radius == 0 {
        return Ok(src.to_vec());
    }

    let kernel = gaussian_kernel_q16(radius, sigma)?;
    let mut tmp = vec![0u8; expected_len];
    let mut out = vec![0u8; expected_len];

    // Horizontal pass: neighbors one pixel apart within a row.
    convolve_axis(src, &mut tmp, width, height, &kernel, Axis::X);
    convolve_axis(&tmp, &mut out, width, height, &kernel, Axis::Y);
    Ok(out)
}

/// Kernel taps to cover a Gaussian of the given standard deviation.
pub fn radius_for_sigma(sigma: f32) -> u32 {
    if !sigma.is_finite() || sigma <= 0.0 {
        return 0;
    }
    (sigma * 2.0).ceil().max(1.0) as u32
}

#[derive(Clone, Copy)]
enum Axis {
    X,
    Y,
}

fn gaussian_kernel_q16(radius: u32, sigma: f32) -> SquarepostResult<Vec<u32>> {
    if radius == 0 {
        return Ok(vec![1 << 16]);
    }
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(SquarepostError::validation("blur sigma must be > 0"));
    }

    let r = radius as i32;
    let sigma = sigma as f64;
    let denom = 2.0 * sigma * sigma;
    let mut weights_f = Vec::<f64>::with_capacity((2 * r + 1) as usize);
    let mut sum = 0.0f64;
    for i in -r..=r {
        let x = i as f64;
        let w = (-x * x / denom).exp();
        weights_f.push(w);
        sum += w;
    }
    if sum <= 0.0 {
        return Err(SquarepostError::validation("gaussian kernel sum is zero"));
    }

    // Quantize to Q16 and push any rounding drift onto the center tap so the
    // kernel still sums to exactly 1.0.
    let mut weights = Vec::<u32>::with_capacity(weights_f.len());
    let mut acc: i64 = 0;
    for &wf in &weights_f {
        let q = (((wf / sum) * 65536.0).round() as i64).clamp(0, 65536);
        weights.push(q as u32);
        acc += q;
    }
    let delta = 65536 - acc;
    if delta != 0 {
        let mid = weights.len() / 2;
        weights[mid] = ((i64::from(weights[mid]) + delta).clamp(0, 65536)) as u32;
    }

    Ok(weights)
}

fn convolve_axis(src: &[u8], dst: &mut [u8], width: u32, height: u32, k: &[u32], axis: Axis) {
    let radius = (k.len() / 2) as i32;
    let w = width as i32;
    let h = height as i32;
    for y in 0..h {
        for x in 0..w {
            let mut acc = [0u64; 4];
            for (ki, &kw) in k.iter().enumerate() {
                let d = ki as i32 - radius;
                let idx = match axis {
                    Axis::X => (y * w + (x + d).clamp(0, w - 1)) as usize * 4,
                    Axis::Y => ((y + d).clamp(0, h - 1) * w + x) as usize * 4,
                };
                for c in 0..4 {
                    acc[c] += u64::from(kw) * u64::from(src[idx + c]);
                }
            }
            let out_idx = (y * w + x) as usize * 4;
            for c in 0..4 {
                dst[out_idx + c] = q16_to_u8(acc[c]);
            }
        }
    }
}

fn q16_to_u8(acc: u64) -> u8 {
    (((acc + 32768) >> 16).min(255)) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blur_radius_0_is_identity() {
        let src = vec![1u8, 2, 3, 4, 5, 6, 7, 8];
        let out = blur_rgba8_premul(&src, 1, 2, 0, 1.0).unwrap();
        assert_eq!(out, src);
    }

    #[test]
    fn blur_constant_image_is_identity() {
        let (w, h) = (4u32, 3u32);
        let px = [10u8, 20u8, 30u8, 40u8];
        let src = px.repeat((w * h) as usize);
        let out = blur_rgba8_premul(&src, w, h, 3, 2.0).unwrap();
        assert_eq!(out, src);
    }

    #[test]
    fn blur_spreads_energy_from_single_pixel() {
        let (w, h) = (5u32, 5u32);
        let mut src = vec![0u8; (w * h * 4) as usize];
        let center = ((2 * w + 2) * 4) as usize;
        src[center..center + 4].copy_from_slice(&[255, 255, 255, 255]);

        let out = blur_rgba8_premul(&src, w, h, 2, 1.2).unwrap();

        let nonzero = out.chunks_exact(4).filter(|px| px[3] != 0).count();
        assert!(nonzero > 1);

        // Total alpha is conserved within quantization error.
        let sum_a: u32 = out.chunks_exact(4).map(|px| u32::from(px[3])).sum();
        assert!((sum_a as i32 - 255).abs() <= 4);
    }

    #[test]
    fn radius_for_sigma_scales() {
        assert_eq!(radius_for_sigma(0.0), 0);
        assert_eq!(radius_for_sigma(1.0), 2);
        assert_eq!(radius_for_sigma(20.0), 40);
    }

    #[test]
    fn blur_rejects_length_mismatch() {
        assert!(blur_rgba8_premul(&[0u8; 7], 1, 1, 1, 1.0).is_err());
    }
}
