//! Separable Gaussian blur over premultiplied RGBA8 with Q16 fixed-point weights.

use rayon::prelude::*;

use crate::foundation::error::{MontageError, MontageResult};
use crate::render::frame::FrameRGBA;

/// Blur a premultiplied frame; `radius == 0` is identity. Edges clamp to the border pixel.
pub fn gaussian_blur(frame: &FrameRGBA, radius: u32, sigma: f32) -> MontageResult<FrameRGBA> {
    if radius == 0 || frame.width == 0 || frame.height == 0 {
        return Ok(frame.clone());
    }
    let kernel = kernel_q16(radius, sigma)?;
    let mut tmp = vec![0u8; frame.data.len()];
    let mut out = vec![0u8; frame.data.len()];
    blur_rows(&frame.data, &mut tmp, frame.width, frame.height, &kernel);
    blur_cols(&tmp, &mut out, frame.width, frame.height, &kernel);
    Ok(FrameRGBA {
        width: frame.width,
        height: frame.height,
        data: out,
        premultiplied: true,
    })
}

/// Sigma matching a blur radius when the caller does not specify one.
pub fn sigma_for_radius(radius: f64) -> f32 {
    (radius / 2.0).max(0.5) as f32
}

fn kernel_q16(radius: u32, sigma: f32) -> MontageResult<Vec<u32>> {
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(MontageError::effect_failure("blur sigma must be > 0"));
    }
    let r = radius as i32;
    let denom = 2.0 * f64::from(sigma) * f64::from(sigma);
    let weights_f: Vec<f64> = (-r..=r)
        .map(|i| (-(f64::from(i) * f64::from(i)) / denom).exp())
        .collect();
    let sum: f64 = weights_f.iter().sum();
    if sum <= 0.0 {
        return Err(MontageError::effect_failure("gaussian kernel sum is zero"));
    }

    let mut weights: Vec<u32> = weights_f
        .iter()
        .map(|wf| ((wf / sum) * 65536.0).round().clamp(0.0, 65536.0) as u32)
        .collect();
    // Force the kernel to sum to exactly 1.0 in Q16 so flat regions stay flat.
    let acc: i64 = weights.iter().map(|&w| i64::from(w)).sum();
    let delta = 65536 - acc;
    if delta != 0 {
        let mid = weights.len() / 2;
        weights[mid] = (i64::from(weights[mid]) + delta).clamp(0, 65536) as u32;
    }
    Ok(weights)
}

fn blur_rows(src: &[u8], dst: &mut [u8], width: u32, height: u32, k: &[u32]) {
    let radius = (k.len() / 2) as i64;
    let w = i64::from(width);
    let row_len = width as usize * 4;
    dst.par_chunks_mut(row_len)
        .take(height as usize)
        .enumerate()
        .for_each(|(y, row)| {
            let src_row = &src[y * row_len..(y + 1) * row_len];
            for x in 0..w {
                let mut acc = [0u64; 4];
                for (ki, &kw) in k.iter().enumerate() {
                    let sx = (x + ki as i64 - radius).clamp(0, w - 1) as usize * 4;
                    for c in 0..4 {
                        acc[c] += u64::from(kw) * u64::from(src_row[sx + c]);
                    }
                }
                let o = x as usize * 4;
                for c in 0..4 {
                    row[o + c] = q16_to_u8(acc[c]);
                }
            }
        });
}

fn blur_cols(src: &[u8], dst: &mut [u8], width: u32, height: u32, k: &[u32]) {
    let radius = (k.len() / 2) as i64;
    let h = i64::from(height);
    let row_len = width as usize * 4;
    dst.par_chunks_mut(row_len)
        .enumerate()
        .for_each(|(y, row)| {
            for x in 0..width as usize {
                let mut acc = [0u64; 4];
                for (ki, &kw) in k.iter().enumerate() {
                    let sy = (y as i64 + ki as i64 - radius).clamp(0, h - 1) as usize;
                    let idx = sy * row_len + x * 4;
                    for c in 0..4 {
                        acc[c] += u64::from(kw) * u64::from(src[idx + c]);
                    }
                }
                for c in 0..4 {
                    row[x * 4 + c] = q16_to_u8(acc[c]);
                }
            }
        });
}

fn q16_to_u8(acc: u64) -> u8 {
    ((acc + 32768) >> 16).min(255) as u8
}

#[cfg(test)]
#[path = "../../tests/unit/effects/blur.rs"]
mod tests;
