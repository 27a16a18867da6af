//! Built-in color, blur, stylize and framing filters.
//!
//! Every filter is a pure function of the input frame, its resolved parameters, the clip-local
//! time and the render context. Output always has the input's extent; framing filters sample
//! the source through an inverse mapping and leave uncovered pixels transparent.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::effects::blur::{gaussian_blur, sigma_for_radius};
use crate::effects::composite::apply_opacity_in_place;
use crate::effects::context::RenderContext;
use crate::effects::params::{ParamValue, ParameterSet};
use crate::foundation::core::{Affine, Color, Point, Vec2};
use crate::foundation::error::{MontageError, MontageResult};
use crate::foundation::math::{hash_u32, smoothstep};
use crate::foundation::time::Timestamp;
use crate::render::frame::{FrameRGBA, premul_from_unit, unpremul_unit};

const MAX_BLUR_RADIUS: f64 = 256.0;

/// Closed set of built-in filters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Filter {
    /// Add `amount` to straight color channels.
    Brightness,
    /// Scale straight color around mid-gray by `amount`.
    Contrast,
    /// Scale chroma around luma by `amount`.
    Saturation,
    /// Blend toward luma by `intensity`.
    Grayscale,
    /// Invert straight color channels.
    Invert,
    /// Blend toward the color multiplied by `color` by `intensity`.
    Tint,
    /// Multiply alpha by `opacity`.
    Opacity,
    /// Gaussian blur of `radius` pixels.
    GaussianBlur,
    /// Darken toward the corners.
    Vignette,
    /// Time-seeded luminance noise.
    FilmGrain,
    /// Zoom and pan interpolated across the clip's duration.
    KenBurns,
    /// Static scale, rotation and offset about an anchor.
    Transform,
}

impl Filter {
    /// Stable identifier, also the default effect id.
    pub fn name(self) -> &'static str {
        match self {
            Self::Brightness => "brightness",
            Self::Contrast => "contrast",
            Self::Saturation => "saturation",
            Self::Grayscale => "grayscale",
            Self::Invert => "invert",
            Self::Tint => "tint",
            Self::Opacity => "opacity",
            Self::GaussianBlur => "gaussianBlur",
            Self::Vignette => "vignette",
            Self::FilmGrain => "filmGrain",
            Self::KenBurns => "kenBurns",
            Self::Transform => "transform",
        }
    }

    /// Return `true` when the filter remaps geometry.
    pub fn is_framing(self) -> bool {
        matches!(self, Self::KenBurns | Self::Transform)
    }

    /// Compiled-in parameter defaults.
    pub fn default_parameters(self) -> ParameterSet {
        use ParamValue::{Color as C, Float as F, Int as I, Point as P};
        let set = ParameterSet::new();
        match self {
            Self::Brightness => set.with("amount", F(0.0)),
            Self::Contrast | Self::Saturation => set.with("amount", F(1.0)),
            Self::Grayscale => set.with("intensity", F(1.0)),
            Self::Invert => set,
            Self::Tint => set
                .with("color", C(Color::rgba(1.0, 0.85, 0.6, 1.0)))
                .with("intensity", F(0.5)),
            Self::Opacity => set.with("opacity", F(1.0)),
            Self::GaussianBlur => set.with("radius", F(4.0)),
            Self::Vignette => set.with("intensity", F(0.5)).with("radius", F(0.75)),
            Self::FilmGrain => set.with("intensity", F(0.1)).with("seed", I(0)),
            Self::KenBurns => set
                .with("startScale", F(1.0))
                .with("endScale", F(1.2))
                .with("startOffset", P(Point::ZERO))
                .with("endOffset", P(Point::ZERO)),
            Self::Transform => set
                .with("scale", F(1.0))
                .with("rotation", F(0.0))
                .with("offset", P(Point::ZERO))
                .with("anchor", P(Point::new(0.5, 0.5))),
        }
    }
}

/// Run `filter` with already-resolved parameters.
pub fn apply_filter(
    filter: Filter,
    params: &ParameterSet,
    frame: &FrameRGBA,
    t: Timestamp,
    ctx: &RenderContext,
) -> MontageResult<FrameRGBA> {
    match filter {
        Filter::Brightness => {
            let amount = params.float("amount", 0.0) as f32;
            Ok(map_straight(frame, |c| {
                [c[0] + amount, c[1] + amount, c[2] + amount, c[3]]
            }))
        }
        Filter::Contrast => {
            let k = params.float("amount", 1.0) as f32;
            Ok(map_straight(frame, |c| {
                let f = |v: f32| (v - 0.5) * k + 0.5;
                [f(c[0]), f(c[1]), f(c[2]), c[3]]
            }))
        }
        Filter::Saturation => {
            let k = params.float("amount", 1.0) as f32;
            Ok(map_straight(frame, |c| {
                let l = luma(c);
                let f = |v: f32| l + (v - l) * k;
                [f(c[0]), f(c[1]), f(c[2]), c[3]]
            }))
        }
        Filter::Grayscale => {
            let k = params.float("intensity", 1.0).clamp(0.0, 1.0) as f32;
            Ok(map_straight(frame, |c| {
                let l = luma(c);
                let f = |v: f32| v + (l - v) * k;
                [f(c[0]), f(c[1]), f(c[2]), c[3]]
            }))
        }
        Filter::Invert => Ok(map_straight(frame, |c| {
            [1.0 - c[0], 1.0 - c[1], 1.0 - c[2], c[3]]
        })),
        Filter::Tint => {
            let tint = params.color("color", Color::WHITE).clamped();
            let k = params.float("intensity", 0.5).clamp(0.0, 1.0) as f32;
            Ok(map_straight(frame, |c| {
                let f = |v: f32, m: f32| v + (v * m - v) * k;
                [f(c[0], tint.red), f(c[1], tint.green), f(c[2], tint.blue), c[3]]
            }))
        }
        Filter::Opacity => {
            let mut out = frame.clone();
            apply_opacity_in_place(&mut out.data, params.float("opacity", 1.0) as f32);
            Ok(out)
        }
        Filter::GaussianBlur => {
            let radius = params.float("radius", 4.0);
            if !radius.is_finite() || radius < 0.0 {
                return Err(MontageError::effect_failure(
                    "gaussianBlur radius must be finite and >= 0",
                ));
            }
            let radius = radius.min(MAX_BLUR_RADIUS);
            let sigma = match params.get("sigma") {
                Some(ParamValue::Float(s)) => *s as f32,
                _ => sigma_for_radius(radius),
            };
            gaussian_blur(frame, radius.round() as u32, sigma)
        }
        Filter::Vignette => Ok(vignette(
            frame,
            params.float("intensity", 0.5) as f32,
            params.float("radius", 0.75) as f32,
        )),
        Filter::FilmGrain => {
            let seed = (params.int("seed", 0) as u64) ^ ctx.seed ^ time_seed(t);
            Ok(film_grain(frame, params.float("intensity", 0.1) as f32, seed))
        }
        Filter::KenBurns => {
            let p = ctx.clip_progress(t);
            let scale = lerp(
                params.float("startScale", 1.0),
                params.float("endScale", 1.2),
                p,
            );
            let offset = params
                .point("startOffset", Point::ZERO)
                .lerp(params.point("endOffset", Point::ZERO), p);
            let center = Vec2::new(f64::from(frame.width) / 2.0, f64::from(frame.height) / 2.0);
            let affine = Affine::translate(center + offset.to_vec2())
                * Affine::scale(scale)
                * Affine::translate(-center);
            remap(frame, affine)
        }
        Filter::Transform => {
            let anchor = params.point("anchor", Point::new(0.5, 0.5));
            let pivot = Vec2::new(
                anchor.x * f64::from(frame.width),
                anchor.y * f64::from(frame.height),
            );
            let offset = params.point("offset", Point::ZERO).to_vec2();
            let affine = Affine::translate(pivot + offset)
                * Affine::rotate(params.float("rotation", 0.0))
                * Affine::scale(params.float("scale", 1.0))
                * Affine::translate(-pivot);
            remap(frame, affine)
        }
    }
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

fn luma(c: [f32; 4]) -> f32 {
    0.2126 * c[0] + 0.7152 * c[1] + 0.0722 * c[2]
}

/// Noise seed derived from clip-local time at millisecond resolution.
fn time_seed(t: Timestamp) -> u64 {
    (t.seconds_f64() * 1000.0).round() as i64 as u64
}

/// Apply a straight-alpha color function per pixel; fully transparent pixels are skipped.
fn map_straight<F>(frame: &FrameRGBA, f: F) -> FrameRGBA
where
    F: Fn([f32; 4]) -> [f32; 4] + Sync,
{
    let mut out = frame.clone();
    out.data.par_chunks_exact_mut(4).for_each(|px| {
        if px[3] == 0 {
            return;
        }
        let c = unpremul_unit([px[0], px[1], px[2], px[3]]);
        px.copy_from_slice(&premul_from_unit(f(c)));
    });
    out
}

fn vignette(frame: &FrameRGBA, intensity: f32, radius: f32) -> FrameRGBA {
    let mut out = frame.clone();
    let w = frame.width as usize;
    if w == 0 {
        return out;
    }
    let cx = frame.width as f32 / 2.0;
    let cy = frame.height as f32 / 2.0;
    let max_d = (cx * cx + cy * cy).sqrt().max(f32::EPSILON);
    let intensity = intensity.clamp(0.0, 1.0);
    let radius = radius.clamp(0.0, 1.0);
    out.data
        .par_chunks_exact_mut(w * 4)
        .enumerate()
        .for_each(|(y, row)| {
            let dy = y as f32 + 0.5 - cy;
            for (x, px) in row.chunks_exact_mut(4).enumerate() {
                let dx = x as f32 + 0.5 - cx;
                let d = (dx * dx + dy * dy).sqrt() / max_d;
                let k = 1.0 - intensity * smoothstep(radius, 1.0, d);
                for v in &mut px[..3] {
                    *v = (f32::from(*v) * k).round().clamp(0.0, 255.0) as u8;
                }
            }
        });
    out
}

fn film_grain(frame: &FrameRGBA, intensity: f32, seed: u64) -> FrameRGBA {
    let mut out = frame.clone();
    let w = frame.width as usize;
    if w == 0 {
        return out;
    }
    out.data
        .par_chunks_exact_mut(w * 4)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, px) in row.chunks_exact_mut(4).enumerate() {
                if px[3] == 0 {
                    continue;
                }
                let n = hash_u32(seed, x as u32, y as u32) as f32 / u32::MAX as f32 * 2.0 - 1.0;
                let mut c = unpremul_unit([px[0], px[1], px[2], px[3]]);
                for v in &mut c[..3] {
                    *v += n * intensity;
                }
                px.copy_from_slice(&premul_from_unit(c));
            }
        });
    out
}

/// Resample `frame` through `affine` (source to destination) into a frame of the same extent.
fn remap(frame: &FrameRGBA, affine: Affine) -> MontageResult<FrameRGBA> {
    if affine.determinant().abs() < 1e-12 {
        return Ok(FrameRGBA::transparent(frame.size()));
    }
    if affine == Affine::IDENTITY {
        return Ok(frame.clone());
    }
    let inv = affine.inverse();
    let w = frame.width as usize;
    let mut out = FrameRGBA::transparent(frame.size());
    if w == 0 {
        return Ok(out);
    }
    out.data
        .par_chunks_exact_mut(w * 4)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, px) in row.chunks_exact_mut(4).enumerate() {
                let src = inv * Point::new(x as f64 + 0.5, y as f64 + 0.5);
                px.copy_from_slice(&frame.sample_bilinear(src.x, src.y));
            }
        });
    Ok(out)
}

#[cfg(test)]
#[path = "../../tests/unit/effects/builtin.rs"]
mod tests;
