//! Premultiplied RGBA8 pixel compositing.

use crate::effects::transitions::WipeDir;
use crate::foundation::error::{MontageError, MontageResult};
use crate::foundation::math::{mul_div255_u8, smoothstep};
use crate::render::frame::FrameRGBA;

pub type PremulRgba8 = [u8; 4];

fn quantize(f: f32) -> u16 {
    (f.clamp(0.0, 1.0) * 255.0).round() as u16
}

/// Source-over of `src` scaled by `opacity` onto `dst`.
pub fn over(dst: PremulRgba8, src: PremulRgba8, opacity: f32) -> PremulRgba8 {
    let op = quantize(opacity);
    if op == 0 || src[3] == 0 {
        return dst;
    }
    let sa = mul_div255_u8(u16::from(src[3]), op);
    if sa == 0 {
        return dst;
    }
    let inv = 255 - u16::from(sa);
    std::array::from_fn(|i| {
        let s = if i == 3 {
            sa
        } else {
            mul_div255_u8(u16::from(src[i]), op)
        };
        s.saturating_add(mul_div255_u8(u16::from(dst[i]), inv))
    })
}

/// Linear blend from `a` (t = 0) to `b` (t = 1).
pub fn crossfade(a: PremulRgba8, b: PremulRgba8, t: f32) -> PremulRgba8 {
    let tb = quantize(t);
    let ta = 255 - tb;
    std::array::from_fn(|i| {
        mul_div255_u8(u16::from(a[i]), ta).saturating_add(mul_div255_u8(u16::from(b[i]), tb))
    })
}

fn px(data: &[u8], i: usize) -> PremulRgba8 {
    [data[i], data[i + 1], data[i + 2], data[i + 3]]
}

/// Composite `src` over `dst` with its top-left corner at `(x, y)` in `dst` pixel space.
///
/// Pixels falling outside `dst` are discarded; `dst` keeps its extent.
pub fn over_at(dst: &mut FrameRGBA, src: &FrameRGBA, x: i64, y: i64, opacity: f32) {
    if opacity <= 0.0 {
        return;
    }
    let x0 = x.max(0);
    let y0 = y.max(0);
    let x1 = (x + i64::from(src.width)).min(i64::from(dst.width));
    let y1 = (y + i64::from(src.height)).min(i64::from(dst.height));
    if x0 >= x1 || y0 >= y1 {
        return;
    }
    let span = (x1 - x0) as usize * 4;
    let dst_stride = dst.width as usize * 4;
    let src_stride = src.width as usize * 4;
    for row in y0..y1 {
        let d_start = row as usize * dst_stride + x0 as usize * 4;
        let s_start = (row - y) as usize * src_stride + (x0 - x) as usize * 4;
        let s_row = &src.data[s_start..s_start + span];
        let d_row = &mut dst.data[d_start..d_start + span];
        for (d, s) in d_row.chunks_exact_mut(4).zip(s_row.chunks_exact(4)) {
            let out = over(px(d, 0), px(s, 0), opacity);
            d.copy_from_slice(&out);
        }
    }
}

/// Blend `b` into `dst` pixel by pixel, weighting `b` by `weight(x, y)`.
fn blend_weighted(
    dst: &mut FrameRGBA,
    b: &FrameRGBA,
    weight: impl Fn(u32, u32) -> f32,
) -> MontageResult<()> {
    if !dst.same_extent(b) {
        return Err(MontageError::effect_failure(format!(
            "transition frames differ in size: {}x{} vs {}x{}",
            dst.width, dst.height, b.width, b.height
        )));
    }
    let w = dst.width;
    for (i, (d, s)) in dst
        .data
        .chunks_exact_mut(4)
        .zip(b.data.chunks_exact(4))
        .enumerate()
    {
        let x = (i % w as usize) as u32;
        let y = (i / w as usize) as u32;
        let out = crossfade(px(d, 0), px(s, 0), weight(x, y));
        d.copy_from_slice(&out);
    }
    Ok(())
}

/// Dissolve `dst` toward `b` by `t`.
pub fn crossfade_frames(dst: &mut FrameRGBA, b: &FrameRGBA, t: f32) -> MontageResult<()> {
    blend_weighted(dst, b, |_, _| t)
}

/// Reveal `b` over `dst` along `dir`; `t` is the share of travel completed.
///
/// `soft_edge` feathers the boundary over that fraction of the travel axis.
pub fn wipe_frames(
    dst: &mut FrameRGBA,
    b: &FrameRGBA,
    dir: WipeDir,
    soft_edge: f32,
    t: f32,
) -> MontageResult<()> {
    let (w, h) = (dst.width, dst.height);
    let axis = match dir {
        WipeDir::LeftToRight | WipeDir::RightToLeft => w as f32,
        WipeDir::TopToBottom | WipeDir::BottomToTop => h as f32,
    };
    let feather = soft_edge.max(0.0) * axis;
    // edge travels from -feather to axis + feather so both endpoints are clean
    let edge = t.clamp(0.0, 1.0) * (axis + 2.0 * feather) - feather;

    blend_weighted(dst, b, |x, y| {
        let pos = match dir {
            WipeDir::LeftToRight => x as f32,
            WipeDir::RightToLeft => (w - 1 - x) as f32,
            WipeDir::TopToBottom => y as f32,
            WipeDir::BottomToTop => (h - 1 - y) as f32,
        };
        if feather <= 0.0 {
            if pos < edge { 1.0 } else { 0.0 }
        } else {
            1.0 - smoothstep(edge - feather, edge + feather, pos)
        }
    })
}

/// Scale every channel of a premultiplied buffer by `opacity`.
pub fn apply_opacity_in_place(data: &mut [u8], opacity: f32) {
    if opacity >= 1.0 {
        return;
    }
    let op = quantize(opacity);
    for v in data.iter_mut() {
        *v = mul_div255_u8(u16::from(*v), op);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/effects/composite.rs"]
mod tests;
