//! Content-fit mapping of a source raster into a clip frame.

use rayon::prelude::*;

use crate::foundation::core::Size;
use crate::render::frame::FrameRGBA;
use crate::scene::model::ContentMode;

/// Scale factors and offset mapping source pixels into a `target`-sized raster.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FitTransform {
    pub scale_x: f64,
    pub scale_y: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl FitTransform {
    pub fn new(source: Size, target: Size, mode: ContentMode) -> Self {
        let (sw, sh) = (f64::from(source.width), f64::from(source.height));
        let (tw, th) = (f64::from(target.width), f64::from(target.height));
        if sw == 0.0 || sh == 0.0 {
            return Self {
                scale_x: 1.0,
                scale_y: 1.0,
                offset_x: 0.0,
                offset_y: 0.0,
            };
        }
        let (kx, ky) = (tw / sw, th / sh);
        let (scale_x, scale_y) = match mode {
            ContentMode::ScaleToFill => (kx, ky),
            ContentMode::AspectFit => (kx.min(ky), kx.min(ky)),
            ContentMode::AspectFill => (kx.max(ky), kx.max(ky)),
        };
        Self {
            scale_x,
            scale_y,
            offset_x: (tw - sw * scale_x) / 2.0,
            offset_y: (th - sh * scale_y) / 2.0,
        }
    }
}

/// Resample `source` into a raster of exactly `target` size.
///
/// `aspectFit` leaves letterbox bars transparent; `aspectFill` crops the overflow.
pub fn fit_into(source: &FrameRGBA, target: Size, mode: ContentMode) -> FrameRGBA {
    if source.size() == target {
        return source.clone();
    }
    let mut out = FrameRGBA::transparent(target);
    if target.is_empty() || source.size().is_empty() {
        return out;
    }
    let fit = FitTransform::new(source.size(), target, mode);
    let (sw, sh) = (f64::from(source.width), f64::from(source.height));
    out.data
        .par_chunks_exact_mut(target.width as usize * 4)
        .enumerate()
        .for_each(|(y, row)| {
            let sy = (y as f64 + 0.5 - fit.offset_y) / fit.scale_y;
            if !(0.0..sh).contains(&sy) {
                return;
            }
            for (x, px) in row.chunks_exact_mut(4).enumerate() {
                let sx = (x as f64 + 0.5 - fit.offset_x) / fit.scale_x;
                if !(0.0..sw).contains(&sx) {
                    continue;
                }
                // Inside the content rect: clamp so magnified borders do not fade out.
                px.copy_from_slice(&source.sample_bilinear(
                    sx.clamp(0.5, sw - 0.5),
                    sy.clamp(0.5, sh - 0.5),
                ));
            }
        });
    out
}

#[cfg(test)]
#[path = "../../tests/unit/render/fit.rs"]
mod tests;
