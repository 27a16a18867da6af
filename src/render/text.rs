//! Coloring and layering of rasterized text.

use crate::assets::text::{GlyphMask, TextRasterizer};
use crate::effects::blur::{gaussian_blur, sigma_for_radius};
use crate::effects::composite::{apply_opacity_in_place, over_at};
use crate::foundation::core::{Color, Size};
use crate::foundation::error::MontageResult;
use crate::foundation::time::Timestamp;
use crate::render::frame::FrameRGBA;
use crate::scene::media::{TextAlignment, TextItem};

/// Render `item` at clip-local `elapsed` into a frame of `size`.
///
/// Layers bottom to top: shadow, strokes in declared order, fill.
pub fn render_text(
    item: &TextItem,
    elapsed: Timestamp,
    size: Size,
    rasterizer: &dyn TextRasterizer,
) -> MontageResult<FrameRGBA> {
    let mut out = FrameRGBA::transparent(size);
    let (visible, alpha) = item.visible_at(elapsed);
    if visible.is_empty() || alpha <= 0.0 || size.is_empty() {
        return Ok(out);
    }
    let mask = rasterizer.rasterize(visible, &item.font, item.alignment, size.width)?;
    if mask.width == 0 || mask.height == 0 {
        return Ok(out);
    }
    let x = match item.alignment {
        TextAlignment::Leading => 0,
        TextAlignment::Center => (i64::from(size.width) - i64::from(mask.width)) / 2,
        TextAlignment::Trailing => i64::from(size.width) - i64::from(mask.width),
    };
    let y = (i64::from(size.height) - i64::from(mask.height)) / 2;

    if let Some(shadow) = item.shadow {
        let radius = shadow.radius.max(0.0).round() as u32;
        let pad = i64::from(radius);
        let padded = colorize(&mask, shadow.color, radius);
        let blurred = gaussian_blur(&padded, radius, sigma_for_radius(f64::from(radius)))?;
        over_at(
            &mut out,
            &blurred,
            x - pad + shadow.offset.x.round() as i64,
            y - pad + shadow.offset.y.round() as i64,
            1.0,
        );
    }
    for stroke in &item.strokes {
        let grow = stroke.width.max(0.0).round() as u32;
        let layer = colorize(&mask.dilated(grow), stroke.color, 0);
        over_at(&mut out, &layer, x - i64::from(grow), y - i64::from(grow), 1.0);
    }
    over_at(&mut out, &colorize(&mask, item.color, 0), x, y, 1.0);

    apply_opacity_in_place(&mut out.data, alpha);
    Ok(out)
}

/// Premultiplied frame of `color` modulated by mask coverage, with `pad` transparent pixels
/// on every side.
fn colorize(mask: &GlyphMask, color: Color, pad: u32) -> FrameRGBA {
    let size = Size::new(mask.width + 2 * pad, mask.height + 2 * pad);
    let mut out = FrameRGBA::transparent(size);
    let c = color.clamped();
    for my in 0..mask.height {
        for mx in 0..mask.width {
            let cov = f32::from(mask.at(i64::from(mx), i64::from(my))) / 255.0;
            let a = c.alpha * cov;
            if a <= 0.0 {
                continue;
            }
            let q = |v: f32| (v * a * 255.0).round() as u8;
            out.set_pixel(
                mx + pad,
                my + pad,
                [q(c.red), q(c.green), q(c.blue), (a * 255.0).round() as u8],
            );
        }
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/render/text.rs"]
mod tests;
