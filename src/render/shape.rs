//! Vector shape rasterization for shape media items.

use kurbo::{BezPath, Ellipse, ParamCurveNearest, Rect, RoundedRect, Shape};
use rayon::prelude::*;

use crate::foundation::core::{Point, Size};
use crate::render::frame::FrameRGBA;
use crate::scene::media::{ShapeItem, ShapeKind};

/// Supersampling grid per axis for fill coverage.
const SS: usize = 4;
const TOLERANCE: f64 = 0.1;

/// Outline of `item` inset so a centered stroke stays inside `size`.
pub fn shape_path(item: &ShapeItem, size: Size) -> BezPath {
    let inset = f64::from(item.stroke_width.max(0.0)) / 2.0;
    let (w, h) = (f64::from(size.width), f64::from(size.height));
    let rect = Rect::new(inset, inset, (w - inset).max(inset), (h - inset).max(inset));
    match item.kind {
        ShapeKind::Rectangle => rect.to_path(TOLERANCE),
        ShapeKind::RoundedRectangle => {
            let r = item
                .corner_radius
                .min(rect.width() / 2.0)
                .min(rect.height() / 2.0);
            RoundedRect::from_rect(rect, r).to_path(TOLERANCE)
        }
        ShapeKind::Ellipse => Ellipse::from_rect(rect).to_path(TOLERANCE),
        ShapeKind::Triangle => {
            let mut p = BezPath::new();
            p.move_to((rect.center().x, rect.y0));
            p.line_to((rect.x1, rect.y1));
            p.line_to((rect.x0, rect.y1));
            p.close_path();
            p
        }
    }
}

/// Rasterize `item` into a premultiplied frame of `size`.
pub fn render_shape(item: &ShapeItem, size: Size) -> FrameRGBA {
    let mut out = FrameRGBA::transparent(size);
    if size.is_empty() {
        return out;
    }
    let path = shape_path(item, size);
    let segments: Vec<_> = path.segments().collect();
    let fill = item.fill_color.clamped();
    let stroke = item.stroke_color.clamped();
    let half_stroke = f64::from(item.stroke_width.max(0.0)) / 2.0;
    let stroke_on = half_stroke > 0.0 && stroke.alpha > 0.0;

    out.data
        .par_chunks_exact_mut(size.width as usize * 4)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, px) in row.chunks_exact_mut(4).enumerate() {
                let mut inside = 0usize;
                for sy in 0..SS {
                    for sx in 0..SS {
                        let p = Point::new(
                            x as f64 + (sx as f64 + 0.5) / SS as f64,
                            y as f64 + (sy as f64 + 0.5) / SS as f64,
                        );
                        if path.contains(p) {
                            inside += 1;
                        }
                    }
                }
                let fill_cov = inside as f32 / (SS * SS) as f32;
                let mut c = premul(fill.red, fill.green, fill.blue, fill.alpha * fill_cov);

                if stroke_on {
                    let center = Point::new(x as f64 + 0.5, y as f64 + 0.5);
                    let d = segments
                        .iter()
                        .map(|s| s.nearest(center, 1e-3).distance_sq)
                        .fold(f64::INFINITY, f64::min)
                        .sqrt();
                    let cov = (half_stroke + 0.5 - d).clamp(0.0, 1.0) as f32;
                    let s = premul(stroke.red, stroke.green, stroke.blue, stroke.alpha * cov);
                    for i in 0..4 {
                        c[i] = s[i] + c[i] * (1.0 - s[3]);
                    }
                }

                for i in 0..4 {
                    px[i] = (c[i].clamp(0.0, 1.0) * 255.0).round() as u8;
                }
            }
        });
    out
}

fn premul(r: f32, g: f32, b: f32, a: f32) -> [f32; 4] {
    [r * a, g * a, b * a, a]
}

#[cfg(test)]
#[path = "../../tests/unit/render/shape.rs"]
mod tests;
