//! Text rasterization interface.

use crate::foundation::error::{MontageError, MontageResult};
use crate::scene::media::{FontSpec, TextAlignment};

/// 8-bit coverage mask of a laid-out text run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GlyphMask {
    pub width: u32,
    pub height: u32,
    /// Row-major coverage, `width * height` bytes.
    pub coverage: Vec<u8>,
}

impl GlyphMask {
    pub fn new(width: u32, height: u32, coverage: Vec<u8>) -> MontageResult<Self> {
        if coverage.len() != width as usize * height as usize {
            return Err(MontageError::validation(
                "glyph mask coverage must be width*height bytes",
            ));
        }
        Ok(Self {
            width,
            height,
            coverage,
        })
    }

    pub fn empty() -> Self {
        Self {
            width: 0,
            height: 0,
            coverage: Vec::new(),
        }
    }

    pub fn at(&self, x: i64, y: i64) -> u8 {
        if x < 0 || y < 0 || x >= i64::from(self.width) || y >= i64::from(self.height) {
            return 0;
        }
        self.coverage[y as usize * self.width as usize + x as usize]
    }

    /// Copy grown by `radius` pixels on every side (max filter); used for outlines.
    pub fn dilated(&self, radius: u32) -> Self {
        if radius == 0 {
            return self.clone();
        }
        let r = i64::from(radius);
        let w = self.width + 2 * radius;
        let h = self.height + 2 * radius;
        let mut coverage = vec![0u8; w as usize * h as usize];
        for y in 0..i64::from(h) {
            for x in 0..i64::from(w) {
                let mut m = 0u8;
                for dy in -r..=r {
                    for dx in -r..=r {
                        if dx * dx + dy * dy > r * r {
                            continue;
                        }
                        m = m.max(self.at(x - r + dx, y - r + dy));
                    }
                }
                coverage[y as usize * w as usize + x as usize] = m;
            }
        }
        Self {
            width: w,
            height: h,
            coverage,
        }
    }
}

/// Lays out and rasterizes text. Font loading and shaping live behind this trait.
pub trait TextRasterizer: Send + Sync {
    /// Rasterize `text` wrapped to `max_width` pixels.
    fn rasterize(
        &self,
        text: &str,
        font: &FontSpec,
        alignment: TextAlignment,
        max_width: u32,
    ) -> MontageResult<GlyphMask>;
}

/// Rasterizer drawing every non-space character as a solid block of `font.size` height and
/// `font.size / 2` advance. Useful for layout tests and headless previews.
#[derive(Clone, Copy, Debug, Default)]
pub struct BlockTextRasterizer;

impl TextRasterizer for BlockTextRasterizer {
    fn rasterize(
        &self,
        text: &str,
        font: &FontSpec,
        _alignment: TextAlignment,
        max_width: u32,
    ) -> MontageResult<GlyphMask> {
        let advance = (font.size / 2.0).round().max(1.0) as u32;
        let height = font.size.round().max(1.0) as u32;
        let chars: Vec<char> = text.chars().collect();
        if chars.is_empty() {
            return Ok(GlyphMask::empty());
        }
        let width = (advance * chars.len() as u32).min(max_width.max(advance));
        let mut coverage = vec![0u8; width as usize * height as usize];
        for (i, c) in chars.iter().enumerate() {
            let x0 = i as u32 * advance;
            if c.is_whitespace() || x0 >= width {
                continue;
            }
            for y in 0..height {
                for x in x0..(x0 + advance.saturating_sub(1).max(1)).min(width) {
                    coverage[y as usize * width as usize + x as usize] = 255;
                }
            }
        }
        GlyphMask::new(width, height, coverage)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/text.rs"]
mod tests;
