use crate::foundation::core::{Rgba8Premul, Size};
use crate::foundation::error::{MontageError, MontageResult};

/// A raster frame as RGBA8 pixels.
///
/// Frames are **premultiplied alpha** end-to-end; the `premultiplied` flag makes this explicit at
/// API boundaries where sinks may need straight alpha.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRGBA {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
    /// Whether the `data` is premultiplied alpha.
    pub premultiplied: bool,
}

impl FrameRGBA {
    /// Fully transparent frame.
    pub fn transparent(size: Size) -> Self {
        Self {
            width: size.width,
            height: size.height,
            data: vec![0u8; size.area() * 4],
            premultiplied: true,
        }
    }

    /// Frame filled with one premultiplied color.
    pub fn filled(size: Size, px: Rgba8Premul) -> Self {
        Self {
            width: size.width,
            height: size.height,
            data: px.to_array().repeat(size.area()),
            premultiplied: true,
        }
    }

    /// Wrap premultiplied bytes, validating the length.
    pub fn from_premul(width: u32, height: u32, data: Vec<u8>) -> MontageResult<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(4))
            .ok_or_else(|| MontageError::validation("frame size overflow"))?;
        if data.len() != expected {
            return Err(MontageError::validation(format!(
                "frame data length {} does not match {width}x{height}x4",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
            premultiplied: true,
        })
    }

    /// Wrap straight-alpha bytes, premultiplying them.
    pub fn from_straight(width: u32, height: u32, mut data: Vec<u8>) -> MontageResult<Self> {
        premultiply_rgba8_in_place(&mut data);
        Self::from_premul(width, height, data)
    }

    /// Frame extent.
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Return `true` if `other` has the same extent.
    pub fn same_extent(&self, other: &Self) -> bool {
        self.width == other.width && self.height == other.height
    }

    /// Pixel at `(x, y)`; out-of-bounds reads return transparent.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        if x >= self.width || y >= self.height {
            return [0; 4];
        }
        let i = self.index(x, y);
        [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]
    }

    /// Overwrite the pixel at `(x, y)`; out-of-bounds writes are ignored.
    pub fn set_pixel(&mut self, x: u32, y: u32, px: [u8; 4]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let i = self.index(x, y);
        self.data[i..i + 4].copy_from_slice(&px);
    }

    /// Bilinear sample at continuous pixel coordinates (pixel centers at `+0.5`).
    ///
    /// Samples outside the frame are transparent, so shrinking transforms never stretch edges.
    pub fn sample_bilinear(&self, x: f64, y: f64) -> [u8; 4] {
        let fx = x - 0.5;
        let fy = y - 0.5;
        let x0 = fx.floor();
        let y0 = fy.floor();
        let tx = (fx - x0) as f32;
        let ty = (fy - y0) as f32;
        let (x0, y0) = (x0 as i64, y0 as i64);

        let fetch = |xi: i64, yi: i64| -> [f32; 4] {
            if xi < 0 || yi < 0 || xi >= i64::from(self.width) || yi >= i64::from(self.height) {
                return [0.0; 4];
            }
            let p = self.pixel(xi as u32, yi as u32);
            [
                f32::from(p[0]),
                f32::from(p[1]),
                f32::from(p[2]),
                f32::from(p[3]),
            ]
        };

        let p00 = fetch(x0, y0);
        let p10 = fetch(x0 + 1, y0);
        let p01 = fetch(x0, y0 + 1);
        let p11 = fetch(x0 + 1, y0 + 1);
        let mut out = [0u8; 4];
        for c in 0..4 {
            let top = p00[c] + (p10[c] - p00[c]) * tx;
            let bottom = p01[c] + (p11[c] - p01[c]) * tx;
            out[c] = (top + (bottom - top) * ty).round().clamp(0.0, 255.0) as u8;
        }
        out
    }

    /// Copy of this frame cropped or padded (transparent) to `size`, anchored at the origin.
    pub fn cropped_to(&self, size: Size) -> Self {
        if self.size() == size {
            return self.clone();
        }
        let mut out = Self::transparent(size);
        let w = self.width.min(size.width) as usize;
        for y in 0..self.height.min(size.height) as usize {
            let src = y * self.width as usize * 4;
            let dst = y * size.width as usize * 4;
            out.data[dst..dst + w * 4].copy_from_slice(&self.data[src..src + w * 4]);
        }
        out
    }

    fn index(&self, x: u32, y: u32) -> usize {
        ((y as usize) * (self.width as usize) + (x as usize)) * 4
    }
}

pub(crate) fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}

/// Convert one premultiplied pixel to straight-alpha unit floats.
pub(crate) fn unpremul_unit(px: [u8; 4]) -> [f32; 4] {
    let a = f32::from(px[3]) / 255.0;
    if a <= 0.0 {
        return [0.0; 4];
    }
    [
        (f32::from(px[0]) / 255.0 / a).min(1.0),
        (f32::from(px[1]) / 255.0 / a).min(1.0),
        (f32::from(px[2]) / 255.0 / a).min(1.0),
        a,
    ]
}

/// Convert straight-alpha unit floats back to a premultiplied pixel.
pub(crate) fn premul_from_unit(c: [f32; 4]) -> [u8; 4] {
    let a = c[3].clamp(0.0, 1.0);
    let q = |v: f32| (v.clamp(0.0, 1.0) * a * 255.0).round() as u8;
    [q(c[0]), q(c[1]), q(c[2]), (a * 255.0).round() as u8]
}

#[cfg(test)]
#[path = "../../tests/unit/render/frame.rs"]
mod tests;
