use anyhow::Context;

use crate::foundation::error::{MontageError, MontageResult};
use crate::render::frame::{FrameRGBA, premultiply_rgba8_in_place};

/// Decode an encoded raster (PNG, JPEG, ...) into a premultiplied frame.
pub fn decode_image(bytes: &[u8]) -> MontageResult<FrameRGBA> {
    let dyn_img = image::load_from_memory(bytes)
        .context("decode image from memory")
        .map_err(|e| MontageError::invalid_file(format!("{e:#}")))?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut data = rgba.into_raw();
    premultiply_rgba8_in_place(&mut data);
    FrameRGBA::from_premul(width, height, data)
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
