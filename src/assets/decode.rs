//! Image decoding into prepared, premultiplied pixel buffers.

use std::sync::Arc;

use anyhow::Context;

use crate::foundation::error::EngineResult;
use crate::foundation::math::premultiply_rgba8_in_place;

#[derive(Clone, Debug)]
/// Prepared raster image in premultiplied RGBA8 form.
pub struct PreparedImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel bytes in row-major premultiplied RGBA8.
    pub rgba8_premul: Arc<Vec<u8>>,
}

/// Decode an encoded image (PNG/JPEG/...) into premultiplied RGBA8.
pub fn decode_image(bytes: &[u8]) -> EngineResult<PreparedImage> {
    let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);

    Ok(PreparedImage {
        width,
        height,
        rgba8_premul: Arc::new(rgba8_premul),
    })
}

/// Wrap raw straight-alpha RGBA8 bytes as a [`PreparedImage`].
pub(crate) fn prepare_straight_rgba8(
    bytes: Vec<u8>,
    width: u32,
    height: u32,
) -> EngineResult<PreparedImage> {
    use crate::foundation::error::EngineError;

    let expected = (width as usize)
        .saturating_mul(height as usize)
        .saturating_mul(4);
    if bytes.len() != expected {
        return Err(EngineError::resource_load(format!(
            "raw frame has {} bytes, expected {expected}",
            bytes.len()
        )));
    }
    let mut premul = bytes;
    premultiply_rgba8_in_place(&mut premul);
    Ok(PreparedImage {
        width,
        height,
        rgba8_premul: Arc::new(premul),
    })
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;