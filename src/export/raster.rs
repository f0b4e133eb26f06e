//! Static raster (PNG) export at the supported size presets.

use std::io::Cursor;

use anyhow::Context;

use crate::foundation::error::EngineResult;
use crate::foundation::math::unpremultiply_rgba8_in_place;
use crate::render::compositor::{FrameRGBA, Rasterizer};
use crate::scene::stage::Stage;

/// Exported PNG bytes plus a suggested download name.
#[derive(Clone, Debug)]
pub struct PngArtifact {
    /// Encoded PNG bytes.
    pub bytes: Vec<u8>,
    /// Pixel width.
    pub width: u32,
    /// Pixel height.
    pub height: u32,
    /// Suggested download file name.
    pub file_name: String,
}

/// Fixed output dimensions for platform-specific emote slots.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SizePreset {
    /// 128×128 px.
    Large128,
    /// 112×112 px.
    Medium112,
    /// 56×56 px.
    Small56,
    /// 28×28 px.
    Tiny28,
}

impl SizePreset {
    /// Edge length in pixels.
    pub fn edge(self) -> u32 {
        match self {
            SizePreset::Large128 => 128,
            SizePreset::Medium112 => 112,
            SizePreset::Small56 => 56,
            SizePreset::Tiny28 => 28,
        }
    }
}

/// Balanced hide/restore of the selection transformer around a rasterization.
///
/// Restore is explicit and happens before any `?`, so a failing rasterizer
/// can never leave the overlay hidden.
pub(crate) struct OverlayGuard {
    prev: bool,
}

impl OverlayGuard {
    pub(crate) fn hide(stage: &mut Stage) -> Self {
        Self {
            prev: stage.set_overlays_enabled(false),
        }
    }

    pub(crate) fn restore(self, stage: &mut Stage) {
        stage.set_overlays_enabled(self.prev);
    }
}

/// Rasterize the stage at its current clock and encode it as a PNG.
///
/// The selection transformer is hidden for the capture and restored on every
/// path, including a rasterizer failure.
pub fn render_png(stage: &mut Stage, raster: &mut dyn Rasterizer) -> EngineResult<PngArtifact> {
    let guard = OverlayGuard::hide(stage);
    let result = raster.rasterize(stage, stage.clock_secs());
    guard.restore(stage);
    let frame = result?;

    let bytes = encode_png(&frame)?;
    Ok(PngArtifact {
        bytes,
        width: frame.width,
        height: frame.height,
        file_name: "emote.png".to_owned(),
    })
}

/// Like [`render_png`], re-scaled to a fixed platform preset.
pub fn render_sized_png(
    stage: &mut Stage,
    raster: &mut dyn Rasterizer,
    preset: SizePreset,
) -> EngineResult<PngArtifact> {
    let guard = OverlayGuard::hide(stage);
    let result = raster.rasterize(stage, stage.clock_secs());
    guard.restore(stage);
    let frame = result?;

    let edge = preset.edge();
    let image = frame_to_rgba_image(&frame)?;
    let resized = image::imageops::resize(&image, edge, edge, image::imageops::FilterType::Lanczos3);

    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgba8(resized)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .context("encode resized png")?;

    Ok(PngArtifact {
        bytes,
        width: edge,
        height: edge,
        file_name: format!("emote_{edge}.png"),
    })
}

/// Encode a premultiplied frame as straight-alpha PNG bytes.
pub(crate) fn encode_png(frame: &FrameRGBA) -> EngineResult<Vec<u8>> {
    let image = frame_to_rgba_image(frame)?;
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgba8(image)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .context("encode png")?;
    Ok(bytes)
}

fn frame_to_rgba_image(frame: &FrameRGBA) -> EngineResult<image::RgbaImage> {
    use crate::foundation::error::EngineError;

    let mut data = frame.data.clone();
    unpremultiply_rgba8_in_place(&mut data);
    image::RgbaImage::from_raw(frame.width, frame.height, data)
        .ok_or_else(|| EngineError::render("frame byte length does not match dimensions"))
}

#[cfg(test)]
#[path = "../../tests/unit/export/raster.rs"]
mod tests;