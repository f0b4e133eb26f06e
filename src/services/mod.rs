//! Narrow interfaces to the surrounding product's external collaborators.
//!
//! The engine consumes these services but never implements them: transport,
//! auth and billing live on the other side of the trait boundary. The one
//! exception is mask generation, which is purely local.

use serde::Serialize;

use crate::assets::loader::ResourceLoader;
use crate::export::raster::{PngArtifact, encode_png};
use crate::foundation::error::{EngineError, EngineResult};
use crate::render::compositor::Rasterizer;
use crate::scene::node::NodeKind;
use crate::scene::stage::Stage;

/// Opaque identifier of a persisted emote record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, serde::Deserialize)]
pub struct RecordId(pub String);

/// Payload accepted by the save endpoint.
#[derive(Clone, Debug, Serialize)]
pub struct SaveRequest {
    /// Prompt the emote was generated from (may be empty for uploads).
    pub prompt: String,
    /// Exported image url, for static emotes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Exported video url, for animated emotes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    /// Style tag.
    pub style: String,
    /// Generation model tag.
    pub model: String,
    /// Whether the persisted record is a video.
    pub is_video: bool,
}

/// Persists a finished emote; the engine treats the record as opaque.
pub trait SaveEndpoint {
    /// Persist `request` and return the new record id.
    fn save(&self, request: &SaveRequest) -> EngineResult<RecordId>;
}

/// Removes the background from an image, returning a new image url.
pub trait BackgroundRemovalService {
    /// Produce a background-free rendition of `image_url`.
    fn remove_background(&self, image_url: &str) -> EngineResult<String>;
}

/// Payload accepted by the inpainting service.
#[derive(Clone, Debug, Serialize)]
pub struct InpaintRequest {
    /// Edit instruction.
    pub prompt: String,
    /// Source image url.
    pub image_url: String,
    /// Mask url; white marks the region to repaint.
    pub mask_url: String,
}

/// Repaints the masked region of an image, returning a new image url.
pub trait InpaintService {
    /// Produce an inpainted rendition per `request`.
    fn inpaint(&self, request: &InpaintRequest) -> EngineResult<String>;
}

/// Swap the selected image node's source for a background-free rendition,
/// preserving the node's transform.
///
/// A service or load failure leaves the scene untouched.
pub fn remove_background(
    stage: &mut Stage,
    loader: &mut ResourceLoader,
    service: &dyn BackgroundRemovalService,
) -> EngineResult<()> {
    let source = selected_image_source(stage)?;
    let new_url = service.remove_background(&source)?;
    let handle = loader.load(&new_url)?;
    stage.replace_selected_image(handle)
}

/// Replace the selected image node with an inpainted rendition, preserving the
/// node's transform.
pub fn inpaint_selected(
    stage: &mut Stage,
    loader: &mut ResourceLoader,
    service: &dyn InpaintService,
    prompt: impl Into<String>,
    mask_url: impl Into<String>,
) -> EngineResult<()> {
    let source = selected_image_source(stage)?;
    let request = InpaintRequest {
        prompt: prompt.into(),
        image_url: source,
        mask_url: mask_url.into(),
    };
    let new_url = service.inpaint(&request)?;
    let handle = loader.load(&new_url)?;
    stage.replace_selected_image(handle)
}

/// Composite every mask-tagged node over an opaque black background.
///
/// Purely local: this never leaves the process.
pub fn generate_mask(stage: &Stage, raster: &mut dyn Rasterizer) -> EngineResult<PngArtifact> {
    let frame = raster.rasterize_mask(stage)?;
    let bytes = encode_png(&frame)?;
    Ok(PngArtifact {
        bytes,
        width: frame.width,
        height: frame.height,
        file_name: "mask.png".to_owned(),
    })
}

fn selected_image_source(stage: &Stage) -> EngineResult<String> {
    let node = stage
        .selected_node()
        .ok_or_else(|| EngineError::invalid_selection("no node selected"))?;
    match &node.kind {
        NodeKind::Image(img) => Ok(img.handle.source.clone()),
        _ => Err(EngineError::invalid_selection(
            "selected node is not an image",
        )),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/services.rs"]
mod tests;
