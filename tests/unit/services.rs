use super::*;
use crate::assets::loader::LocalFetcher;
use crate::render::compositor::FrameRGBA;
use crate::scene::node::ShapeKind;

struct MaskOnlyRasterizer;

impl Rasterizer for MaskOnlyRasterizer {
    fn rasterize(&mut self, _stage: &Stage, _time_secs: f64) -> EngineResult<FrameRGBA> {
        unreachable!("mask generation never renders the full stage")
    }

    fn rasterize_mask(&mut self, _stage: &Stage) -> EngineResult<FrameRGBA> {
        Ok(FrameRGBA {
            width: 2,
            height: 2,
            data: [0u8, 0, 0, 255].repeat(4),
        })
    }
}

struct FixedRemoval {
    url: Option<String>,
}

impl BackgroundRemovalService for FixedRemoval {
    fn remove_background(&self, _image_url: &str) -> EngineResult<String> {
        self.url
            .clone()
            .ok_or_else(|| EngineError::external_service("removal backend down"))
    }
}

struct FixedInpaint {
    url: String,
    seen: std::cell::RefCell<Option<InpaintRequest>>,
}

impl InpaintService for FixedInpaint {
    fn inpaint(&self, request: &InpaintRequest) -> EngineResult<String> {
        *self.seen.borrow_mut() = Some(request.clone());
        Ok(self.url.clone())
    }
}

fn two_image_fixture() -> (tempfile::TempDir, ResourceLoader, Stage) {
    let dir = tempfile::tempdir().unwrap();
    for (name, color) in [("a.png", [255u8, 0, 0, 255]), ("b.png", [0, 255, 0, 255])] {
        image::RgbaImage::from_pixel(6, 6, image::Rgba(color))
            .save_with_format(dir.path().join(name), image::ImageFormat::Png)
            .unwrap();
    }
    let mut loader = ResourceLoader::new(Box::new(LocalFetcher::new(dir.path())));
    let mut stage = Stage::new();
    stage.add_image(&mut loader, "a.png").unwrap();
    (dir, loader, stage)
}

#[test]
fn mask_generation_is_local_and_encodes_png() {
    let stage = Stage::new();
    let artifact = generate_mask(&stage, &mut MaskOnlyRasterizer).unwrap();
    assert_eq!(artifact.file_name, "mask.png");
    let decoded = image::load_from_memory(&artifact.bytes).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (2, 2));
}

#[test]
fn background_removal_swaps_the_source_in_place() {
    let (_dir, mut loader, mut stage) = two_image_fixture();
    stage.set_position(100.0, 120.0).unwrap();
    stage.set_rotation(30.0).unwrap();
    let depth = stage.undo_depth();

    remove_background(
        &mut stage,
        &mut loader,
        &FixedRemoval {
            url: Some("b.png".to_owned()),
        },
    )
    .unwrap();

    let node = stage.selected_node().unwrap();
    let NodeKind::Image(img) = &node.kind else {
        panic!("node must stay an image");
    };
    assert_eq!(img.handle.source, "b.png");
    // The node's transform survives the swap.
    assert_eq!((node.x, node.y), (100.0, 120.0));
    assert_eq!(node.rotation_deg, 30.0);
    // The swap itself is one undoable mutation.
    assert_eq!(stage.undo_depth(), depth + 1);
}

#[test]
fn removal_failure_leaves_the_scene_untouched() {
    let (_dir, mut loader, mut stage) = two_image_fixture();
    let depth = stage.undo_depth();

    let err = remove_background(&mut stage, &mut loader, &FixedRemoval { url: None }).unwrap_err();
    assert!(matches!(err, EngineError::ExternalService(_)));

    let NodeKind::Image(img) = &stage.selected_node().unwrap().kind else {
        panic!("node must stay an image");
    };
    assert_eq!(img.handle.source, "a.png");
    assert_eq!(stage.undo_depth(), depth);
}

#[test]
fn bridges_demand_an_image_selection() {
    let (_dir, mut loader, mut stage) = two_image_fixture();
    stage.add_shape(ShapeKind::Rect).unwrap();

    let err = remove_background(
        &mut stage,
        &mut loader,
        &FixedRemoval {
            url: Some("b.png".to_owned()),
        },
    )
    .unwrap_err();
    assert!(matches!(err, EngineError::InvalidSelection(_)));
}

#[test]
fn inpainting_forwards_the_mask_and_prompt() {
    let (_dir, mut loader, mut stage) = two_image_fixture();
    let service = FixedInpaint {
        url: "b.png".to_owned(),
        seen: std::cell::RefCell::new(None),
    };

    inpaint_selected(&mut stage, &mut loader, &service, "remove the hat", "mask.png").unwrap();

    let seen = service.seen.borrow();
    let request = seen.as_ref().unwrap();
    assert_eq!(request.prompt, "remove the hat");
    assert_eq!(request.image_url, "a.png");
    assert_eq!(request.mask_url, "mask.png");

    let NodeKind::Image(img) = &stage.selected_node().unwrap().kind else {
        panic!("node must stay an image");
    };
    assert_eq!(img.handle.source, "b.png");
}

#[test]
fn save_payload_omits_absent_urls() {
    let request = SaveRequest {
        prompt: "a cat".to_owned(),
        image_url: Some("cat.png".to_owned()),
        video_url: None,
        style: "sticker".to_owned(),
        model: "gen-2".to_owned(),
        is_video: false,
    };
    let json = serde_json::to_string(&request).unwrap();
    assert!(json.contains("\"image_url\":\"cat.png\""));
    assert!(!json.contains("video_url"));
}
