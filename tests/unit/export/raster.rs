use super::*;
use crate::foundation::error::EngineError;
use crate::scene::node::ShapeKind;

struct MockRasterizer {
    fail: bool,
    calls: usize,
}

impl MockRasterizer {
    fn new(fail: bool) -> Self {
        Self { fail, calls: 0 }
    }
}

impl Rasterizer for MockRasterizer {
    fn rasterize(&mut self, stage: &Stage, _time_secs: f64) -> EngineResult<FrameRGBA> {
        self.calls += 1;
        // The exporter must never hand us a stage with the transformer shown.
        assert!(!stage.overlays_enabled());
        if self.fail {
            return Err(EngineError::render("injected rasterizer failure"));
        }
        Ok(FrameRGBA {
            width: 4,
            height: 4,
            data: [255u8, 0, 0, 255].repeat(16),
        })
    }

    fn rasterize_mask(&mut self, _stage: &Stage) -> EngineResult<FrameRGBA> {
        Ok(FrameRGBA {
            width: 2,
            height: 2,
            data: [0u8, 0, 0, 255].repeat(4),
        })
    }
}

fn selected_stage() -> Stage {
    let mut stage = Stage::new();
    stage.add_shape(ShapeKind::Rect).unwrap();
    stage
}

#[test]
fn png_export_produces_decodable_bytes() {
    let mut stage = selected_stage();
    let mut raster = MockRasterizer::new(false);

    let artifact = render_png(&mut stage, &mut raster).unwrap();
    assert_eq!(artifact.file_name, "emote.png");
    assert_eq!((artifact.width, artifact.height), (4, 4));

    let decoded = image::load_from_memory(&artifact.bytes).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (4, 4));
}

#[test]
fn overlay_is_restored_after_a_successful_export() {
    let mut stage = selected_stage();
    assert!(stage.overlays_enabled());

    render_png(&mut stage, &mut MockRasterizer::new(false)).unwrap();
    assert!(stage.overlays_enabled());
    assert!(stage.selection().is_some());
}

#[test]
fn overlay_is_restored_even_when_rasterization_fails() {
    let mut stage = selected_stage();
    let err = render_png(&mut stage, &mut MockRasterizer::new(true)).unwrap_err();
    assert!(matches!(err, EngineError::Render(_)));

    // The transformer must come back and stay attached to the selection.
    assert!(stage.overlays_enabled());
    assert!(stage.selection().is_some());
}

#[test]
fn sized_export_rescales_to_the_preset() {
    let mut stage = selected_stage();
    for (preset, edge) in [
        (SizePreset::Large128, 128),
        (SizePreset::Medium112, 112),
        (SizePreset::Small56, 56),
        (SizePreset::Tiny28, 28),
    ] {
        let artifact = render_sized_png(&mut stage, &mut MockRasterizer::new(false), preset).unwrap();
        assert_eq!((artifact.width, artifact.height), (edge, edge));
        assert_eq!(artifact.file_name, format!("emote_{edge}.png"));

        let decoded = image::load_from_memory(&artifact.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (edge, edge));
    }
    assert!(stage.overlays_enabled());
}
