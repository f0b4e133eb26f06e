use std::path::Path;
use std::sync::Arc;

use super::*;
use crate::assets::decode::PreparedImage;
use crate::assets::loader::LocalFetcher;
use crate::assets::media::{VideoDecoder, VideoProbe};
use crate::foundation::error::EngineError;

struct StubDecoder {
    duration: f64,
}

impl VideoDecoder for StubDecoder {
    fn probe(&self, source_path: &Path) -> EngineResult<VideoProbe> {
        Ok(VideoProbe {
            source_path: source_path.to_path_buf(),
            width: 640,
            height: 480,
            duration_secs: self.duration,
            has_audio: false,
        })
    }

    fn decode_frame(&self, _: &VideoProbe, _: f64) -> EngineResult<PreparedImage> {
        Ok(PreparedImage {
            width: 1,
            height: 1,
            rgba8_premul: Arc::new(vec![0, 0, 0, 255]),
        })
    }
}

fn image_loader(w: u32, h: u32) -> (tempfile::TempDir, ResourceLoader) {
    let dir = tempfile::tempdir().unwrap();
    let img = image::RgbaImage::from_pixel(w, h, image::Rgba([0, 255, 0, 255]));
    img.save_with_format(dir.path().join("img.png"), image::ImageFormat::Png)
        .unwrap();
    let loader = ResourceLoader::new(Box::new(LocalFetcher::new(dir.path())));
    (dir, loader)
}

fn video_loader(duration: f64) -> (tempfile::TempDir, ResourceLoader) {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("clip.mp4"), b"container bytes").unwrap();
    let loader = ResourceLoader::new(Box::new(LocalFetcher::new(dir.path())))
        .with_decoder(Box::new(StubDecoder { duration }));
    (dir, loader)
}

#[test]
fn new_images_fit_a_third_of_the_stage_and_center() {
    let (_dir, mut loader) = image_loader(200, 100);
    let mut stage = Stage::new();

    let id = stage.add_image(&mut loader, "img.png").unwrap();
    let node = stage.node(id).unwrap();

    // 512 * 0.3 / 200 = 0.768, rounded to 0.77 to dodge sub-pixel blur.
    assert_eq!(node.scale_x, 0.77);
    assert_eq!(node.scale_y, 0.77);
    assert_eq!((node.x, node.y), (256.0, 256.0));
    assert_eq!(stage.selection(), Some(id));
    assert_eq!(stage.layer(LayerKind::Main).len(), 1);
    assert_eq!(stage.undo_depth(), 1);
}

#[test]
fn new_videos_fit_most_of_the_stage() {
    let (_dir, mut loader) = video_loader(10.0);
    let mut stage = Stage::new();

    let id = stage.add_video(&mut loader, "clip.mp4").unwrap();
    let node = stage.node(id).unwrap();

    // 512 * 0.8 / 640 = 0.64.
    assert_eq!(node.scale_x, 0.64);
    let video = node.as_video().unwrap();
    assert!(video.is_ready());
    assert_eq!(video.start_time(), Some(0.0));
    assert_eq!(video.end_time(), Some(10.0));
}

#[test]
fn failed_load_leaves_the_stage_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let mut loader = ResourceLoader::new(Box::new(LocalFetcher::new(dir.path())));
    let mut stage = Stage::new();

    assert!(stage.add_image(&mut loader, "missing.png").is_err());
    assert_eq!(stage.total_nodes(), 0);
    assert_eq!(stage.selection(), None);
    assert_eq!(stage.undo_depth(), 0);
}

#[test]
fn layer_ceiling_is_enforced() {
    let mut stage = Stage::new();
    for _ in 0..MAX_LAYER_NODES {
        stage.add_shape(ShapeKind::Rect).unwrap();
    }
    let err = stage.add_shape(ShapeKind::Rect).unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[test]
fn z_order_swaps_within_the_owning_layer() {
    let mut stage = Stage::new();
    let a = stage.add_shape(ShapeKind::Rect).unwrap();
    let b = stage.add_shape(ShapeKind::Circle).unwrap();

    stage.select(Some(a)).unwrap();
    assert!(stage.bring_forward().unwrap());
    let order: Vec<NodeId> = stage
        .layer(LayerKind::Main)
        .nodes()
        .iter()
        .map(|n| n.id)
        .collect();
    assert_eq!(order, vec![b, a]);

    // Already on top.
    assert!(!stage.bring_forward().unwrap());
    assert!(stage.send_backward().unwrap());
    assert!(!stage.send_backward().unwrap());
}

#[test]
fn variant_safe_setters_are_no_ops_without_history_noise() {
    let (_dir, mut loader) = image_loader(10, 10);
    let mut stage = Stage::new();
    stage.add_image(&mut loader, "img.png").unwrap();
    let depth = stage.undo_depth();

    // Images have no fill, stroke or font; all must be quiet no-ops.
    stage.set_fill(Color::rgb(1, 2, 3)).unwrap();
    stage.set_stroke(Some(Color::rgb(1, 2, 3))).unwrap();
    stage.set_stroke_width(4.0).unwrap();
    stage.set_font_family("fonts/other.ttf").unwrap();
    stage.set_font_size(64.0).unwrap();
    assert_eq!(stage.undo_depth(), depth);
}

#[test]
fn opacity_is_clamped() {
    let mut stage = Stage::new();
    stage.add_shape(ShapeKind::Rect).unwrap();
    stage.set_opacity(2.0).unwrap();
    assert_eq!(stage.selected_node().unwrap().opacity, 1.0);
    stage.set_opacity(-1.0).unwrap();
    assert_eq!(stage.selected_node().unwrap().opacity, 0.0);
}

#[test]
fn undo_redo_round_trips_a_mutation_sequence() {
    let mut stage = Stage::new();
    stage.add_shape(ShapeKind::Rect).unwrap();
    stage.set_opacity(0.5).unwrap();

    assert!(stage.undo());
    assert_eq!(stage.selected_node().unwrap().opacity, 1.0);
    assert!(stage.undo());
    assert!(stage.layer(LayerKind::Main).is_empty());
    assert!(!stage.undo());

    assert!(stage.redo());
    assert!(stage.redo());
    assert_eq!(stage.layer(LayerKind::Main).nodes()[0].opacity, 0.5);
    assert!(!stage.redo());
}

#[test]
fn selection_is_cleared_when_its_node_is_undone_away() {
    let mut stage = Stage::new();
    let id = stage.add_shape(ShapeKind::Rect).unwrap();
    assert_eq!(stage.selection(), Some(id));
    assert!(stage.undo());
    assert_eq!(stage.selection(), None);
}

#[test]
fn remove_requires_a_selection() {
    let mut stage = Stage::new();
    let err = stage.remove_selected().unwrap_err();
    assert!(matches!(err, EngineError::InvalidSelection(_)));
}

#[test]
fn clear_drops_nodes_and_selection() {
    let mut stage = Stage::new();
    let id = stage.add_shape(ShapeKind::Rect).unwrap();
    stage.clear(LayerKind::Main);
    assert!(stage.layer(LayerKind::Main).is_empty());
    assert_eq!(stage.selection(), None);
    assert!(stage.node(id).is_none());
}

#[test]
fn switching_active_layer_never_reparents() {
    let mut stage = Stage::new();
    let id = stage.add_shape(ShapeKind::Rect).unwrap();
    stage.set_active_layer(LayerKind::Emotes);
    assert_eq!(stage.layer_of(id), Some(LayerKind::Main));
    assert_eq!(stage.total_nodes(), 1);
}

#[test]
fn selecting_an_unknown_node_is_rejected() {
    let mut stage = Stage::new();
    assert!(stage.select(Some(NodeId(42))).is_err());
    assert!(stage.select(None).is_ok());
}

#[test]
fn animation_without_a_target_is_rejected() {
    let mut stage = Stage::new();
    let err = stage
        .set_animation(Some(crate::animation::config::AnimationConfig::Spin {
            speed: 1.0,
        }))
        .unwrap_err();
    assert!(matches!(err, EngineError::AnimationTarget(_)));
}

#[test]
fn reinstalling_an_animation_leaves_exactly_the_new_set() {
    use crate::animation::config::AnimationConfig;

    let mut stage = Stage::new();
    let id = stage.add_shape(ShapeKind::Rect).unwrap();

    stage
        .set_animation(Some(AnimationConfig::Zoom { speed: 1.0 }))
        .unwrap();
    assert_eq!(stage.animations().active_tween_count(id), 2);

    stage
        .set_animation(Some(AnimationConfig::Bounce { speed: 1.0 }))
        .unwrap();
    assert_eq!(stage.animations().active_tween_count(id), 1);
    // Only the bounce track remains: no residual zoom on the sampled scale.
    let ov = stage.animations().sample(id, 0.5).unwrap();
    assert!(ov.scale_x.is_none());
    assert!(ov.y.is_some());
}

#[test]
fn detaching_an_animation_is_idempotent() {
    let mut stage = Stage::new();
    let id = stage.add_shape(ShapeKind::Rect).unwrap();
    stage
        .set_animation(Some(crate::animation::config::AnimationConfig::Spin {
            speed: 2.0,
        }))
        .unwrap();

    stage.set_animation(None).unwrap();
    assert_eq!(stage.animations().active_tween_count(id), 0);
    stage.set_animation(None).unwrap();
    assert_eq!(stage.animations().active_tween_count(id), 0);
    assert!(stage.selected_node().unwrap().animation.is_none());
}

#[test]
fn undo_and_redo_keep_tween_sets_in_sync_with_the_attribute() {
    use crate::animation::config::AnimationConfig;

    let mut stage = Stage::new();
    let id = stage.add_shape(ShapeKind::Rect).unwrap();
    stage
        .set_animation(Some(AnimationConfig::Spin { speed: 1.0 }))
        .unwrap();
    assert!(stage.animations().is_attached(id));

    assert!(stage.undo());
    assert!(stage.node(id).unwrap().animation.is_none());
    assert!(!stage.animations().is_attached(id));

    assert!(stage.redo());
    assert!(stage.node(id).unwrap().animation.is_some());
    assert!(stage.animations().is_attached(id));
}

#[test]
fn trim_setter_clamps_to_the_minimum_gap() {
    let (_dir, mut loader) = video_loader(10.0);
    let mut stage = Stage::new();
    stage.add_video(&mut loader, "clip.mp4").unwrap();

    stage.set_trim_start(9.95).unwrap();
    let video = stage.selected_node().unwrap().as_video().unwrap();
    assert_eq!(video.start_time(), Some(9.9));
}

#[test]
fn video_operations_demand_a_video_selection() {
    let mut stage = Stage::new();
    stage.add_shape(ShapeKind::Rect).unwrap();
    let err = stage.set_trim_start(1.0).unwrap_err();
    assert!(matches!(err, EngineError::InvalidSelection(_)));
    let err = stage.play_video().unwrap_err();
    assert!(matches!(err, EngineError::InvalidSelection(_)));
}

#[test]
fn ticking_the_stage_loops_playing_videos_inside_the_trim_window() {
    let (_dir, mut loader) = video_loader(10.0);
    let mut stage = Stage::new();
    let id = stage.add_video(&mut loader, "clip.mp4").unwrap();

    stage.set_trim_start(2.0).unwrap();
    stage.play_video().unwrap();
    stage.seek_video(9.8).unwrap();
    stage.advance(0.5);

    let video = stage.node(id).unwrap().as_video().unwrap();
    // Past the end: resumes from the window start, not from zero.
    assert_eq!(video.position(), 2.0);
    assert!(video.is_playing());
    assert_eq!(stage.clock_secs(), 0.5);
}

#[test]
fn video_visual_parameters_clamp_and_snapshot() {
    let (_dir, mut loader) = video_loader(10.0);
    let mut stage = Stage::new();
    let id = stage.add_video(&mut loader, "clip.mp4").unwrap();
    let depth = stage.undo_depth();

    stage.set_video_brightness(500.0).unwrap();
    stage.set_video_volume(2.0).unwrap();
    let video = stage.node(id).unwrap().as_video().unwrap();
    assert_eq!(video.brightness, 200.0);
    assert_eq!(video.volume, 1.0);
    assert_eq!(stage.undo_depth(), depth + 2);
}
