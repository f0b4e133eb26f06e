use super::*;

#[test]
fn neutral_parameters_skip_the_color_matrix() {
    assert!(video_color_matrix(100.0, 100.0, 100.0).is_none());
    assert!(video_color_matrix(101.0, 100.0, 100.0).is_some());
}

#[test]
fn identity_matrix_preserves_pixels() {
    let id: [f32; 20] = [
        1.0, 0.0, 0.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, 0.0, //
        0.0, 0.0, 0.0, 1.0, 0.0,
    ];
    let src = [200u8, 100, 50, 255, 0, 0, 0, 0];
    let mut dst = [0u8; 8];
    color_matrix_rgba8_premul(&src, &mut dst, id);
    assert_eq!(dst, src);
}

#[test]
fn zero_saturation_grays_out_color() {
    let m = video_color_matrix(100.0, 100.0, 0.0).unwrap();
    // Opaque pure red.
    let src = [255u8, 0, 0, 255];
    let mut dst = [0u8; 4];
    color_matrix_rgba8_premul(&src, &mut dst, m);
    assert_eq!(dst[0], dst[1]);
    assert_eq!(dst[1], dst[2]);
    assert_eq!(dst[3], 255);
    // Red's luma share is small; gray must be dark.
    assert!(dst[0] < 80, "got {}", dst[0]);
}

#[test]
fn brightness_scales_channels() {
    let m = video_color_matrix(200.0, 100.0, 100.0).unwrap();
    let src = [50u8, 100, 25, 255];
    let mut dst = [0u8; 4];
    color_matrix_rgba8_premul(&src, &mut dst, m);
    assert_eq!(dst, [100, 200, 50, 255]);
}

#[test]
fn contrast_pivots_around_middle_gray() {
    let m = video_color_matrix(100.0, 200.0, 100.0).unwrap();
    // Middle gray stays put under pure contrast.
    let src = [128u8, 128, 128, 255];
    let mut dst = [0u8; 4];
    color_matrix_rgba8_premul(&src, &mut dst, m);
    for c in 0..3 {
        assert!((i16::from(dst[c]) - 128).abs() <= 2, "channel {c}: {}", dst[c]);
    }
}

#[test]
fn video_frame_cache_evicts_least_recently_used() {
    let mut cache = VideoFrameCache::new();
    let frame = crate::assets::decode::PreparedImage {
        width: 1,
        height: 1,
        rgba8_premul: std::sync::Arc::new(vec![0, 0, 0, 255]),
    };
    for i in 0..(VIDEO_FRAME_CACHE_CAPACITY as u64 + 8) {
        cache.insert(i, frame.clone());
    }
    assert!(cache.get(0).is_none());
    assert!(cache.get(VIDEO_FRAME_CACHE_CAPACITY as u64 + 7).is_some());
}

#[test]
fn placement_transforms_center_content() {
    let placement = Placement {
        x: 256.0,
        y: 256.0,
        scale_x: 2.0,
        scale_y: 2.0,
        rotation_deg: 0.0,
    };
    let tr = placement.content_transform(100.0, 50.0);
    // Content center maps onto the node position.
    let p = tr * crate::foundation::core::Point::new(50.0, 25.0);
    assert!((p.x - 256.0).abs() < 1e-9);
    assert!((p.y - 256.0).abs() < 1e-9);
    // Corners land scaled around it.
    let corner = tr * crate::foundation::core::Point::new(0.0, 0.0);
    assert!((corner.x - 156.0).abs() < 1e-9);
    assert!((corner.y - 206.0).abs() < 1e-9);
}
