use super::*;

#[test]
fn yoyo_returns_to_base_each_cycle() {
    let t = Track::yoyo(TweenProperty::Y, 2.0, 100.0, 80.0);
    assert_eq!(t.sample(0.0), 100.0);
    assert_eq!(t.sample(1.0), 80.0);
    assert_eq!(t.sample(2.0), 100.0);
    // Quarter cycle is halfway out.
    assert_eq!(t.sample(0.5), 90.0);
    // Second cycle repeats the first.
    assert_eq!(t.sample(3.0), 80.0);
}

#[test]
fn sweep_wraps_without_yoyo() {
    let t = Track::sweep(TweenProperty::RotationDeg, 2.0, 0.0, 360.0);
    assert_eq!(t.sample(0.0), 0.0);
    assert_eq!(t.sample(0.5), 90.0);
    assert_eq!(t.sample(1.5), 270.0);
    // Wrap, not bounce: three quarters into the second cycle is 270 again.
    assert_eq!(t.sample(3.5), 270.0);
    assert_eq!(t.sample(2.0), 0.0);
}

#[test]
fn negative_time_samples_on_the_cycle() {
    let t = Track::sweep(TweenProperty::RotationDeg, 2.0, 0.0, 360.0);
    // rem_euclid keeps pre-attach times on the cycle rather than exploding.
    assert_eq!(t.sample(-0.5), 270.0);
}

#[test]
fn validate_rejects_malformed_tracks() {
    let unsorted = Track {
        property: TweenProperty::X,
        period_secs: 1.0,
        keys: vec![
            Key::linear(0.0, 0.0),
            Key::linear(0.8, 1.0),
            Key::linear(0.4, 2.0),
            Key::linear(1.0, 0.0),
        ],
    };
    assert!(unsorted.validate().is_err());

    let no_tail = Track {
        property: TweenProperty::X,
        period_secs: 1.0,
        keys: vec![Key::linear(0.0, 0.0), Key::linear(0.9, 1.0)],
    };
    assert!(no_tail.validate().is_err());

    let bad_period = Track::yoyo(TweenProperty::X, 0.0, 0.0, 1.0);
    assert!(bad_period.validate().is_err());
}

#[test]
fn dwell_track_holds_its_plateau() {
    let t = dwell_track(TweenProperty::Y, 2.0, -120.0, -60.0, (0.45, 0.55));
    // Contact is held flat through the dwell window, not a sinusoid.
    assert_eq!(t.sample(0.9), -60.0);
    assert_eq!(t.sample(1.0), -60.0);
    assert_eq!(t.sample(1.1), -60.0);
    // Edges rest.
    assert_eq!(t.sample(0.0), -120.0);
    assert_eq!(t.sample(2.0), -120.0);
    // Mid-approach is strictly between rest and contact.
    let v = t.sample(0.45);
    assert!(v > -120.0 && v < -60.0);
}

#[test]
fn ease_shapes() {
    assert_eq!(Ease::Linear.apply(0.25), 0.25);
    assert_eq!(Ease::InQuad.apply(0.5), 0.25);
    assert_eq!(Ease::OutQuad.apply(0.5), 0.75);
    assert_eq!(Ease::InOutQuad.apply(0.5), 0.5);
    // Out-of-range progress clamps.
    assert_eq!(Ease::Linear.apply(2.0), 1.0);
}
