use super::*;

#[test]
fn speed_must_be_positive_and_finite() {
    assert!(AnimationConfig::Spin { speed: 0.0 }.validate().is_err());
    assert!(AnimationConfig::Shake { speed: -1.0 }.validate().is_err());
    assert!(
        AnimationConfig::Bounce {
            speed: f64::INFINITY
        }
        .validate()
        .is_err()
    );
    assert!(AnimationConfig::Zoom { speed: 0.5 }.validate().is_ok());
    assert!(AnimationConfig::None.validate().is_ok());
}

#[test]
fn pet_parameters_are_range_checked() {
    let ok = AnimationConfig::Pet {
        speed: 1.0,
        hand_x: 50.0,
        hand_y: 0.0,
        pat_distance: 60.0,
    };
    assert!(ok.validate().is_ok());

    let bad_x = AnimationConfig::Pet {
        speed: 1.0,
        hand_x: 120.0,
        hand_y: 0.0,
        pat_distance: 60.0,
    };
    assert!(bad_x.validate().is_err());

    let bad_pat = AnimationConfig::Pet {
        speed: 1.0,
        hand_x: 50.0,
        hand_y: 0.0,
        pat_distance: 10.0,
    };
    assert!(bad_pat.validate().is_err());
}

#[test]
fn one_cycle_lasts_two_over_speed() {
    assert_eq!(AnimationConfig::Spin { speed: 1.0 }.cycle_secs(), Some(2.0));
    assert_eq!(AnimationConfig::Slide { speed: 4.0 }.cycle_secs(), Some(0.5));
    assert_eq!(AnimationConfig::None.cycle_secs(), None);
}

#[test]
fn serde_tagging_round_trips() {
    let cfg = AnimationConfig::Pet {
        speed: 2.0,
        hand_x: 40.0,
        hand_y: -5.0,
        pat_distance: 80.0,
    };
    let json = serde_json::to_string(&cfg).unwrap();
    assert!(json.contains("\"type\":\"pet\""));
    assert!(json.contains("\"hand_x\":40.0"));

    let back: AnimationConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back, cfg);

    let spin: AnimationConfig = serde_json::from_str(r#"{"type":"spin","speed":1.5}"#).unwrap();
    assert_eq!(spin, AnimationConfig::Spin { speed: 1.5 });
}
