use super::*;

const MONOTONIC: [Ease; 8] = [
    Ease::Linear,
    Ease::InQuad,
    Ease::OutQuad,
    Ease::InOutQuad,
    Ease::InCubic,
    Ease::OutCubic,
    Ease::InOutCubic,
    Ease::InOutSine,
];

#[test]
fn endpoints_are_stable() {
    for ease in MONOTONIC {
        assert!(ease.apply(0.0).abs() < 1e-12);
        assert!((ease.apply(1.0) - 1.0).abs() < 1e-12);
    }
}

#[test]
fn monotonic_spot_check() {
    for ease in MONOTONIC {
        let a = ease.apply(0.25);
        let b = ease.apply(0.5);
        let c = ease.apply(0.75);
        assert!(a < b);
        assert!(b < c);
    }
}

#[test]
fn cycle_oscillates() {
    let e = Ease::Cycle { cycles: 1.0 };
    assert!((e.apply(0.25) - 1.0).abs() < 1e-12);
    assert!((e.apply(0.75) + 1.0).abs() < 1e-12);
}

#[test]
fn custom_interpolation_is_applied_and_sanitized() {
    let half = Interpolation::custom(|t| t / 2.0);
    assert_eq!(half.apply(1.0), 0.5);
    let broken = Interpolation::custom(|_| f64::NAN);
    assert_eq!(broken.apply(0.3), 0.0);
}

#[test]
fn ease_names_deserialize_snake_case() {
    let e: Ease = serde_json::from_str("\"in_out_cubic\"").unwrap();
    assert_eq!(e, Ease::InOutCubic);
    let c: Ease = serde_json::from_str(r#"{"cycle":{"cycles":2.0}}"#).unwrap();
    assert_eq!(c, Ease::Cycle { cycles: 2.0 });
}
