use super::*;

#[test]
fn empty_json_uses_defaults() {
    let cfg = ShimmerConfig::from_json_str("{}").unwrap();
    assert_eq!(cfg, ShimmerConfig::default());
    assert_eq!(cfg.angle_deg, 20.0);
    assert_eq!(cfg.duration_ms, 1200);
    assert_eq!(cfg.mode, CompositionMode::Procedural);
    assert_eq!(cfg.interpolation, Ease::Linear);
    assert!(cfg.group.is_none());
}

#[test]
fn fields_parse_from_json() {
    let cfg = ShimmerConfig::from_json_str(
        r#"{
            "angle_deg": 0,
            "band_fraction": 0.15,
            "center_fraction": 0.05,
            "duration_ms": 800,
            "color": [255, 0, 0, 255],
            "interpolation": "in_out_quad",
            "mode": "shared_mask",
            "group": "list"
        }"#,
    )
    .unwrap();
    assert_eq!(cfg.angle_deg, 0.0);
    assert_eq!(cfg.band_fraction, 0.15);
    assert_eq!(cfg.interpolation, Ease::InOutQuad);
    assert_eq!(cfg.mode, CompositionMode::SharedMask);
    assert_eq!(cfg.group.as_deref(), Some("list"));
    assert_eq!(
        cfg.color_premul(),
        Rgba8Premul {
            r: 255,
            g: 0,
            b: 0,
            a: 255
        }
    );
}

#[test]
fn json_round_trips() {
    let cfg = ShimmerConfig {
        interpolation: Ease::Cycle { cycles: 2.0 },
        group: Some("grid".to_owned()),
        ..ShimmerConfig::default()
    };
    let json = cfg.to_json_string().unwrap();
    assert_eq!(ShimmerConfig::from_json_str(&json).unwrap(), cfg);
}

#[test]
fn unknown_fields_and_bad_json_are_serde_errors() {
    let err = ShimmerConfig::from_json_str(r#"{"angle": 10}"#).unwrap_err();
    assert!(err.to_string().starts_with("serialization error:"));
    assert!(ShimmerConfig::from_json_str("[").is_err());
}

#[test]
fn out_of_range_values_fail_validation() {
    let bad = [
        r#"{"duration_ms": 0}"#,
        r#"{"band_fraction": 0.5}"#,
        r#"{"band_fraction": 0.1, "center_fraction": 0.2}"#,
        r#"{"center_fraction": 0}"#,
        r#"{"group": "  "}"#,
    ];
    for json in bad {
        let err = ShimmerConfig::from_json_str(json).unwrap_err();
        assert!(
            err.to_string().starts_with("validation error:"),
            "{json}: {err}"
        );
    }
}
