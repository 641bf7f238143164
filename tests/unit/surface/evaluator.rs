use super::*;

const RED: Rgba8Premul = Rgba8Premul {
    r: 255,
    g: 0,
    b: 0,
    a: 255,
};
const BLUE: Rgba8Premul = Rgba8Premul {
    r: 0,
    g: 0,
    b: 255,
    a: 255,
};

#[test]
fn closures_are_evaluators() {
    let c: Customization<f64> = Customization::custom(|p: f64| p * 2.0);
    assert_eq!(c.evaluate(0.25), Some(0.5));
    assert!(!c.is_default());
}

#[test]
fn default_and_disabled_do_not_evaluate() {
    let d: Customization<f64> = Customization::default();
    assert!(d.is_default());
    assert_eq!(d.evaluate(0.5), None);
    assert_eq!(Customization::<f64>::Disabled.evaluate(0.5), None);
    assert_eq!(format!("{:?}", Customization::<f64>::Disabled), "Disabled");
}

#[test]
fn color_cycle_interpolates_and_wraps() {
    let cycle = ColorCycle::new([RED, BLUE]);
    assert_eq!(cycle.evaluate(0.0), RED);
    assert_eq!(cycle.evaluate(0.5), BLUE);
    assert_eq!(cycle.evaluate(1.0), RED);

    let quarter = cycle.evaluate(0.25);
    assert!(quarter.r > 100 && quarter.r < 150);
    assert!(quarter.b > 100 && quarter.b < 150);
    // Back towards red in the second half.
    assert!(cycle.evaluate(0.75).r > 100);
}

#[test]
fn color_cycle_degenerate_palettes() {
    assert_eq!(ColorCycle::new([]).evaluate(0.3), Rgba8Premul::transparent());
    assert_eq!(ColorCycle::new([BLUE]).evaluate(0.3), BLUE);
    assert_eq!(ColorCycle::new([RED, BLUE]).evaluate(f64::NAN), RED);
}
