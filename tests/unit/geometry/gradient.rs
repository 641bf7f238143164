use super::*;

fn ramp() -> LinearGradient {
    let mut stops = GradientStopList::new();
    stops.push(GradientStop {
        offset: 0.0,
        color: Rgba8Premul::transparent(),
    });
    stops.push(GradientStop {
        offset: 1.0,
        color: Rgba8Premul::white(),
    });
    LinearGradient {
        start: Point::new(0.0, 0.0),
        end: Point::new(100.0, 0.0),
        stops,
    }
}

#[test]
fn linear_clamps_outside_the_axis() {
    let g = ramp();
    assert_eq!(g.sample(Point::new(-50.0, 3.0)), Rgba8Premul::transparent());
    assert_eq!(g.sample(Point::new(500.0, 3.0)), Rgba8Premul::white());
    assert_eq!(g.sample(Point::new(50.0, 99.0)).a, 128);
}

#[test]
fn degenerate_linear_axis_uses_first_stop() {
    let mut g = ramp();
    g.end = g.start;
    assert_eq!(g.sample(Point::new(10.0, 10.0)), Rgba8Premul::transparent());
}

#[test]
fn radial_fades_with_distance() {
    let g = RadialGradient::two_color(
        Point::new(10.0, 10.0),
        10.0,
        Rgba8Premul::white(),
        Rgba8Premul::transparent(),
    );
    assert_eq!(g.sample(Point::new(10.0, 10.0)), Rgba8Premul::white());
    assert_eq!(g.sample(Point::new(30.0, 10.0)), Rgba8Premul::transparent());
    let mid = g.sample(Point::new(15.0, 10.0));
    assert!(mid.a > 100 && mid.a < 160);
}

#[test]
fn empty_stop_list_is_transparent() {
    assert_eq!(sample_stops(&[], 0.5), Rgba8Premul::transparent());
}

#[test]
fn lerp_rgba_endpoints() {
    let a = Rgba8Premul::from_straight_rgba(128, 0, 0, 255);
    let b = Rgba8Premul::from_straight_rgba(0, 0, 128, 255);
    assert_eq!(lerp_rgba(a, b, 0.0), a);
    assert_eq!(lerp_rgba(a, b, 1.0), b);
}
