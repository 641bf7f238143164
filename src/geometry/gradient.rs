use smallvec::SmallVec;

use crate::foundation::core::{Point, Rgba8Premul};

/// One color stop of a gradient.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GradientStop {
    /// Position along the gradient in `[0, 1]`.
    pub offset: f64,
    /// Premultiplied color at `offset`.
    pub color: Rgba8Premul,
}

/// Stop list; band gradients always have four stops.
pub type GradientStopList = SmallVec<[GradientStop; 4]>;

/// Linear gradient between two points, clamped outside `[start, end]`.
#[derive(Clone, Debug, PartialEq)]
pub struct LinearGradient {
    /// Point mapped to offset 0.
    pub start: Point,
    /// Point mapped to offset 1.
    pub end: Point,
    /// Stops ordered by offset.
    pub stops: GradientStopList,
}

impl LinearGradient {
    /// Color at `p` in gradient space.
    pub fn sample(&self, p: Point) -> Rgba8Premul {
        let axis = self.end - self.start;
        let len2 = axis.hypot2();
        let t = if len2 <= f64::EPSILON {
            0.0
        } else {
            (p - self.start).dot(axis) / len2
        };
        sample_stops(&self.stops, t)
    }
}

/// Radial gradient around `center`, clamped beyond `radius`.
#[derive(Clone, Debug, PartialEq)]
pub struct RadialGradient {
    /// Point mapped to offset 0.
    pub center: Point,
    /// Distance mapped to offset 1.
    pub radius: f64,
    /// Stops ordered by offset.
    pub stops: GradientStopList,
}

impl RadialGradient {
    /// Two-stop gradient from `inner` at the center to `outer` at `radius`.
    ///
    /// Stop offsets default to the even split used when a caller passes no positions.
    pub fn two_color(center: Point, radius: f64, inner: Rgba8Premul, outer: Rgba8Premul) -> Self {
        let mut stops = GradientStopList::new();
        stops.push(GradientStop {
            offset: 0.0,
            color: inner,
        });
        stops.push(GradientStop {
            offset: 1.0,
            color: outer,
        });
        Self {
            center,
            radius,
            stops,
        }
    }

    /// Color at `p` in gradient space.
    pub fn sample(&self, p: Point) -> Rgba8Premul {
        let t = if self.radius <= f64::EPSILON {
            1.0
        } else {
            (p - self.center).hypot() / self.radius
        };
        sample_stops(&self.stops, t)
    }
}

/// Interpolate premultiplied channels between the stops surrounding `t`.
pub(crate) fn sample_stops(stops: &[GradientStop], t: f64) -> Rgba8Premul {
    let (Some(first), Some(last)) = (stops.first(), stops.last()) else {
        return Rgba8Premul::transparent();
    };
    if !t.is_finite() || t <= first.offset {
        return first.color;
    }
    if t >= last.offset {
        return last.color;
    }
    for pair in stops.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if t <= b.offset {
            let span = b.offset - a.offset;
            let local = if span <= f64::EPSILON {
                1.0
            } else {
                (t - a.offset) / span
            };
            return lerp_rgba(a.color, b.color, local);
        }
    }
    last.color
}

/// Channel-wise interpolation of two premultiplied colors.
pub fn lerp_rgba(a: Rgba8Premul, b: Rgba8Premul, t: f64) -> Rgba8Premul {
    let t = t.clamp(0.0, 1.0);
    let mix = |x: u8, y: u8| -> u8 {
        let x = f64::from(x);
        let y = f64::from(y);
        (x + (y - x) * t).round().clamp(0.0, 255.0) as u8
    };
    Rgba8Premul {
        r: mix(a.r, b.r),
        g: mix(a.g, b.g),
        b: mix(a.b, b.b),
        a: mix(a.a, b.a),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/geometry/gradient.rs"]
mod tests;
