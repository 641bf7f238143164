//! Geometry of the sweeping band.
//!
//! The band is a strip through the surface center whose half-thickness is
//! `band_fraction * width`, measured along the gradient direction `(cos a, sin a)`. Everything here
//! is pure and deterministic.

use smallvec::SmallVec;

use crate::{
    foundation::core::{Affine, Point, Rect, Rgba8Premul, Vec2},
    foundation::error::{ShimmerError, ShimmerResult},
    foundation::math::unit_to_u8,
    geometry::gradient::{GradientStop, GradientStopList, LinearGradient},
};

/// Four-stop opacity profile of the band: transparent, opaque, opaque, transparent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GradientStops {
    /// Stop offsets along the gradient, strictly increasing, inside `[0, 1]`.
    pub positions: [f64; 4],
    /// Opacity at each stop.
    pub values: [f64; 4],
}

/// Integer pixel rectangle, used to size cached buffers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PixelRect {
    /// Left edge in surface pixels.
    pub x: i32,
    /// Top edge in surface pixels.
    pub y: i32,
    /// Width in pixels (non-zero for valid band geometry).
    pub width: u32,
    /// Height in pixels (non-zero for valid band geometry).
    pub height: u32,
}

impl PixelRect {
    /// Smallest pixel rectangle covering `rect`.
    pub fn covering(rect: Rect) -> Self {
        let x0 = rect.x0.floor();
        let y0 = rect.y0.floor();
        let x1 = rect.x1.ceil().max(x0 + 1.0);
        let y1 = rect.y1.ceil().max(y0 + 1.0);
        Self {
            x: x0 as i32,
            y: y0 as i32,
            width: (x1 - x0) as u32,
            height: (y1 - y0) as u32,
        }
    }

    /// Back to floating point coordinates.
    pub fn to_rect(self) -> Rect {
        Rect::new(
            f64::from(self.x),
            f64::from(self.y),
            f64::from(self.x) + f64::from(self.width),
            f64::from(self.y) + f64::from(self.height),
        )
    }
}

fn validate_surface(width: f64, height: f64) -> ShimmerResult<()> {
    if !(width.is_finite() && height.is_finite()) || width <= 0.0 || height <= 0.0 {
        return Err(ShimmerError::geometry(format!(
            "surface must have a positive size, got {width}x{height}"
        )));
    }
    Ok(())
}

fn validate_band_fraction(band_fraction: f64) -> ShimmerResult<()> {
    if !band_fraction.is_finite() || band_fraction <= 0.0 || band_fraction >= 0.5 {
        return Err(ShimmerError::geometry(format!(
            "band width fraction must be in (0, 0.5), got {band_fraction}"
        )));
    }
    Ok(())
}

/// Unit gradient direction for `angle_deg`.
pub fn band_direction(angle_deg: f64) -> Vec2 {
    let a = angle_deg.to_radians();
    Vec2::new(a.cos(), a.sin())
}

/// Axis-aligned bounds of the rotated band inside a `width x height` surface.
///
/// The result is clamped to the surface and never empty for valid inputs.
pub fn bounding_rect(
    width: f64,
    height: f64,
    angle_deg: f64,
    band_fraction: f64,
) -> ShimmerResult<Rect> {
    validate_surface(width, height)?;
    validate_band_fraction(band_fraction)?;
    if !angle_deg.is_finite() {
        return Err(ShimmerError::geometry("band angle must be finite"));
    }

    let surface = Rect::new(0.0, 0.0, width, height);
    let half = band_fraction * width;
    let center = surface.center();

    // A strip is symmetric under a half turn.
    let angle = angle_deg.rem_euclid(180.0);
    if angle == 0.0 {
        return Ok(Rect::new(center.x - half, 0.0, center.x + half, height).intersect(surface));
    }

    let reach = width.hypot(height);
    let rot = Affine::rotate_about(angle.to_radians(), center);
    let band = [
        rot * Point::new(center.x - half, center.y - reach),
        rot * Point::new(center.x + half, center.y - reach),
        rot * Point::new(center.x + half, center.y + reach),
        rot * Point::new(center.x - half, center.y + reach),
    ];
    let corners = [
        Point::new(0.0, 0.0),
        Point::new(width, 0.0),
        Point::new(width, height),
        Point::new(0.0, height),
    ];

    let overlap = clip_convex(&corners, &band);
    let Some(first) = overlap.first() else {
        // Unreachable for a band through the center; fall back to the unrotated strip.
        return Ok(Rect::new(center.x - half, 0.0, center.x + half, height).intersect(surface));
    };
    let bounds = overlap
        .iter()
        .skip(1)
        .fold(Rect::from_points(*first, *first), |r, p| r.union_pt(*p));
    Ok(bounds.intersect(surface))
}

/// Sutherland-Hodgman clip of `subject` against the convex polygon `clip`.
fn clip_convex(subject: &[Point], clip: &[Point]) -> SmallVec<[Point; 8]> {
    let orientation = signed_area(clip).signum();
    let mut out: SmallVec<[Point; 8]> = subject.iter().copied().collect();

    for i in 0..clip.len() {
        if out.is_empty() {
            break;
        }
        let a = clip[i];
        let b = clip[(i + 1) % clip.len()];
        let inside = |p: Point| (b - a).cross(p - a) * orientation >= 0.0;

        let input = std::mem::take(&mut out);
        for j in 0..input.len() {
            let cur = input[j];
            let prev = input[(j + input.len() - 1) % input.len()];
            match (inside(prev), inside(cur)) {
                (true, true) => out.push(cur),
                (true, false) => out.extend(intersect(prev, cur, a, b)),
                (false, true) => {
                    out.extend(intersect(prev, cur, a, b));
                    out.push(cur);
                }
                (false, false) => {}
            }
        }
    }
    out
}

fn signed_area(poly: &[Point]) -> f64 {
    let mut acc = 0.0;
    for i in 0..poly.len() {
        let p = poly[i].to_vec2();
        let q = poly[(i + 1) % poly.len()].to_vec2();
        acc += p.cross(q);
    }
    acc * 0.5
}

fn intersect(p: Point, q: Point, a: Point, b: Point) -> Option<Point> {
    let r = q - p;
    let s = b - a;
    let denom = r.cross(s);
    if denom.abs() < f64::EPSILON {
        return None;
    }
    let t = (a - p).cross(s) / denom;
    Some(p + r * t)
}

impl GradientStops {
    /// White stops whose alpha follows the profile.
    pub fn to_stop_list(&self) -> GradientStopList {
        self.positions
            .iter()
            .zip(self.values.iter())
            .map(|(&offset, &value)| GradientStop {
                offset,
                color: Rgba8Premul::white().scale(unit_to_u8(value)),
            })
            .collect()
    }
}

/// Stop layout of the band gradient.
///
/// The band fades in over `band_fraction` and stays fully opaque over `center_fraction` on each
/// side of the middle.
pub fn gradient_stops(band_fraction: f64, center_fraction: f64) -> ShimmerResult<GradientStops> {
    validate_band_fraction(band_fraction)?;
    if !center_fraction.is_finite() || center_fraction <= 0.0 || center_fraction >= band_fraction
    {
        return Err(ShimmerError::geometry(format!(
            "center width fraction must be in (0, {band_fraction}), got {center_fraction}"
        )));
    }
    Ok(GradientStops {
        positions: [
            0.5 - band_fraction,
            0.5 - center_fraction,
            0.5 + center_fraction,
            0.5 + band_fraction,
        ],
        values: [0.0, 1.0, 1.0, 0.0],
    })
}

/// Built-in band gradient centered on the surface, spanning `width` along the band direction.
pub fn centered_band_gradient(
    width: f64,
    height: f64,
    angle_deg: f64,
    band_fraction: f64,
    center_fraction: f64,
) -> ShimmerResult<LinearGradient> {
    validate_surface(width, height)?;
    let stops = gradient_stops(band_fraction, center_fraction)?;
    let center = Point::new(width / 2.0, height / 2.0);
    let half_span = band_direction(angle_deg) * (width / 2.0);
    Ok(LinearGradient {
        start: center - half_span,
        end: center + half_span,
        stops: stops.to_stop_list(),
    })
}

/// Built-in procedural shader: a linear gradient from the origin to `width * (cos a, sin a)`.
///
/// At progress 0.5 the default translation is zero and the band sits on the surface center
/// line; the animated transform sweeps it across.
pub fn default_band_shader(
    width: f64,
    angle_deg: f64,
    band_fraction: f64,
    center_fraction: f64,
) -> ShimmerResult<LinearGradient> {
    if !width.is_finite() || width <= 0.0 {
        return Err(ShimmerError::geometry(format!(
            "surface width must be positive, got {width}"
        )));
    }
    if !angle_deg.is_finite() {
        return Err(ShimmerError::geometry("band angle must be finite"));
    }
    let stops = gradient_stops(band_fraction, center_fraction)?;
    Ok(LinearGradient {
        start: Point::ORIGIN,
        end: Point::ORIGIN + band_direction(angle_deg) * width,
        stops: stops.to_stop_list(),
    })
}

#[cfg(test)]
#[path = "../../tests/unit/geometry/band.rs"]
mod tests;
