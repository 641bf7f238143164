use crate::{
    buffer::allocator::PixelBuffer,
    foundation::core::Point,
    foundation::error::ShimmerResult,
    geometry::band::{PixelRect, bounding_rect, centered_band_gradient},
    geometry::gradient::LinearGradient,
};

/// Everything a background job needs to build the band mask.
///
/// Built and validated on the render thread so the job itself cannot fail on geometry.
#[derive(Clone, Debug, PartialEq)]
pub struct MaskSpec {
    /// Surface area covered by the mask, in surface pixels.
    pub rect: PixelRect,
    gradient: LinearGradient,
}

impl MaskSpec {
    /// Mask for a `width x height` surface.
    pub fn new(
        width: u32,
        height: u32,
        angle_deg: f64,
        band_fraction: f64,
        center_fraction: f64,
    ) -> ShimmerResult<Self> {
        let (w, h) = (f64::from(width), f64::from(height));
        let rect = bounding_rect(w, h, angle_deg, band_fraction)?;
        let gradient = centered_band_gradient(w, h, angle_deg, band_fraction, center_fraction)?;
        Ok(Self {
            rect: PixelRect::covering(rect),
            gradient,
        })
    }
}

/// Paint the rotated band into `buf`, which covers `spec.rect` of the surface.
///
/// Pixels are sampled at their centers in surface coordinates, so the buffer holds the band
/// already rotated into place.
#[tracing::instrument(skip(buf, spec), fields(w = buf.width(), h = buf.height()))]
pub fn paint_band_mask(buf: &mut PixelBuffer, spec: &MaskSpec) {
    let (ox, oy) = (f64::from(spec.rect.x), f64::from(spec.rect.y));
    for y in 0..i64::from(buf.height()) {
        for x in 0..i64::from(buf.width()) {
            let p = Point::new(ox + x as f64 + 0.5, oy + y as f64 + 0.5);
            buf.set_pixel(x, y, spec.gradient.sample(p));
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/buffer/mask.rs"]
mod tests;
