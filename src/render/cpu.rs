use crate::{
    buffer::allocator::PixelBuffer,
    foundation::core::{Affine, Point, Rect, Rgba8Premul, Vec2},
    render::composite::{blend, over},
    render::context::{DrawContext, Paint, Shader},
};

/// A rendered frame as RGBA8 pixels.
#[derive(Clone, Debug)]
pub struct FrameRGBA {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
    /// Whether the `data` is premultiplied alpha.
    pub premultiplied: bool,
}

struct Layer {
    buf: PixelBuffer,
    clip: Rect,
}

/// CPU [`DrawContext`] rasterizing into a [`PixelBuffer`].
///
/// Pixel `(i, j)` of the target covers the surface point `origin + (i + 0.5, j + 0.5)`; a fill
/// touches every pixel whose center lies inside the fill rect and the current clip. There is no
/// anti-aliasing.
pub struct PixelCanvas {
    origin: Vec2,
    layers: Vec<Layer>,
}

impl PixelCanvas {
    /// Transparent canvas of `width x height` at the surface origin.
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_buffer(PixelBuffer::transparent(width, height), Vec2::ZERO)
    }

    /// Draw into an existing buffer whose top-left pixel sits at `origin` in surface space.
    pub fn with_buffer(buf: PixelBuffer, origin: Vec2) -> Self {
        let clip = Rect::new(
            origin.x,
            origin.y,
            origin.x + f64::from(buf.width()),
            origin.y + f64::from(buf.height()),
        );
        Self {
            origin,
            layers: vec![Layer { buf, clip }],
        }
    }

    /// Number of open layers above the base target.
    pub fn depth(&self) -> usize {
        self.layers.len().saturating_sub(1)
    }

    /// Flatten open layers and return the target buffer.
    pub fn into_buffer(mut self) -> PixelBuffer {
        while self.depth() > 0 {
            self.restore();
        }
        match self.layers.pop() {
            Some(layer) => layer.buf,
            None => PixelBuffer::default(),
        }
    }

    /// Flatten open layers and return the target as a frame.
    pub fn into_frame(self) -> FrameRGBA {
        let buf = self.into_buffer();
        FrameRGBA {
            width: buf.width(),
            height: buf.height(),
            data: buf.data().to_vec(),
            premultiplied: true,
        }
    }

    fn top(&mut self) -> Option<&mut Layer> {
        self.layers.last_mut()
    }

    /// Pixel span `[lo, hi)` whose centers fall inside `[a, b)` once shifted by `origin`.
    fn span(a: f64, b: f64, origin: f64, len: u32) -> (i64, i64) {
        let lo = (a - origin - 0.5).ceil().max(0.0);
        let hi = (b - origin - 0.5).ceil().min(f64::from(len));
        if !(lo.is_finite() && hi.is_finite()) || hi <= lo {
            return (0, 0);
        }
        (lo as i64, hi as i64)
    }
}

impl DrawContext for PixelCanvas {
    fn save_layer(&mut self) {
        let Some(top) = self.layers.last() else {
            return;
        };
        let layer = Layer {
            buf: PixelBuffer::transparent(top.buf.width(), top.buf.height()),
            clip: top.clip,
        };
        self.layers.push(layer);
    }

    fn restore(&mut self) {
        if self.layers.len() < 2 {
            tracing::trace!("restore without a matching save_layer");
            return;
        }
        let Some(layer) = self.layers.pop() else {
            return;
        };
        let Some(dst) = self.top() else {
            return;
        };
        for (d, s) in dst
            .buf
            .data_mut()
            .chunks_exact_mut(4)
            .zip(layer.buf.data().chunks_exact(4))
        {
            let out = over(
                Rgba8Premul::from_array([d[0], d[1], d[2], d[3]]),
                Rgba8Premul::from_array([s[0], s[1], s[2], s[3]]),
            );
            d.copy_from_slice(&out.to_array());
        }
    }

    fn clip_rect(&mut self, rect: Rect) {
        if let Some(top) = self.top() {
            top.clip = top.clip.intersect(rect);
        }
    }

    fn fill_rect(&mut self, rect: Rect, paint: &Paint) {
        let origin = self.origin;
        let Some(top) = self.top() else {
            return;
        };
        let area = top.clip.intersect(rect);
        if area.is_zero_area() {
            return;
        }
        let (x0, x1) = Self::span(area.x0, area.x1, origin.x, top.buf.width());
        let (y0, y1) = Self::span(area.y0, area.y1, origin.y, top.buf.height());
        if x0 >= x1 || y0 >= y1 {
            return;
        }
        // A singular transform collapses the shader; nothing is drawn.
        if paint.transform.determinant().abs() <= f64::EPSILON {
            return;
        }
        let to_local: Affine = paint.transform.inverse();

        let image = match &paint.shader {
            Shader::Image(handle) => Some(handle.pixels()),
            _ => None,
        };
        for y in y0..y1 {
            for x in x0..x1 {
                let p = Point::new(
                    origin.x + x as f64 + 0.5,
                    origin.y + y as f64 + 0.5,
                );
                let q = to_local * p;
                let mut src = match &image {
                    Some(img) => img.pixel(q.x.floor() as i64, q.y.floor() as i64),
                    None => paint.shader.sample(q),
                };
                if let Some(color) = paint.color {
                    src = color.scale(src.a);
                }
                let dst = top.buf.pixel(x, y);
                top.buf.set_pixel(x, y, blend(paint.blend, dst, src));
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/cpu.rs"]
mod tests;
