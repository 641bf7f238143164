use crate::{
    buffer::cache::BufferHandle,
    foundation::core::{Affine, Point, Rect, Rgba8Premul},
    geometry::gradient::{LinearGradient, RadialGradient},
};

/// Porter-Duff operator used when a fill lands on the current layer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BlendMode {
    /// Source over destination.
    #[default]
    SrcOver,
    /// Source drawn only where the destination is opaque; destination alpha is kept.
    SrcAtop,
    /// Destination kept where the source is opaque.
    DstIn,
    /// Source kept where the destination is opaque.
    SrcIn,
}

/// Color source of a fill, sampled in its own local space.
#[derive(Clone, Debug)]
pub enum Shader {
    /// One color everywhere.
    Solid(Rgba8Premul),
    /// Linear gradient with clamped tiling.
    Linear(LinearGradient),
    /// Radial gradient with clamped tiling.
    Radial(RadialGradient),
    /// Cached buffer, nearest neighbour, transparent outside its bounds.
    Image(BufferHandle),
}

impl Shader {
    /// Sample a procedural shader. `Image` shaders are sampled by the canvas, which locks the
    /// buffer once per fill; here they read as transparent.
    pub fn sample(&self, p: Point) -> Rgba8Premul {
        match self {
            Self::Solid(c) => *c,
            Self::Linear(g) => g.sample(p),
            Self::Radial(g) => g.sample(p),
            Self::Image(_) => Rgba8Premul::transparent(),
        }
    }
}

/// Everything a single fill needs.
#[derive(Clone, Debug)]
pub struct Paint {
    /// Color source.
    pub shader: Shader,
    /// Maps shader space to surface space.
    pub transform: Affine,
    /// When set, replaces the shader color while keeping its alpha.
    pub color: Option<Rgba8Premul>,
    /// How the fill combines with the current layer.
    pub blend: BlendMode,
}

impl Paint {
    /// Untransformed, untinted source-over paint.
    pub fn new(shader: Shader) -> Self {
        Self {
            shader,
            transform: Affine::IDENTITY,
            color: None,
            blend: BlendMode::SrcOver,
        }
    }

    /// Replace the shader-to-surface transform.
    pub fn with_transform(mut self, transform: Affine) -> Self {
        self.transform = transform;
        self
    }

    /// Tint the shader with `color`.
    pub fn with_color(mut self, color: Rgba8Premul) -> Self {
        self.color = Some(color);
        self
    }

    /// Replace the blend mode.
    pub fn with_blend(mut self, blend: BlendMode) -> Self {
        self.blend = blend;
        self
    }
}

/// Drawing primitives the host toolkit exposes to the core.
///
/// Rectangles are in surface coordinates. `save_layer` starts an offscreen layer that `restore`
/// composites back with source-over, dropping any clip set since.
pub trait DrawContext {
    /// Begin an isolated transparent layer.
    fn save_layer(&mut self);
    /// Composite and pop the most recent layer.
    fn restore(&mut self);
    /// Intersect the current clip with `rect` until the next `restore`.
    fn clip_rect(&mut self, rect: Rect);
    /// Fill `rect` (intersected with the clip) with `paint`.
    fn fill_rect(&mut self, rect: Rect, paint: &Paint);
}
