//! Per-surface shimmer state.
//!
//! A [`Surface`] tracks one host view's size and visibility, joins its [`SyncGroup`] while it is
//! visible with a nonzero size, and composes the band over the view's content on every draw.
//!
//! Two composition modes share the group contract:
//!
//! - [`CompositionMode::Procedural`]: the surface fills its bounds with a shader whose transform
//!   follows the group value. Shader, color and transform can each be customized.
//! - [`CompositionMode::SharedMask`]: the group owns a prebuilt mask and scratch buffer. The
//!   scratch holds the content under the band, masked and tinted, and is re-rendered only when
//!   the offset or the writing surface changes.

use std::sync::Arc;

use crate::{
    animation::ease::Interpolation,
    buffer::cache::BufferHandle,
    config::{CompositionMode, ShimmerConfig},
    foundation::core::{Affine, Rect, Rgba8Premul, Vec2},
    foundation::error::ShimmerResult,
    geometry::band::{PixelRect, default_band_shader},
    geometry::gradient::LinearGradient,
    render::context::{BlendMode, DrawContext, Paint, Shader},
    render::cpu::{FrameRGBA, PixelCanvas},
    surface::evaluator::Customization,
    sync::group::{GroupGeometry, GroupOpts, MemberId, MemberShared, ScratchClaim, SyncGroup},
    sync::registry::GroupRegistry,
};

/// Summary of what a draw produced.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RenderFrame {
    /// Content only: empty or hidden surface, or shimmer switched off.
    Plain,
    /// Content only because the shared buffers are not ready yet.
    Pending,
    /// Procedural band at `progress`.
    Procedural {
        /// Group value used for this frame.
        progress: f64,
    },
    /// Shared-mask band shifted by `offset` pixels.
    Masked {
        /// Horizontal mask offset in pixels.
        offset: i32,
        /// Whether the scratch buffer was reused without re-rendering.
        scratch_reused: bool,
    },
}

/// One shimmering host view.
pub struct Surface {
    member: Arc<MemberShared>,
    config: ShimmerConfig,
    interpolation: Interpolation,
    group: Option<SyncGroup>,
    lazy_opts: GroupOpts,
    width: u32,
    height: u32,
    shader: Customization<Shader>,
    color: Customization<Rgba8Premul>,
    transform: Customization<Affine>,
    default_shader: Option<LinearGradient>,
    translate_range: f64,
}

impl Surface {
    /// Surface that creates a private group with default options on first draw.
    pub fn new(config: ShimmerConfig) -> ShimmerResult<Self> {
        Self::with_opts(config, GroupOpts::default())
    }

    /// Surface whose lazily created private group uses `opts`.
    pub fn with_opts(config: ShimmerConfig, opts: GroupOpts) -> ShimmerResult<Self> {
        config.validate()?;
        let member = MemberShared::new();
        // Views start out shown; hosts report otherwise.
        member.set_visible(true);
        Ok(Self {
            member,
            interpolation: config.interpolation.into(),
            config,
            group: None,
            lazy_opts: opts,
            width: 0,
            height: 0,
            shader: Customization::Default,
            color: Customization::Default,
            transform: Customization::Default,
            default_shader: None,
            translate_range: 0.0,
        })
    }

    /// Surface driven by an existing group.
    pub fn with_group(config: ShimmerConfig, group: SyncGroup) -> ShimmerResult<Self> {
        let mut surface = Self::new(config)?;
        surface.group = Some(group);
        Ok(surface)
    }

    /// Surface joining the registry group named by `config.group`, or a private one.
    pub fn in_registry(config: ShimmerConfig, registry: &GroupRegistry) -> ShimmerResult<Self> {
        let group = config.group.as_deref().map(|name| registry.get_or_create(name));
        let mut surface = Self::new(config)?;
        surface.group = group;
        Ok(surface)
    }

    /// Member identity shared with the group.
    pub fn id(&self) -> MemberId {
        self.member.id()
    }

    /// State shared with the group.
    pub fn member(&self) -> &Arc<MemberShared> {
        &self.member
    }

    /// Current group, if one was assigned or created.
    pub fn group(&self) -> Option<&SyncGroup> {
        self.group.as_ref()
    }

    /// Active configuration.
    pub fn config(&self) -> &ShimmerConfig {
        &self.config
    }

    /// Whether the surface is registered with a running group.
    pub fn is_animating(&self) -> bool {
        self.member.is_animating()
    }

    /// Replace the configuration; the animation restarts with it on the next draw.
    pub fn configure(&mut self, config: ShimmerConfig) -> ShimmerResult<()> {
        config.validate()?;
        self.stop_animation();
        self.interpolation = config.interpolation.into();
        self.config = config;
        self.default_shader = None;
        Ok(())
    }

    /// Replace the configuration and move to the registry group it names.
    pub fn configure_in(
        &mut self,
        config: ShimmerConfig,
        registry: &GroupRegistry,
    ) -> ShimmerResult<()> {
        let group = config.group.as_deref().map(|name| registry.get_or_create(name));
        self.configure(config)?;
        if let Some(group) = group {
            self.group = Some(group);
        }
        Ok(())
    }

    /// Move to `group`, leaving the current one.
    pub fn set_group(&mut self, group: SyncGroup) {
        self.stop_animation();
        self.group = Some(group);
    }

    /// Override the time curve from the configuration with an arbitrary one.
    pub fn set_interpolation(&mut self, interpolation: Interpolation) {
        self.interpolation = interpolation;
    }

    /// Shader hook. A custom shader fully replaces the built-in band gradient; `Disabled` turns
    /// the shimmer off.
    pub fn set_shader(&mut self, shader: Customization<Shader>) {
        self.shader = shader;
    }

    /// Color hook. `Disabled` keeps the shader's own colors.
    pub fn set_color(&mut self, color: Customization<Rgba8Premul>) {
        self.color = color;
    }

    /// Shader transform hook. `Disabled` leaves the shader unmoved.
    pub fn set_transform(&mut self, transform: Customization<Affine>) {
        self.transform = transform;
    }

    /// Callback invoked when the group wants this surface redrawn.
    pub fn set_invalidate(&self, f: impl Fn() + Send + Sync + 'static) {
        self.member.set_invalidate(f);
    }

    /// Consume a pending redraw request.
    pub fn take_redraw_request(&self) -> bool {
        self.member.take_redraw_request()
    }

    /// Report new bounds and visibility. Hidden or empty surfaces leave their group.
    pub fn on_size_or_visibility_changed(&mut self, width: u32, height: u32, visible: bool) {
        let resized = (width, height) != (self.width, self.height);
        self.width = width;
        self.height = height;
        self.member.set_visible(visible);

        if !visible || width == 0 || height == 0 {
            self.stop_animation();
            return;
        }
        if resized && self.is_animating() {
            // The default shader and translate range depend on the size.
            self.stop_animation();
        }
        self.ensure_started();
    }

    /// Report new bounds.
    pub fn on_size_changed(&mut self, width: u32, height: u32) {
        let visible = self.member.is_visible();
        self.on_size_or_visibility_changed(width, height, visible);
    }

    /// Report a visibility change.
    pub fn on_visibility_changed(&mut self, visible: bool) {
        self.on_size_or_visibility_changed(self.width, self.height, visible);
    }

    /// Leave the group; a later visible draw joins again.
    pub fn dispose(&mut self) {
        self.stop_animation();
    }

    fn stop_animation(&mut self) {
        if let Some(group) = &self.group {
            group.remove_member(self.member.id());
            group.forget_scratch(self.member.id());
        }
        self.member.set_animating(false);
    }

    fn ensure_started(&mut self) {
        if self.is_animating()
            || !self.member.is_visible()
            || self.width == 0
            || self.height == 0
        {
            return;
        }
        let lazy_opts = &self.lazy_opts;
        let group = self
            .group
            .get_or_insert_with(|| SyncGroup::new(lazy_opts.clone()))
            .clone();

        let (w, h) = (f64::from(self.width), f64::from(self.height));
        match self.config.mode {
            CompositionMode::Procedural => {
                // Sized for the current bounds; rebuilt on the next draw that needs it.
                self.default_shader = None;
                self.translate_range = w.max(h);
            }
            CompositionMode::SharedMask => {
                let geometry = GroupGeometry {
                    width: self.width,
                    height: self.height,
                    angle_deg: self.config.angle_deg,
                    band_fraction: self.config.band_fraction,
                    center_fraction: self.config.center_fraction,
                };
                if let Err(e) = group.configure_geometry(geometry) {
                    tracing::warn!("shimmer mask geometry rejected: {e}");
                }
            }
        }

        group.add_member(
            &self.member,
            self.config.duration_ms,
            self.interpolation.clone(),
        );
        tracing::debug!(
            member = self.member.id().0,
            group = group.id().0,
            "surface started shimmering"
        );
    }

    /// Draw `content` with the band composed over it.
    ///
    /// `content` may be called more than once per draw: the shared-mask mode also renders it
    /// into the group's scratch buffer.
    pub fn draw<F>(&mut self, ctx: &mut dyn DrawContext, mut content: F) -> RenderFrame
    where
        F: FnMut(&mut dyn DrawContext),
    {
        if self.width == 0 || self.height == 0 {
            content(ctx);
            return RenderFrame::Plain;
        }
        self.ensure_started();
        let Some(group) = self.group.clone().filter(|_| self.is_animating()) else {
            content(ctx);
            return RenderFrame::Plain;
        };
        match self.config.mode {
            CompositionMode::Procedural => self.draw_procedural(ctx, &group, &mut content),
            CompositionMode::SharedMask => self.draw_masked(ctx, &group, &mut content),
        }
    }

    /// Draw onto a fresh CPU canvas the size of the surface and return the pixels.
    pub fn render_rgba<F>(&mut self, content: F) -> FrameRGBA
    where
        F: FnMut(&mut dyn DrawContext),
    {
        let mut canvas = PixelCanvas::new(self.width, self.height);
        self.draw(&mut canvas, content);
        canvas.into_frame()
    }

    fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, f64::from(self.width), f64::from(self.height))
    }

    fn band_color(&self, progress: f64) -> Option<Rgba8Premul> {
        match &self.color {
            Customization::Default => Some(self.config.color_premul()),
            Customization::Custom(e) => Some(e.evaluate(progress)),
            Customization::Disabled => None,
        }
    }

    fn built_in_shader(&mut self) -> Option<LinearGradient> {
        if self.default_shader.is_none() && self.width > 0 {
            self.default_shader = default_band_shader(
                f64::from(self.width),
                self.config.angle_deg,
                self.config.band_fraction,
                self.config.center_fraction,
            )
            .inspect_err(|e| tracing::warn!("shimmer shader unavailable: {e}"))
            .ok();
        }
        self.default_shader.clone()
    }

    fn draw_procedural(
        &mut self,
        ctx: &mut dyn DrawContext,
        group: &SyncGroup,
        content: &mut dyn FnMut(&mut dyn DrawContext),
    ) -> RenderFrame {
        let progress = group.value();
        let shader = match &self.shader {
            Customization::Default => self.built_in_shader().map(Shader::Linear),
            Customization::Custom(e) => Some(e.evaluate(progress)),
            Customization::Disabled => None,
        };
        let Some(shader) = shader else {
            content(ctx);
            return RenderFrame::Plain;
        };
        let transform = match &self.transform {
            Customization::Default => {
                Affine::translate(((progress * 2.0 - 1.0) * self.translate_range, 0.0))
            }
            Customization::Custom(e) => e.evaluate(progress),
            Customization::Disabled => Affine::IDENTITY,
        };
        let mut paint = Paint::new(shader)
            .with_transform(transform)
            .with_blend(BlendMode::SrcAtop);
        paint.color = self.band_color(progress);

        ctx.save_layer();
        content(&mut *ctx);
        ctx.fill_rect(self.bounds(), &paint);
        ctx.restore();
        RenderFrame::Procedural { progress }
    }

    fn draw_masked(
        &mut self,
        ctx: &mut dyn DrawContext,
        group: &SyncGroup,
        content: &mut dyn FnMut(&mut dyn DrawContext),
    ) -> RenderFrame {
        let mask = group.mask();
        let scratch = group.scratch();
        let (Some(mask), Some(scratch)) = (mask.ready(), scratch.ready()) else {
            content(ctx);
            return RenderFrame::Pending;
        };
        let (Some(rect), Some(offset)) = (group.mask_rect(), group.offset_px()) else {
            content(ctx);
            return RenderFrame::Plain;
        };

        let band = PixelRect {
            x: rect.x.saturating_add(offset),
            ..rect
        }
        .to_rect();
        let origin = Vec2::new(band.x0, band.y0);
        let to_band = Affine::translate(origin);

        let scratch_reused = match group.claim_scratch(offset, self.member.id()) {
            ScratchClaim::Reuse => true,
            ScratchClaim::Render => {
                let tint = self.band_color(group.value());
                render_scratch(scratch, mask, origin, band, tint, content);
                false
            }
        };

        ctx.save_layer();
        content(&mut *ctx);
        ctx.clip_rect(self.bounds());
        ctx.fill_rect(
            band,
            &Paint::new(Shader::Image(scratch.clone())).with_transform(to_band),
        );
        ctx.restore();
        RenderFrame::Masked {
            offset,
            scratch_reused,
        }
    }
}

/// Render the content under the band into `scratch`, keep it only where the mask is opaque and
/// recolor it with `tint`.
#[tracing::instrument(level = "trace", skip_all, fields(scratch = scratch.id()))]
fn render_scratch(
    scratch: &BufferHandle,
    mask: &BufferHandle,
    origin: Vec2,
    band: Rect,
    tint: Option<Rgba8Premul>,
    content: &mut dyn FnMut(&mut dyn DrawContext),
) {
    let mut buf = std::mem::take(&mut *scratch.pixels());
    buf.clear();
    let mut canvas = PixelCanvas::with_buffer(buf, origin);
    content(&mut canvas);
    canvas.fill_rect(
        band,
        &Paint::new(Shader::Image(mask.clone()))
            .with_transform(Affine::translate(origin))
            .with_blend(BlendMode::DstIn),
    );
    if let Some(color) = tint {
        canvas.fill_rect(
            band,
            &Paint::new(Shader::Solid(color)).with_blend(BlendMode::SrcIn),
        );
    }
    *scratch.pixels() = canvas.into_buffer();
}

impl Drop for Surface {
    fn drop(&mut self) {
        self.stop_animation();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/surface/adapter.rs"]
mod tests;
