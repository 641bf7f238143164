//! Toolkit-independent core of a shimmer loading placeholder.
//!
//! A diagonal band of light sweeps repeatedly across one or more surfaces. The crate covers:
//!
//! - band geometry over a surface of any size ([`bounding_rect`], [`gradient_stops`])
//! - a shared animation driver, [`SyncGroup`], that keeps many surfaces in step with one timer
//! - a buffer cache that builds the band mask and a scratch buffer off the render thread through a
//!   pluggable [`BufferAllocator`], and recovers when allocation fails
//! - a per-view [`Surface`] that composes the band over caller content through [`DrawContext`]
//!
//! The host drives time: call [`SyncGroup::tick`] once per frame from the render thread and redraw
//! the surfaces it flags.
#![forbid(unsafe_code)]
#![deny(missing_docs)]
// Blend helpers and a few accessors are only reachable from tests and sibling modules.
#![allow(dead_code)]

mod foundation;

pub(crate) mod animation;
pub(crate) mod buffer;
/// Serde-backed surface configuration.
pub mod config;
pub(crate) mod geometry;
pub(crate) mod render;
pub(crate) mod surface;
pub(crate) mod sync;

pub use crate::foundation::core::{Affine, PixelFormat, Point, Rect, Rgba8Premul, Timestamp, Vec2};
pub use crate::foundation::error::{ShimmerError, ShimmerResult};

pub use crate::animation::animator::RepeatingAnimator;
pub use crate::animation::ease::{Ease, Interpolation};
pub use crate::buffer::allocator::{
    AllocCounters, AllocStats, BufferAllocator, InstrumentedAllocator, PixelBuffer,
    SystemAllocator,
};
pub use crate::buffer::cache::{BufferCache, BufferHandle, BufferKind, BufferState, CacheStats, PollReport};
pub use crate::buffer::mask::{MaskSpec, paint_band_mask};
pub use crate::buffer::pool::{PoolOpts, PoolStats, PooledAllocator};
pub use crate::buffer::spawn::{InlineSpawner, ManualSpawner, RayonSpawner, Task, TaskSpawner};
pub use crate::config::{CompositionMode, ShimmerConfig};
pub use crate::geometry::band::{
    GradientStops, PixelRect, band_direction, bounding_rect, centered_band_gradient,
    default_band_shader, gradient_stops,
};
pub use crate::geometry::gradient::{
    GradientStop, GradientStopList, LinearGradient, RadialGradient, lerp_rgba,
};
pub use crate::render::composite::blend;
pub use crate::render::context::{BlendMode, DrawContext, Paint, Shader};
pub use crate::render::cpu::{FrameRGBA, PixelCanvas};
pub use crate::surface::adapter::{RenderFrame, Surface};
pub use crate::surface::evaluator::{ColorCycle, Customization, Evaluator};
pub use crate::sync::group::{
    DEFAULT_GRACE_MS, GroupGeometry, GroupId, GroupOpts, MemberId, MemberShared, ScratchClaim,
    SyncGroup, TickReport,
};
pub use crate::sync::registry::GroupRegistry;
