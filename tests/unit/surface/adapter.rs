use super::*;
use crate::buffer::allocator::{AllocCounters, InstrumentedAllocator, SystemAllocator};
use crate::buffer::spawn::ManualSpawner;
use crate::foundation::core::{Point, Timestamp};
use crate::geometry::gradient::RadialGradient;

const RED: Rgba8Premul = Rgba8Premul {
    r: 255,
    g: 0,
    b: 0,
    a: 255,
};

#[derive(Clone, Debug, PartialEq)]
enum ShaderKind {
    Solid(Rgba8Premul),
    Linear,
    Radial,
    Image(u64),
}

#[derive(Clone, Debug, PartialEq)]
enum Call {
    SaveLayer,
    Restore,
    Clip(Rect),
    Fill {
        rect: Rect,
        shader: ShaderKind,
        transform: Affine,
        color: Option<Rgba8Premul>,
        blend: BlendMode,
    },
}

#[derive(Default)]
struct Recorder {
    calls: Vec<Call>,
}

impl DrawContext for Recorder {
    fn save_layer(&mut self) {
        self.calls.push(Call::SaveLayer);
    }

    fn restore(&mut self) {
        self.calls.push(Call::Restore);
    }

    fn clip_rect(&mut self, rect: Rect) {
        self.calls.push(Call::Clip(rect));
    }

    fn fill_rect(&mut self, rect: Rect, paint: &Paint) {
        let shader = match &paint.shader {
            Shader::Solid(c) => ShaderKind::Solid(*c),
            Shader::Linear(_) => ShaderKind::Linear,
            Shader::Radial(_) => ShaderKind::Radial,
            Shader::Image(h) => ShaderKind::Image(h.id()),
        };
        self.calls.push(Call::Fill {
            rect,
            shader,
            transform: paint.transform,
            color: paint.color,
            blend: paint.blend,
        });
    }
}

fn content(ctx: &mut dyn DrawContext) {
    ctx.fill_rect(
        Rect::new(0.0, 0.0, 200.0, 100.0),
        &Paint::new(Shader::Solid(RED)),
    );
}

fn content_call() -> Call {
    Call::Fill {
        rect: Rect::new(0.0, 0.0, 200.0, 100.0),
        shader: ShaderKind::Solid(RED),
        transform: Affine::IDENTITY,
        color: None,
        blend: BlendMode::SrcOver,
    }
}

struct Fixture {
    group: SyncGroup,
    spawner: ManualSpawner,
    counters: Arc<AllocCounters>,
}

fn fixture() -> Fixture {
    let counters = Arc::new(AllocCounters::default());
    let spawner = ManualSpawner::new();
    let group = SyncGroup::new(GroupOpts {
        allocator: Arc::new(InstrumentedAllocator::new(SystemAllocator, counters.clone())),
        spawner: Arc::new(spawner.clone()),
        grace_ms: 500,
    });
    Fixture {
        group,
        spawner,
        counters,
    }
}

fn procedural_config() -> ShimmerConfig {
    ShimmerConfig {
        angle_deg: 0.0,
        band_fraction: 0.15,
        center_fraction: 0.05,
        ..ShimmerConfig::default()
    }
}

fn masked_config() -> ShimmerConfig {
    ShimmerConfig {
        mode: CompositionMode::SharedMask,
        ..procedural_config()
    }
}

fn surface(config: ShimmerConfig, group: &SyncGroup) -> Surface {
    let mut s = Surface::with_group(config, group.clone()).unwrap();
    s.on_size_changed(200, 100);
    s
}

#[test]
fn empty_surface_draws_content_only() {
    let f = fixture();
    let mut s = Surface::with_group(procedural_config(), f.group.clone()).unwrap();
    let mut rec = Recorder::default();
    assert_eq!(s.draw(&mut rec, content), RenderFrame::Plain);
    assert_eq!(rec.calls, vec![content_call()]);
    assert!(!s.is_animating());
    assert_eq!(f.group.member_count(), 0);
}

#[test]
fn procedural_draw_sequence() {
    let f = fixture();
    let mut s = surface(procedural_config(), &f.group);
    assert!(s.is_animating());

    let mut rec = Recorder::default();
    let frame = s.draw(&mut rec, content);
    assert_eq!(frame, RenderFrame::Procedural { progress: 0.0 });
    assert_eq!(rec.calls.len(), 4);
    assert_eq!(rec.calls[0], Call::SaveLayer);
    assert_eq!(rec.calls[1], content_call());
    assert_eq!(
        rec.calls[2],
        Call::Fill {
            rect: Rect::new(0.0, 0.0, 200.0, 100.0),
            shader: ShaderKind::Linear,
            transform: Affine::translate((-200.0, 0.0)),
            color: Some(procedural_config().color_premul()),
            blend: BlendMode::SrcAtop,
        }
    );
    assert_eq!(rec.calls[3], Call::Restore);
}

#[test]
fn procedural_transform_follows_group_value() {
    let f = fixture();
    let mut s = surface(procedural_config(), &f.group);
    f.group.tick(Timestamp(0));
    f.group.tick(Timestamp(900));

    let mut rec = Recorder::default();
    let frame = s.draw(&mut rec, content);
    assert_eq!(frame, RenderFrame::Procedural { progress: 0.75 });
    let Call::Fill { transform, .. } = &rec.calls[2] else {
        panic!("expected a fill, got {:?}", rec.calls[2]);
    };
    assert_eq!(*transform, Affine::translate((100.0, 0.0)));
    assert!(s.take_redraw_request());
}

#[test]
fn customizations_replace_defaults() {
    let f = fixture();
    let mut s = surface(procedural_config(), &f.group);
    s.set_shader(Customization::custom(|p: f64| {
        Shader::Radial(RadialGradient::two_color(
            Point::new(100.0, 50.0),
            50.0 + 100.0 * p,
            Rgba8Premul::white(),
            Rgba8Premul::transparent(),
        ))
    }));
    s.set_transform(Customization::Disabled);
    s.set_color(Customization::custom(|_p: f64| RED));

    let mut rec = Recorder::default();
    s.draw(&mut rec, content);
    let Call::Fill {
        shader,
        transform,
        color,
        ..
    } = &rec.calls[2]
    else {
        panic!("expected a fill, got {:?}", rec.calls[2]);
    };
    assert_eq!(*shader, ShaderKind::Radial);
    assert_eq!(*transform, Affine::IDENTITY);
    assert_eq!(*color, Some(RED));

    s.set_color(Customization::Disabled);
    let mut rec = Recorder::default();
    s.draw(&mut rec, content);
    assert!(matches!(rec.calls[2], Call::Fill { color: None, .. }));
}

#[test]
fn disabled_shader_draws_content_only() {
    let f = fixture();
    let mut s = surface(procedural_config(), &f.group);
    s.set_shader(Customization::Disabled);
    let mut rec = Recorder::default();
    assert_eq!(s.draw(&mut rec, content), RenderFrame::Plain);
    assert_eq!(rec.calls, vec![content_call()]);
}

#[test]
fn hiding_leaves_the_group_and_showing_rejoins() {
    let f = fixture();
    let mut s = surface(procedural_config(), &f.group);
    assert_eq!(f.group.member_count(), 1);

    s.on_visibility_changed(false);
    assert!(!s.is_animating());
    assert_eq!(f.group.member_count(), 0);

    s.on_visibility_changed(true);
    assert!(s.is_animating());
    assert_eq!(f.group.member_count(), 1);
}

#[test]
fn hidden_surface_draws_content_only() {
    let f = fixture();
    let mut s = surface(procedural_config(), &f.group);
    s.on_visibility_changed(false);

    let mut rec = Recorder::default();
    assert_eq!(s.draw(&mut rec, content), RenderFrame::Plain);
    assert_eq!(rec.calls, vec![content_call()]);
    assert_eq!(f.group.member_count(), 0);
}

#[test]
fn dispose_and_drop_leave_the_group() {
    let f = fixture();
    let mut a = surface(procedural_config(), &f.group);
    let b = surface(procedural_config(), &f.group);
    assert_eq!(f.group.member_count(), 2);

    a.dispose();
    assert_eq!(f.group.member_count(), 1);
    drop(b);
    assert_eq!(f.group.member_count(), 0);
}

#[test]
fn group_stop_is_picked_up_by_next_draw() {
    let f = fixture();
    let mut s = surface(procedural_config(), &f.group);
    f.group.tick(Timestamp(0));
    s.member().set_visible(false);
    f.group.tick(Timestamp(16));
    assert!(!s.is_animating());

    s.member().set_visible(true);
    let mut rec = Recorder::default();
    s.draw(&mut rec, content);
    assert!(s.is_animating());
}

#[test]
fn shared_mask_waits_for_buffers_then_composes() {
    let f = fixture();
    let mut s = surface(masked_config(), &f.group);

    let mut rec = Recorder::default();
    assert_eq!(s.draw(&mut rec, content), RenderFrame::Pending);
    assert_eq!(rec.calls, vec![content_call()]);

    f.spawner.run_all();
    f.group.propagate(0.5);
    let mut rec = Recorder::default();
    let frame = s.draw(&mut rec, content);
    assert_eq!(
        frame,
        RenderFrame::Masked {
            offset: 0,
            scratch_reused: false
        }
    );
    let scratch_id = f.group.scratch().ready().unwrap().id();
    assert_eq!(
        rec.calls,
        vec![
            Call::SaveLayer,
            content_call(),
            Call::Clip(Rect::new(0.0, 0.0, 200.0, 100.0)),
            Call::Fill {
                rect: Rect::new(70.0, 0.0, 130.0, 100.0),
                shader: ShaderKind::Image(scratch_id),
                transform: Affine::translate((70.0, 0.0)),
                color: None,
                blend: BlendMode::SrcOver,
            },
            Call::Restore,
        ]
    );
}

#[test]
fn scratch_is_reused_until_offset_or_writer_changes() {
    let f = fixture();
    let mut a = surface(masked_config(), &f.group);
    let mut b = surface(masked_config(), &f.group);
    let mut rec = Recorder::default();
    a.draw(&mut rec, content);
    f.spawner.run_all();

    let draw = |s: &mut Surface| {
        let mut rec = Recorder::default();
        s.draw(&mut rec, content)
    };
    f.group.propagate(0.5);
    assert!(matches!(draw(&mut a), RenderFrame::Masked { scratch_reused: false, .. }));
    assert!(matches!(draw(&mut a), RenderFrame::Masked { scratch_reused: true, .. }));
    assert!(matches!(draw(&mut b), RenderFrame::Masked { scratch_reused: false, .. }));
    assert!(matches!(draw(&mut b), RenderFrame::Masked { scratch_reused: true, .. }));

    f.group.propagate(0.25);
    assert!(matches!(
        draw(&mut b),
        RenderFrame::Masked {
            offset: -65,
            scratch_reused: false
        }
    ));
}

fn masked_frame(s: &mut Surface) -> RenderFrame {
    let mut rec = Recorder::default();
    s.draw(&mut rec, content)
}

#[test]
fn hide_and_show_renders_the_scratch_again() {
    let f = fixture();
    let mut s = surface(masked_config(), &f.group);
    assert_eq!(masked_frame(&mut s), RenderFrame::Pending);
    f.spawner.run_all();
    f.group.tick(Timestamp(0));
    f.group.propagate(0.5);
    assert_eq!(
        masked_frame(&mut s),
        RenderFrame::Masked {
            offset: 0,
            scratch_reused: false
        }
    );

    s.on_visibility_changed(false);
    s.on_visibility_changed(true);
    assert!(f.group.scratch().ready().is_some());
    assert_eq!(
        masked_frame(&mut s),
        RenderFrame::Masked {
            offset: 0,
            scratch_reused: false
        }
    );
    assert!(matches!(
        masked_frame(&mut s),
        RenderFrame::Masked {
            scratch_reused: true,
            ..
        }
    ));
}

#[test]
fn member_stopped_by_the_group_renders_the_scratch_again() {
    let f = fixture();
    let mut s = surface(masked_config(), &f.group);
    masked_frame(&mut s);
    f.spawner.run_all();
    f.group.tick(Timestamp(0));
    f.group.propagate(0.5);
    assert!(matches!(
        masked_frame(&mut s),
        RenderFrame::Masked {
            scratch_reused: false,
            ..
        }
    ));

    s.member().set_visible(false);
    f.group.propagate(0.5);
    assert!(!s.is_animating());
    s.member().set_visible(true);
    assert_eq!(
        masked_frame(&mut s),
        RenderFrame::Masked {
            offset: 0,
            scratch_reused: false
        }
    );
}

#[test]
fn default_shader_comes_back_after_a_custom_one() {
    let f = fixture();
    let mut s = Surface::with_group(procedural_config(), f.group.clone()).unwrap();
    s.set_shader(Customization::custom(|_p: f64| Shader::Solid(RED)));
    s.on_size_changed(200, 100);

    let mut rec = Recorder::default();
    s.draw(&mut rec, content);
    assert!(matches!(
        rec.calls[2],
        Call::Fill {
            shader: ShaderKind::Solid(RED),
            ..
        }
    ));

    s.set_shader(Customization::Default);
    let mut rec = Recorder::default();
    assert_eq!(
        s.draw(&mut rec, content),
        RenderFrame::Procedural { progress: 0.0 }
    );
    assert!(matches!(
        rec.calls[2],
        Call::Fill {
            shader: ShaderKind::Linear,
            ..
        }
    ));
}

#[test]
fn procedural_pixels_tint_content_under_the_band() {
    let f = fixture();
    let mut s = surface(procedural_config(), &f.group);
    f.group.propagate(0.5);
    let frame = s.render_rgba(content);
    assert_eq!((frame.width, frame.height), (200, 100));

    let px = |x: usize, y: usize| {
        let i = (y * 200 + x) * 4;
        [frame.data[i], frame.data[i + 1], frame.data[i + 2], frame.data[i + 3]]
    };
    // Default color is white at half opacity, laid atop opaque red.
    assert_eq!(px(100, 50), [255, 128, 128, 255]);
    assert_eq!(px(5, 50), [255, 0, 0, 255]);
    assert_eq!(px(195, 50), [255, 0, 0, 255]);
}

#[test]
fn shared_mask_pixels_match_procedural_core() {
    let f = fixture();
    let mut s = surface(masked_config(), &f.group);
    s.render_rgba(content);
    f.spawner.run_all();
    f.group.propagate(0.5);

    let frame = s.render_rgba(content);
    let px = |x: usize, y: usize| {
        let i = (y * 200 + x) * 4;
        [frame.data[i], frame.data[i + 1], frame.data[i + 2], frame.data[i + 3]]
    };
    assert_eq!(px(100, 50), [255, 128, 128, 255]);
    assert_eq!(px(10, 50), [255, 0, 0, 255]);
    assert_eq!(px(150, 50), [255, 0, 0, 255]);
}

#[test]
fn configure_validates_and_restarts() {
    let f = fixture();
    let mut s = surface(procedural_config(), &f.group);
    let bad = ShimmerConfig {
        band_fraction: 0.9,
        ..ShimmerConfig::default()
    };
    assert!(s.configure(bad).is_err());
    assert!(s.is_animating());

    s.configure(masked_config()).unwrap();
    assert!(!s.is_animating());
    let mut rec = Recorder::default();
    assert_eq!(s.draw(&mut rec, content), RenderFrame::Pending);
    assert!(s.is_animating());
}

#[test]
fn configure_in_registry_moves_to_named_group() {
    let registry = GroupRegistry::new(GroupOpts {
        spawner: Arc::new(ManualSpawner::new()),
        ..GroupOpts::default()
    });
    let named = ShimmerConfig {
        group: Some("cards".to_owned()),
        ..procedural_config()
    };
    let mut a = Surface::in_registry(named.clone(), &registry).unwrap();
    let mut b = Surface::new(procedural_config()).unwrap();
    b.configure_in(named, &registry).unwrap();
    a.on_size_changed(200, 100);
    b.on_size_changed(200, 100);

    let group = registry.get("cards").unwrap();
    assert!(a.group().unwrap().ptr_eq(&group));
    assert!(b.group().unwrap().ptr_eq(&group));
    assert_eq!(group.member_count(), 2);
}

#[test]
fn buffers_are_released_when_everything_goes_away() {
    let f = fixture();
    {
        let mut s = surface(masked_config(), &f.group);
        s.render_rgba(content);
        f.spawner.run_all();
        s.render_rgba(content);
    }
    let counters = f.counters.clone();
    drop(f);
    let stats = counters.snapshot();
    assert_eq!(stats.acquired, 2);
    assert_eq!(stats.released, 2);
}
