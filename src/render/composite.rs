use crate::{
    foundation::core::Rgba8Premul,
    foundation::math::mul_div255_u8,
    render::context::BlendMode,
};

/// Combine `src` into `dst` with `mode`. Both colors are premultiplied.
pub fn blend(mode: BlendMode, dst: Rgba8Premul, src: Rgba8Premul) -> Rgba8Premul {
    match mode {
        BlendMode::SrcOver => over(dst, src),
        BlendMode::SrcAtop => src_atop(dst, src),
        BlendMode::DstIn => dst_in(dst, src),
        BlendMode::SrcIn => src_in(dst, src),
    }
}

pub fn over(dst: Rgba8Premul, src: Rgba8Premul) -> Rgba8Premul {
    if src.a == 0 {
        return dst;
    }
    let inv = 255u16 - u16::from(src.a);
    let mix = |s: u8, d: u8| add_sat_u8(s, mul_div255_u8(u16::from(d), inv));
    Rgba8Premul {
        r: mix(src.r, dst.r),
        g: mix(src.g, dst.g),
        b: mix(src.b, dst.b),
        a: mix(src.a, dst.a),
    }
}

pub fn src_atop(dst: Rgba8Premul, src: Rgba8Premul) -> Rgba8Premul {
    let da = u16::from(dst.a);
    let inv = 255u16 - u16::from(src.a);
    let mix = |s: u8, d: u8| {
        add_sat_u8(
            mul_div255_u8(u16::from(s), da),
            mul_div255_u8(u16::from(d), inv),
        )
    };
    Rgba8Premul {
        r: mix(src.r, dst.r),
        g: mix(src.g, dst.g),
        b: mix(src.b, dst.b),
        a: dst.a,
    }
}

pub fn dst_in(dst: Rgba8Premul, src: Rgba8Premul) -> Rgba8Premul {
    dst.scale(src.a)
}

pub fn src_in(dst: Rgba8Premul, src: Rgba8Premul) -> Rgba8Premul {
    src.scale(dst.a)
}

fn add_sat_u8(a: u8, b: u8) -> u8 {
    a.saturating_add(b)
}
