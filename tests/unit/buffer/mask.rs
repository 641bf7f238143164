use super::*;
use crate::foundation::core::PixelFormat;

#[test]
fn spec_rect_matches_bounding_rect() {
    let spec = MaskSpec::new(200, 100, 0.0, 0.15, 0.05).unwrap();
    assert_eq!(spec.rect.x, 70);
    assert_eq!(spec.rect.width, 60);
    assert_eq!(spec.rect.height, 100);
}

#[test]
fn invalid_spec_is_rejected() {
    assert!(MaskSpec::new(0, 100, 0.0, 0.15, 0.05).is_err());
    assert!(MaskSpec::new(100, 100, 0.0, 0.6, 0.05).is_err());
}

#[test]
fn painted_mask_peaks_in_the_middle() {
    let spec = MaskSpec::new(200, 100, 0.0, 0.15, 0.05).unwrap();
    let mut buf =
        PixelBuffer::try_new(spec.rect.width, spec.rect.height, PixelFormat::Rgba8Premul).unwrap();
    paint_band_mask(&mut buf, &spec);

    assert_eq!(buf.pixel(30, 50).a, 255);
    assert!(buf.pixel(0, 50).a < 20);
    assert!(buf.pixel(59, 50).a < 20);
    assert!(buf.pixel(10, 50).a < buf.pixel(20, 50).a);
}
