use rand::SeedableRng;
use rand::rngs::StdRng;
use splashcursor::color::{hsv_to_rgb, rgb_to_hsv, splat_color, wrap};

#[test]
fn test_hsv_primaries() {
    let red = hsv_to_rgb(0.0, 1.0, 1.0);
    assert!((red.r - 1.0).abs() < 1e-6 && red.g.abs() < 1e-6 && red.b.abs() < 1e-6);

    let green = hsv_to_rgb(1.0 / 3.0, 1.0, 1.0);
    assert!(green.g > 0.999, "hue 1/3 should be green, got {:?}", green);

    let blue = hsv_to_rgb(2.0 / 3.0, 1.0, 1.0);
    assert!(blue.b > 0.999, "hue 2/3 should be blue, got {:?}", blue);
}

#[test]
fn test_hsv_rgb_round_trip_across_hues() {
    for i in 0..64 {
        let h = i as f32 / 64.0;
        let rgb = hsv_to_rgb(h, 1.0, 1.0);
        let (h2, s2, v2) = rgb_to_hsv(rgb);

        assert!(
            (h2 - h).abs() <= 1e-3,
            "hue {} round-tripped to {} (error {})",
            h,
            h2,
            (h2 - h).abs()
        );
        assert!((s2 - 1.0).abs() <= 1e-3, "saturation drifted: {}", s2);
        assert!((v2 - 1.0).abs() <= 1e-3, "value drifted: {}", v2);
    }
}

#[test]
fn test_splat_color_intensity_scaling() {
    // Full saturation and value scaled by 0.15: the brightest channel is
    // exactly 0.15, the darkest 0.
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..32 {
        let color = splat_color(&mut rng);
        let max = color.r.max(color.g).max(color.b);
        let min = color.r.min(color.g).min(color.b);
        assert!((max - 0.15).abs() < 1e-5, "max channel should be 0.15, got {max}");
        assert!(min.abs() < 1e-5, "min channel should be 0, got {min}");
    }
}

#[test]
fn test_wrap_cycles_into_range() {
    assert_eq!(wrap(1.25, 0.0, 1.0), 0.25);
    assert_eq!(wrap(0.5, 0.0, 1.0), 0.5);
    assert_eq!(wrap(2.75, 0.0, 1.0), 0.75);
    assert_eq!(wrap(3.0, 1.0, 3.0), 1.0);
}

#[test]
fn test_wrap_with_empty_range_returns_min() {
    assert_eq!(wrap(42.0, 0.3, 0.3), 0.3);
}
