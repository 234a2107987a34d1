use glam::Vec2;
use splashcursor::Rgb;
use splashcursor::pointer::{
    InputQueue, Pointer, PointerEvent, SYNTHETIC_POINTER_ID, correct_radius, to_uv,
};

#[test]
fn test_uv_mapping_covers_surface_corners() {
    let surface = Vec2::new(800.0, 600.0);
    // Device pixels have their origin at the top-left; v points up.
    assert_eq!(to_uv(Vec2::new(0.0, 0.0), surface), Vec2::new(0.0, 1.0));
    assert_eq!(to_uv(Vec2::new(800.0, 600.0), surface), Vec2::new(1.0, 0.0));
    assert_eq!(to_uv(Vec2::new(400.0, 300.0), surface), Vec2::new(0.5, 0.5));
}

#[test]
fn test_uv_mapping_is_pixel_ratio_independent() {
    // Pre-scaling position and surface by the same device-pixel ratio
    // lands on the same normalized coordinate.
    let surface = Vec2::new(640.0, 480.0);
    let position = Vec2::new(123.0, 456.0);
    for ratio in [1.0, 1.5, 2.0, 3.0] {
        let scaled = to_uv(position * ratio, surface * ratio);
        let unscaled = to_uv(position, surface);
        assert!(
            (scaled - unscaled).length() < 1e-6,
            "ratio {} shifted uv from {:?} to {:?}",
            ratio,
            unscaled,
            scaled
        );
    }
}

#[test]
fn test_press_snaps_position_and_assigns_color() {
    let mut pointer = Pointer::default();
    let surface = Vec2::new(800.0, 600.0);
    let color = Rgb::new(0.1, 0.2, 0.3);

    pointer.press(SYNTHETIC_POINTER_ID, Vec2::new(400.0, 300.0), surface, color);

    assert!(pointer.down);
    assert!(!pointer.moved, "press alone is not movement");
    assert_eq!(pointer.texcoord, pointer.prev_texcoord);
    assert_eq!(pointer.delta, Vec2::ZERO);
    assert_eq!(pointer.color, color);
}

#[test]
fn test_move_sets_aspect_corrected_delta() {
    let color = Rgb::default();

    // Wide surface (aspect 2): vertical deltas are compressed.
    let wide = Vec2::new(1600.0, 800.0);
    let mut pointer = Pointer::default();
    pointer.press(SYNTHETIC_POINTER_ID, Vec2::new(800.0, 400.0), wide, color);
    pointer.advance(Vec2::new(800.0, 320.0), wide);
    assert!(pointer.moved);
    assert!((pointer.delta.x).abs() < 1e-6);
    // Raw dv is +0.1 (moving up); divided by aspect 2.
    assert!((pointer.delta.y - 0.05).abs() < 1e-6, "got {:?}", pointer.delta);

    // Tall surface (aspect 0.5): horizontal deltas are compressed.
    let tall = Vec2::new(800.0, 1600.0);
    let mut pointer = Pointer::default();
    pointer.press(SYNTHETIC_POINTER_ID, Vec2::new(400.0, 800.0), tall, color);
    pointer.advance(Vec2::new(480.0, 800.0), tall);
    // Raw du is +0.1; multiplied by aspect 0.5.
    assert!((pointer.delta.x - 0.05).abs() < 1e-6, "got {:?}", pointer.delta);
    assert!((pointer.delta.y).abs() < 1e-6);
}

#[test]
fn test_move_without_displacement_does_not_set_moved() {
    let surface = Vec2::new(800.0, 600.0);
    let mut pointer = Pointer::default();
    pointer.press(SYNTHETIC_POINTER_ID, Vec2::new(100.0, 100.0), surface, Rgb::default());
    pointer.advance(Vec2::new(100.0, 100.0), surface);
    assert!(!pointer.moved);
}

#[test]
fn test_release_clears_down_flag() {
    let surface = Vec2::new(800.0, 600.0);
    let mut pointer = Pointer::default();
    pointer.press(SYNTHETIC_POINTER_ID, Vec2::new(10.0, 10.0), surface, Rgb::default());
    pointer.release();
    assert!(!pointer.down);
}

#[test]
fn test_input_queue_drains_in_arrival_order() {
    let mut queue = InputQueue::default();
    queue.push(PointerEvent::Down { x: 1.0, y: 2.0 });
    queue.push(PointerEvent::Move { x: 3.0, y: 4.0 });
    queue.push(PointerEvent::Up);
    assert_eq!(queue.len(), 3);

    let drained: Vec<_> = queue.drain().collect();
    assert_eq!(
        drained,
        vec![
            PointerEvent::Down { x: 1.0, y: 2.0 },
            PointerEvent::Move { x: 3.0, y: 4.0 },
            PointerEvent::Up,
        ]
    );
    assert!(queue.is_empty(), "drain must consume every pending event");
}

#[test]
fn test_splat_radius_aspect_correction() {
    // Square and tall surfaces leave the radius alone; wide ones widen it.
    assert_eq!(correct_radius(0.002, 1.0), 0.002);
    assert_eq!(correct_radius(0.002, 0.5), 0.002);
    assert!((correct_radius(0.002, 2.0) - 0.004).abs() < 1e-9);
}
