use splashcursor::shader::{apply_keywords, keyword_set, preprocess};
use splashcursor::simulation::clamp_delta;
use splashcursor::{PingPong, grid_resolution};

#[test]
fn test_keyword_sets_are_order_insensitive() {
    assert_eq!(
        keyword_set(&["SHADING", "MANUAL_FILTERING"]),
        keyword_set(&["MANUAL_FILTERING", "SHADING"]),
    );
}

#[test]
fn test_distinct_keyword_sets_get_distinct_keys() {
    // The additive character-code hash the GLSL lineage used collides for
    // sets like these; the canonical set key must not.
    assert_ne!(keyword_set(&["AB"]), keyword_set(&["BA"]));
    assert_ne!(keyword_set(&["A", "B"]), keyword_set(&["AB"]));
    assert_ne!(keyword_set(&["SHADING"]), keyword_set(&[]));
}

const TEMPLATE: &str = "\
#ifdef SHADING
shaded line
#else
flat line
#endif
always line
";

#[test]
fn test_preprocess_keeps_defined_blocks() {
    let out = preprocess(&format!("#define SHADING\n{TEMPLATE}"));
    assert!(out.contains("shaded line"));
    assert!(!out.contains("flat line"));
    assert!(out.contains("always line"));
}

#[test]
fn test_preprocess_drops_undefined_blocks() {
    let out = preprocess(TEMPLATE);
    assert!(!out.contains("shaded line"));
    assert!(out.contains("flat line"));
    assert!(out.contains("always line"));
}

#[test]
fn test_apply_keywords_prepends_defines() {
    let out = apply_keywords(TEMPLATE, &keyword_set(&["SHADING"]));
    assert!(out.contains("shaded line"));
    assert!(!out.contains("flat line"));
}

#[test]
fn test_directives_never_reach_the_compiler() {
    let out = apply_keywords(TEMPLATE, &keyword_set(&["SHADING"]));
    assert!(
        !out.contains('#'),
        "preprocessor directives leaked into the source:\n{out}"
    );
}

#[test]
fn test_grid_resolution_scales_longer_dimension() {
    // Landscape: shorter edge takes the base, longer scales by aspect.
    assert_eq!(grid_resolution(128, 1920, 1080), (228, 128));
    // Portrait mirrors it.
    assert_eq!(grid_resolution(128, 1080, 1920), (128, 228));
    // Square surfaces stay square.
    assert_eq!(grid_resolution(128, 512, 512), (128, 128));
    // Rounded to nearest, not truncated.
    assert_eq!(grid_resolution(100, 640, 480), (133, 100));
}

#[test]
fn test_grid_resolution_tolerates_degenerate_surfaces() {
    let (w, h) = grid_resolution(64, 0, 0);
    assert!(w >= 1 && h >= 1);
}

#[test]
fn test_ping_pong_swap_is_an_involution() {
    let mut cursor = PingPong::default();
    let original = (cursor.read(), cursor.write());
    assert_ne!(cursor.read(), cursor.write(), "read and write must never alias");

    cursor.swap();
    assert_ne!(cursor.read(), cursor.write());
    assert_eq!(cursor.read(), original.1, "swap exchanges the roles");

    cursor.swap();
    assert_eq!(
        (cursor.read(), cursor.write()),
        original,
        "swapping twice restores the original pair"
    );
}

#[test]
fn test_frame_delta_is_clamped() {
    // A stalled tab hands the driver a huge delta; it must come back capped.
    assert_eq!(clamp_delta(5.0), splashcursor::config::MAX_FRAME_TIME);
    assert_eq!(clamp_delta(-0.01), 0.0);
    let small = 0.005;
    assert_eq!(clamp_delta(small), small);
}
