// tests/svgpath.rs

use std::error::Error;

use assetflow::stages::svgpath::{fmt, transform_path, GlyphTransform};

type TestResult = Result<(), Box<dyn Error>>;

const DOUBLE: GlyphTransform = GlyphTransform {
    scale: 2.0,
    min_x: 0.0,
    min_y: 0.0,
    baseline: 100.0,
};

#[test]
fn absolute_commands_scale_and_flip() -> TestResult {
    assert_eq!(transform_path("M1 2L3 4", &DOUBLE)?, "M 2 96 L 6 92");
    assert_eq!(transform_path("M0,0 H5 V10 Z", &DOUBLE)?, "M 0 100 H 10 V 80 Z");
    Ok(())
}

#[test]
fn relative_offsets_only_scale_and_negate_y() -> TestResult {
    assert_eq!(transform_path("M0 0h1v1h-1z", &DOUBLE)?, "M 0 100 h 2 v -2 h -2 z");
    Ok(())
}

#[test]
fn leading_relative_moveto_is_absolute_and_extra_pairs_are_linetos() -> TestResult {
    assert_eq!(transform_path("m1 2 3 4", &DOUBLE)?, "M 2 96 l 6 -8");
    assert_eq!(transform_path("M1 1 2 2", &DOUBLE)?, "M 2 98 L 4 96");
    Ok(())
}

#[test]
fn view_box_origin_is_subtracted() -> TestResult {
    let t = GlyphTransform {
        scale: 1.0,
        min_x: 10.0,
        min_y: 10.0,
        baseline: 50.0,
    };
    assert_eq!(transform_path("M10 10L20 30", &t)?, "M 0 50 L 10 30");
    Ok(())
}

#[test]
fn curves_transform_every_pair() -> TestResult {
    assert_eq!(
        transform_path("M0 0C1 1 2 2 3 3", &DOUBLE)?,
        "M 0 100 C 2 98 4 96 6 94"
    );
    assert_eq!(transform_path("M0 0q1 1 2 2", &DOUBLE)?, "M 0 100 q 2 -2 4 -4");
    Ok(())
}

#[test]
fn arcs_flip_sweep_and_rotation() -> TestResult {
    assert_eq!(
        transform_path("M0 0A1 1 30 0 1 2 2", &DOUBLE)?,
        "M 0 100 A 2 2 -30 0 0 4 96"
    );
    // Compact flags written without separators.
    assert_eq!(
        transform_path("M0 0a1 1 0 1010 0", &DOUBLE)?,
        "M 0 100 a 2 2 0 1 1 20 0"
    );
    Ok(())
}

#[test]
fn numbers_with_signs_and_exponents() -> TestResult {
    assert_eq!(transform_path("M1e1-2", &DOUBLE)?, "M 20 104");
    assert_eq!(transform_path("M.5.5", &DOUBLE)?, "M 1 99");
    Ok(())
}

#[test]
fn malformed_path_data_is_rejected() {
    assert!(transform_path("10 10", &DOUBLE).is_err());
    assert!(transform_path("M0 0 X1 1", &DOUBLE).is_err());
    assert!(transform_path("M0", &DOUBLE).is_err());
    assert!(transform_path("M0 0z 1 1", &DOUBLE).is_err());
}

#[test]
fn fmt_rounds_to_two_decimals() {
    assert_eq!(fmt(2.0), "2");
    assert_eq!(fmt(1.5), "1.5");
    assert_eq!(fmt(1.006), "1.01");
    assert_eq!(fmt(-0.001), "0");
    assert_eq!(fmt(-12.25), "-12.25");
}
