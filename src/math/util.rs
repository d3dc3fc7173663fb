use super::{Point2d, Vector2d};
use cgmath::prelude::*;

/// Rotates a vector 90 degrees clockwise.
pub fn rot90(vec: Vector2d) -> Vector2d {
    Vector2d::new(-vec.y, vec.x)
}

/// Returns the unit normal of the segment from `a` to `b`,
/// or `None` if the segment is degenerate.
pub fn segment_normal(a: Point2d, b: Point2d) -> Option<Vector2d> {
    let dir = b - a;
    if dir.magnitude2() < 1e-12 {
        None
    } else {
        Some(rot90(dir.normalize()))
    }
}

/// Returns the mid-point of a segment.
pub fn midpoint(a: Point2d, b: Point2d) -> Point2d {
    a.midpoint(b)
}

/// The zero vector, used as a serde default.
pub fn zero_vector() -> Vector2d {
    Vector2d::new(0.0, 0.0)
}

/// Whether both components of a point are finite.
pub fn is_finite(p: Point2d) -> bool {
    p.x.is_finite() && p.y.is_finite()
}

/// Wraps a coordinate onto the interval `[0, bound]`.
///
/// A value just past either end re-enters from the opposite end, so
/// `bound + d` becomes `d` and `-d` becomes `bound - d`.
pub fn wrap_toroidal(value: f64, bound: f64) -> f64 {
    if (0.0..=bound).contains(&value) {
        return value;
    }
    let shifted = if value > bound {
        value - bound
    } else {
        value + bound
    };
    if (0.0..=bound).contains(&shifted) {
        shifted
    } else {
        value.rem_euclid(bound)
    }
}
