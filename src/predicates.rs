//! Geometric predicates on `f32` points.
use robust::{orient2d, Coord};

use crate::utils::types::Point2;

#[inline]
fn coord2(p: &Point2) -> Coord<f64> {
    Coord {
        x: f64::from(p[0]),
        y: f64::from(p[1]),
    }
}

#[inline]
fn sign_f64(value: f64) -> f64 {
    if value > 0.0 {
        1.0
    } else if value < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// The orientation of the triangle `abc`: `1.0` if it turns counter-clockwise in a y-up plane, `-1.0` if it
/// turns clockwise and `0.0` if the points are aligned. Adaptive exact arithmetic, so the sign is always right.
#[inline]
pub fn orient_2d(a: &Point2, b: &Point2, c: &Point2) -> f64 {
    sign_f64(orient2d(coord2(a), coord2(b), coord2(c)))
}

/// Twice the signed area of the triangle `abc`, in `f64`. Only for measuring, never for deciding a side.
#[inline]
pub fn double_area(a: &Point2, b: &Point2, c: &Point2) -> f64 {
    let [a, b, c] = [a, b, c].map(coord2);
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// Approximate equality with a tolerance in the range of `f32` rounding.
///
/// Relative `1e-6` for large values, absolute `8 * f32::EPSILON` near zero.
#[inline]
pub fn approx_eq(a: f32, b: f32) -> bool {
    (b - a).abs() < f32::max(1e-6 * f32::max(a.abs(), b.abs()), f32::EPSILON * 8.0)
}

#[inline]
pub fn squared_distance(a: &Point2, b: &Point2) -> f32 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    dx * dx + dy * dy
}
