//! Planar joint geometry.
//!
//! Landmarks arrive as normalised image coordinates; the only geometric
//! quantity classification needs is the included angle at a joint.

use serde::{Deserialize, Serialize};

/// A point in normalised image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f32,
    pub y: f32,
}

impl Point2D {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Returns the included angle at vertex `b` of the triple `(a, b, c)`,
/// in degrees within `[0, 180]`.
///
/// The angle is the absolute difference between the directions b→c and
/// b→a, folded so that reflex measurements map onto their interior
/// counterpart. Callers must not pass `b` coincident with `a` or `c`;
/// the direction of a zero-length vector is undefined.
pub fn included_angle(a: Point2D, b: Point2D, c: Point2D) -> f32 {
    let to_c = (c.y - b.y).atan2(c.x - b.x);
    let to_a = (a.y - b.y).atan2(a.x - b.x);
    let mut degrees = (to_c - to_a).to_degrees().abs();
    if degrees > 180.0 {
        degrees = 360.0 - degrees;
    }
    degrees
}
