use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

/// Scalar field value (a signed distance) at a point in the plane.
pub type Value = f64;

/// A 2D point with [`Value`] components.
pub type Point = Point2<Value>;

/// A 2D vector with [`Value`] components.
pub type Vector = Vector2<Value>;

/// A ray cast into a field: `origin + t * direction` for `t >= 0`.
///
/// `direction` does not need to be normalised; a zero direction is allowed
/// and yields the "no direction to march" result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ray {
    pub origin: Point,
    pub direction: Vector,
}

impl Ray {
    pub fn new(origin: Point, direction: Vector) -> Self {
        Self { origin, direction }
    }

    /// Builds a ray from `origin` aimed at `target`.
    pub fn towards(origin: Point, target: Point) -> Self {
        Self::new(origin, target - origin)
    }
}
