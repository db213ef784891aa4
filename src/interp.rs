use crate::types::{Point, Value};

// Linear interpolation between two points by factor t
#[inline]
pub fn lerp(a: &Point, b: &Point, t: Value) -> Point {
    *a + (*b - *a) * t
}

// Point on the quadratic Bezier start -> control -> end at parameter t
#[inline]
pub fn quadratic_bezier(start: &Point, control: &Point, end: &Point, t: Value) -> Point {
    lerp(&lerp(start, control, t), &lerp(control, end, t), t)
}

// `resolution` evenly spaced parameters covering [0, 1], endpoints included
pub fn unit_samples(resolution: usize) -> impl Iterator<Item = Value> {
    let steps = resolution.max(2) - 1;
    (0..=steps).map(move |i| i as Value / steps as Value)
}
