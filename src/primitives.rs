//! Closed-form distance functions for the shapes a track is built from.
//!
//! All distances here are unsigned except [`circle_distance`]; curves have no
//! interior, so a thickness is given later with
//! [`Field::round`](crate::field::Field::round) or
//! [`Field::annular`](crate::field::Field::annular).

use std::f64::consts::PI;

use crate::{
    types::{Point, Value},
    utils::{clamp_unit, dot2},
};

/// Below this squared length the Bezier's quadratic term is treated as zero
/// and the curve as the straight segment from start to end.
const DEGENERATE_EPS: Value = 1e-10;

/// Signed distance from `p` to a circle of `radius` centred at the origin.
#[inline]
pub fn circle_distance(p: &Point, radius: Value) -> Value {
    p.coords.norm() - radius
}

/// Distance from `p` to the closest point on the finite segment `[a, b]`.
///
/// ```text
///  h = clamp(dot(p - a, b - a) / |b - a|², 0, 1)
///  d = |(p - a) - (b - a)·h|
/// ```
///
/// A zero-length segment is the single point `a`.
#[inline]
pub fn line_segment_distance(p: &Point, a: &Point, b: &Point) -> Value {
    let pa = p - a;
    let ba = b - a;
    let len2 = dot2(&ba);
    if len2 == 0. {
        return pa.norm();
    }
    let h = clamp_unit(pa.dot(&ba) / len2);
    (pa - ba * h).norm()
}

/// Exact distance from `pos` to the quadratic Bezier `a -> b -> c`
/// (`a` start, `b` control, `c` end).
///
/// Minimising `|B(t) - pos|²` gives a cubic in `t`. After normalising and
/// shifting by `kx` it becomes the depressed cubic `x³ + 3p·x + q = 0`:
///
/// ```text
///  h = q² + 4p³
///  h ≥ 0  →  one real root, Cardano:  x = ∛((√h - q)/2) + ∛((-√h - q)/2)
///  h < 0  →  three real roots:        x = 2√(-p)·cos(v + k·2π/3),  k = 0, 1, 2
///                                     v = acos(q / (2p√(-p))) / 3
/// ```
///
/// Every candidate `t = x - kx` is clamped to `[0, 1]` and the closest one wins.
pub fn bezier_distance(pos: &Point, a: &Point, b: &Point, c: &Point) -> Value {
    let a2 = b - a;
    let b2 = a.coords - 2. * b.coords + c.coords;
    let c2 = a2 * 2.;
    let d = a - pos;

    let b2_len2 = dot2(&b2);
    if b2_len2 < DEGENERATE_EPS {
        // Control point sits on the midpoint of start/end: the curve is a line.
        return line_segment_distance(pos, a, c);
    }

    let kk = 1. / b2_len2;
    let kx = kk * a2.dot(&b2);
    let ky = kk * (2. * dot2(&a2) + d.dot(&b2)) / 3.;
    let kz = kk * d.dot(&a2);

    let p = ky - kx * kx;
    let q = kx * (2. * kx * kx - 3. * ky) + kz;
    let h = q * q + 4. * p * p * p;

    let residual = |t: Value| dot2(&(d + (c2 + b2 * t) * t));

    let res = if h >= 0. {
        let h = h.sqrt();
        // f64::cbrt keeps the sign of its argument.
        let u = ((h - q) / 2.).cbrt();
        let v = ((-h - q) / 2.).cbrt();
        residual(clamp_unit(u + v - kx))
    } else {
        // h < 0 implies p < 0, so z is real and non-zero.
        let z = (-p).sqrt();
        let v = (q / (p * z * 2.)).clamp(-1., 1.).acos() / 3.;
        let third = 2. * PI / 3.;
        [v, v + third, v - third]
            .into_iter()
            .map(|angle| residual(clamp_unit(2. * z * angle.cos() - kx)))
            .fold(Value::INFINITY, Value::min)
    };

    res.sqrt()
}
