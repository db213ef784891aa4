use crate::types::{Point, Value, Vector};

/// Squared length of `v`.
#[inline]
pub fn dot2(v: &Vector) -> Value {
    v.dot(v)
}

/// Clamps a curve parameter to `[0, 1]`.
///
/// NaN collapses to `0` so that a degenerate solve still lands on the curve.
#[inline]
pub fn clamp_unit(t: Value) -> Value {
    if t.is_nan() { 0. } else { t.clamp(0., 1.) }
}

/// Returns `v / |v|`, or `None` when `v` has zero or non-finite length.
#[inline]
pub fn safe_normalize(v: &Vector) -> Option<Vector> {
    let mag = v.norm();
    if mag == 0. || !mag.is_finite() {
        None
    } else {
        Some(v / mag)
    }
}

#[inline]
pub fn is_finite_point(p: &Point) -> bool {
    p.x.is_finite() && p.y.is_finite()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_unit_bounds() {
        assert_eq!(clamp_unit(-0.5), 0.);
        assert_eq!(clamp_unit(0.25), 0.25);
        assert_eq!(clamp_unit(3.), 1.);
        assert_eq!(clamp_unit(Value::NAN), 0.);
    }

    #[test]
    fn normalize_rejects_zero() {
        assert!(safe_normalize(&Vector::zeros()).is_none());
        assert!(safe_normalize(&Vector::new(Value::INFINITY, 0.)).is_none());
        let n = safe_normalize(&Vector::new(3., 4.)).unwrap();
        assert!((n.norm() - 1.).abs() < 1e-12);
        assert!((n.x - 0.6).abs() < 1e-12);
    }

    #[test]
    fn finite_points() {
        assert!(is_finite_point(&Point::new(1., -2.)));
        assert!(!is_finite_point(&Point::new(Value::NAN, 0.)));
    }
}
