use serde::{Deserialize, Serialize};

use crate::{
    field::Field,
    interp::{quadratic_bezier, unit_samples},
    types::{Point, Vector},
    utils::{dot2, is_finite_point},
};

/// One piece of a track's centre line, as placed by an editor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Segment {
    Line {
        start: Point,
        end: Point,
    },
    Bezier {
        start: Point,
        control: Point,
        end: Point,
    },
}

/// The line a segment leaves along at its end, used to snap the next piece
/// so that it continues smoothly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tangent {
    pub anchor: Point,
    pub direction: Vector,
}

impl Tangent {
    /// Closest point to `p` on the infinite tangent line.
    ///
    /// Falls back to the anchor when the direction is zero.
    pub fn project(&self, p: &Point) -> Point {
        let len2 = dot2(&self.direction);
        if len2 == 0. {
            return self.anchor;
        }
        let t = (*p - self.anchor).dot(&self.direction) / len2;
        self.anchor + self.direction * t
    }
}

impl Segment {
    pub fn line(start: Point, end: Point) -> Self {
        Segment::Line { start, end }
    }

    pub fn bezier(start: Point, control: Point, end: Point) -> Self {
        Segment::Bezier {
            start,
            control,
            end,
        }
    }

    /// The zero-width distance field of this segment's curve.
    pub fn to_field(&self) -> Field {
        match *self {
            Segment::Line { start, end } => Field::line_segment(start, end),
            Segment::Bezier {
                start,
                control,
                end,
            } => Field::bezier(start, control, end),
        }
    }

    pub fn start_point(&self) -> Point {
        match *self {
            Segment::Line { start, .. } | Segment::Bezier { start, .. } => start,
        }
    }

    pub fn end_point(&self) -> Point {
        match *self {
            Segment::Line { end, .. } | Segment::Bezier { end, .. } => end,
        }
    }

    /// A line is its own tangent. A Bezier leaves its end point along
    /// `end - control`, so the tangent is anchored at the control point.
    pub fn tangent(&self) -> Tangent {
        match *self {
            Segment::Line { start, end } => Tangent {
                anchor: start,
                direction: end - start,
            },
            Segment::Bezier { control, end, .. } => Tangent {
                anchor: control,
                direction: end - control,
            },
        }
    }

    /// Samples the curve into `resolution` points for drawing.
    ///
    /// Lines always produce their two end points.
    pub fn polyline(&self, resolution: usize) -> Vec<Point> {
        match *self {
            Segment::Line { start, end } => vec![start, end],
            Segment::Bezier {
                start,
                control,
                end,
            } => unit_samples(resolution)
                .map(|t| quadratic_bezier(&start, &control, &end, t))
                .collect(),
        }
    }

    pub fn is_finite(&self) -> bool {
        match self {
            Segment::Line { start, end } => is_finite_point(start) && is_finite_point(end),
            Segment::Bezier {
                start,
                control,
                end,
            } => is_finite_point(start) && is_finite_point(control) && is_finite_point(end),
        }
    }
}
