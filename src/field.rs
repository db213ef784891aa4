//! Composable signed distance fields.
//!
//! A [`Field`] is an expression tree. Leaves are [`Primitive`] shapes and
//! [`Field::Identity`]; inner nodes transform or combine their children, and
//! each node owns its children exclusively. Evaluation walks the tree at
//! query time:
//!
//! ```text
//!              Annular(30)
//!                   |
//!                 Union
//!                /     \
//!           Union       Bezier(c, d, e)
//!          /     \
//!   LineSegment   LineSegment
//!     (a, b)        (b, c)
//! ```
//!
//! Fields are immutable once built, so a composed field can be shared across
//! threads and queried concurrently.

use std::{
    iter::Sum,
    ops::{Add, AddAssign},
};

use serde::{Deserialize, Serialize};

use crate::{
    primitives::{bezier_distance, circle_distance, line_segment_distance},
    types::{Point, Value, Vector},
};

/// A shape with a closed-form distance function.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Primitive {
    /// Filled circle centred at the origin.
    Circle { radius: Value },
    /// Zero-width finite line segment.
    LineSegment { start: Point, end: Point },
    /// Zero-width quadratic Bezier curve.
    Bezier {
        start: Point,
        control: Point,
        end: Point,
    },
}

impl Primitive {
    #[inline]
    pub fn distance(&self, p: &Point) -> Value {
        match self {
            Primitive::Circle { radius } => circle_distance(p, *radius),
            Primitive::LineSegment { start, end } => line_segment_distance(p, start, end),
            Primitive::Bezier {
                start,
                control,
                end,
            } => bezier_distance(p, start, control, end),
        }
    }
}

/// A scalar field `Point -> signed distance`: negative inside, zero on the
/// boundary, positive outside.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum Field {
    /// `+∞` everywhere. Neutral element of [`Field::union`].
    #[default]
    Identity,
    Primitive(Primitive),
    /// `child(p - offset)`
    Translate { child: Box<Field>, offset: Vector },
    /// `child(p) - radius`
    Round { child: Box<Field>, radius: Value },
    /// `|child(p)| - radius`
    Annular { child: Box<Field>, radius: Value },
    /// `min(left(p), right(p))`
    Union(Box<Field>, Box<Field>),
}

impl From<Primitive> for Field {
    fn from(primitive: Primitive) -> Self {
        Field::Primitive(primitive)
    }
}

impl Field {
    /// The empty field, safe seed for folding a union over no shapes.
    pub fn identity() -> Self {
        Field::Identity
    }

    pub fn circle(radius: Value) -> Self {
        Primitive::Circle { radius }.into()
    }

    pub fn line_segment(start: Point, end: Point) -> Self {
        Primitive::LineSegment { start, end }.into()
    }

    pub fn bezier(start: Point, control: Point, end: Point) -> Self {
        Primitive::Bezier {
            start,
            control,
            end,
        }
        .into()
    }

    /// Evaluates the signed distance at `p`.
    pub fn query(&self, p: &Point) -> Value {
        match self {
            Field::Identity => Value::INFINITY,
            Field::Primitive(primitive) => primitive.distance(p),
            Field::Translate { child, offset } => child.query(&(*p - *offset)),
            Field::Round { child, radius } => child.query(p) - radius,
            Field::Annular { child, radius } => child.query(p).abs() - radius,
            Field::Union(left, right) => left.query(p).min(right.query(p)),
        }
    }

    /// Moves the shape by `(dx, dy)`.
    pub fn translate(self, dx: Value, dy: Value) -> Self {
        Field::Translate {
            child: Box::new(self),
            offset: Vector::new(dx, dy),
        }
    }

    /// Grows the shape outward by `r`, giving curves and points a thickness.
    pub fn round(self, r: Value) -> Self {
        Field::Round {
            child: Box::new(self),
            radius: r,
        }
    }

    /// Hollows the shape into a shell of half-width `r` around its boundary.
    ///
    /// Applied to a curve this is the drivable corridor of a track.
    pub fn annular(self, r: Value) -> Self {
        Field::Annular {
            child: Box::new(self),
            radius: r,
        }
    }

    /// Nearest-shape-wins combination of `self` and `other`.
    ///
    /// Unions with [`Field::Identity`] collapse to the other operand.
    pub fn union(self, other: Field) -> Self {
        match (self, other) {
            (Field::Identity, field) | (field, Field::Identity) => field,
            (left, right) => Field::Union(Box::new(left), Box::new(right)),
        }
    }

    /// Length of the longest root-to-leaf path, counting both ends.
    pub fn depth(&self) -> usize {
        match self {
            Field::Identity | Field::Primitive(_) => 1,
            Field::Translate { child, .. }
            | Field::Round { child, .. }
            | Field::Annular { child, .. } => 1 + child.depth(),
            Field::Union(left, right) => 1 + left.depth().max(right.depth()),
        }
    }

    /// Number of nodes in the expression tree.
    pub fn node_count(&self) -> usize {
        match self {
            Field::Identity | Field::Primitive(_) => 1,
            Field::Translate { child, .. }
            | Field::Round { child, .. }
            | Field::Annular { child, .. } => 1 + child.node_count(),
            Field::Union(left, right) => 1 + left.node_count() + right.node_count(),
        }
    }
}

impl Add for Field {
    type Output = Field;

    fn add(self, rhs: Field) -> Field {
        self.union(rhs)
    }
}

impl AddAssign for Field {
    fn add_assign(&mut self, rhs: Field) {
        let lhs = std::mem::take(self);
        *self = lhs.union(rhs);
    }
}

/// Unions every field pairwise, level by level, so `N` shapes give a tree of
/// depth about `log2(N)`. Chains of `+` or `+=` stay left-deep.
impl Sum for Field {
    fn sum<I: Iterator<Item = Field>>(iter: I) -> Field {
        let mut level: Vec<Field> = iter.collect();
        while level.len() > 1 {
            let mut fields = level.into_iter();
            let mut next = Vec::with_capacity(fields.len().div_ceil(2));
            while let Some(left) = fields.next() {
                next.push(match fields.next() {
                    Some(right) => left.union(right),
                    None => left,
                });
            }
            level = next;
        }
        level.pop().unwrap_or_default()
    }
}
