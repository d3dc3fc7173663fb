//! Miscellaneous utility structs and functions.

use std::fmt::Debug;

use crate::math::Point2d;
use cgmath::num_traits::Float;
use serde::{Deserialize, Serialize};

/// An interval on the real number line.
#[derive(Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval<T> {
    pub min: T,
    pub max: T,
}

impl<T> Interval<T> {
    /// Creates a new interval.
    pub const fn new(min: T, max: T) -> Self {
        Self { min, max }
    }
}

impl<T: std::cmp::PartialOrd> Interval<T> {
    /// Returns true if this interval contains the value.
    pub fn contains(&self, value: T) -> bool {
        value >= self.min && value <= self.max
    }
}

impl<T: Float> Interval<T> {
    /// Creates the interval spanned by two values given in any order.
    pub fn spanning(a: T, b: T) -> Self {
        Self {
            min: T::min(a, b),
            max: T::max(a, b),
        }
    }

    /// Grows the interval by `margin` at both ends.
    pub fn inflate(&self, margin: T) -> Self {
        Self {
            min: self.min - margin,
            max: self.max + margin,
        }
    }
}

impl<T: Debug> Debug for Interval<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Interval({:?}, {:?})", &self.min, &self.max)
    }
}

/// An axis-aligned rectangle in world space.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Rect {
    pub x: Interval<f64>,
    pub y: Interval<f64>,
}

impl Rect {
    /// The bounding rectangle of two corner points.
    pub fn from_corners(a: Point2d, b: Point2d) -> Self {
        Self {
            x: Interval::spanning(a.x, b.x),
            y: Interval::spanning(a.y, b.y),
        }
    }

    /// Grows the rectangle by `margin` on every side.
    pub fn inflate(&self, margin: f64) -> Self {
        Self {
            x: self.x.inflate(margin),
            y: self.y.inflate(margin),
        }
    }

    /// Whether the point lies inside or on the boundary.
    pub fn contains(&self, p: Point2d) -> bool {
        self.x.contains(p.x) && self.y.contains(p.y)
    }
}
