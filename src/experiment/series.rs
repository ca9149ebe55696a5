//! Series - step-ordered points for one (experiment, metric) pair

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A single `(step, value)` observation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Point {
    /// Training step or epoch number
    pub step: f64,
    /// Metric value
    pub value: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(step: f64, value: f64) -> Self {
        Self { step, value }
    }
}

/// Total order over step values.
///
/// Numeric order for ordinary values (`-0.0 == 0.0`), NaN after every number.
#[must_use]
pub fn cmp_steps(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

/// Step-ordered sequence of points.
///
/// Non-decreasing by step. Duplicate steps are kept, in the order they
/// were logged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Series {
    points: Vec<Point>,
}

impl Series {
    /// Build a series from points in logged order.
    ///
    /// Sorting is stable, so points sharing a step keep their relative order.
    #[must_use]
    pub fn from_logged(mut points: Vec<Point>) -> Self {
        points.sort_by(|a, b| cmp_steps(a.step, b.step));
        Self { points }
    }

    /// Points in step order.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the series has no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Iterate over points in step order.
    pub fn iter(&self) -> std::slice::Iter<'_, Point> {
        self.points.iter()
    }
}

impl<'a> IntoIterator for &'a Series {
    type Item = &'a Point;
    type IntoIter = std::slice::Iter<'a, Point>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}
