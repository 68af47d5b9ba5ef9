//! Map coordinates and the distance functions used as A* heuristics.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Real-world length, in meters, of one map coordinate unit.
///
/// Edge weights and the scaled heuristics share this factor so that the
/// Euclidean estimate never exceeds the true remaining cost.
pub const METERS_PER_UNIT: f64 = 10.0;

/// Planar map coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Straight-line distance in map units.
    pub fn euclidean_distance(&self, other: &Self) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Taxicab distance in map units.
    pub fn manhattan_distance(&self, other: &Self) -> f64 {
        (other.x - self.x).abs() + (other.y - self.y).abs()
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Capability shared by every distance estimate plugged into the search.
pub trait DistanceMetric {
    /// Estimated remaining cost, in meters, from `from` to `to`. Never negative.
    fn distance(&self, from: &Point, to: &Point) -> f64;
}

/// Heuristic families accepted by [`crate::RoadNetwork::search`].
///
/// Only admissible heuristics (never overestimating the remaining path cost)
/// guarantee optimal paths. [`Heuristic::Euclidean`] and [`Heuristic::Null`]
/// are admissible on every network because edge weights are scaled straight
/// line distances. [`Heuristic::Manhattan`] overestimates across diagonal
/// edges and is offered for expansion-count comparisons only.
#[derive(Debug, Clone, Copy)]
pub enum Heuristic {
    /// Scaled straight-line distance.
    Euclidean,
    /// Scaled taxicab distance.
    Manhattan,
    /// Always zero; the search degrades to uniform-cost (Dijkstra) search.
    Null,
    /// Caller-provided estimate. Must be admissible to keep paths optimal.
    Custom {
        name: &'static str,
        estimate: fn(&Point, &Point) -> f64,
    },
}

impl Heuristic {
    /// The three built-in heuristics, in the order reports list them.
    pub const CANONICAL: [Heuristic; 3] =
        [Heuristic::Euclidean, Heuristic::Manhattan, Heuristic::Null];

    pub fn name(&self) -> &'static str {
        match self {
            Heuristic::Euclidean => "euclidean",
            Heuristic::Manhattan => "manhattan",
            Heuristic::Null => "null",
            Heuristic::Custom { name, .. } => name,
        }
    }

    /// Parse one of the built-in heuristic names.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "euclidean" => Some(Heuristic::Euclidean),
            "manhattan" => Some(Heuristic::Manhattan),
            "null" | "dijkstra" => Some(Heuristic::Null),
            _ => None,
        }
    }
}

impl DistanceMetric for Heuristic {
    fn distance(&self, from: &Point, to: &Point) -> f64 {
        match self {
            Heuristic::Euclidean => from.euclidean_distance(to) * METERS_PER_UNIT,
            Heuristic::Manhattan => from.manhattan_distance(to) * METERS_PER_UNIT,
            Heuristic::Null => 0.0,
            Heuristic::Custom { estimate, .. } => estimate(from, to).max(0.0),
        }
    }
}

impl fmt::Display for Heuristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
