//! Two-point route segments

use crate::geometry::{self, Point3D};
use geo::Line;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A straight edge between two points
///
/// `distance` always equals `geometry::distance(start, end)`; the endpoints
/// are only reachable through constructors that recompute it.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Segment {
    start: Point3D,
    end: Point3D,
    distance: f64,
}

impl Segment {
    /// Create a segment, computing its length
    pub fn new(start: Point3D, end: Point3D) -> Self {
        Self {
            start,
            end,
            distance: geometry::distance(&start, &end),
        }
    }

    #[inline]
    pub fn start(&self) -> &Point3D {
        &self.start
    }

    #[inline]
    pub fn end(&self) -> &Point3D {
        &self.end
    }

    /// Length, floored to two decimals
    #[inline]
    pub fn distance(&self) -> f64 {
        self.distance
    }

    /// Both endpoints on the same floor (not an elevator hop)
    #[inline]
    pub fn is_same_floor(&self) -> bool {
        self.start.same_floor(&self.end)
    }

    /// Whether either endpoint lies on the floor at elevation `z`
    #[inline]
    pub fn touches_elevation(&self, z: f64) -> bool {
        self.start.z == z || self.end.z == z
    }

    /// Start and end coincide
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.start == self.end
    }

    /// Whether the two segments share an exact endpoint
    pub fn is_continuous_with(&self, other: &Segment) -> bool {
        self.start == other.start
            || self.start == other.end
            || self.end == other.start
            || self.end == other.end
    }

    /// Whether `point` equals one of the endpoints
    #[inline]
    pub fn has_endpoint(&self, point: &Point3D) -> bool {
        self.start == *point || self.end == *point
    }

    /// Planar line through the endpoints
    #[inline]
    pub fn line(&self) -> Line<f64> {
        Line::new(self.start.planar(), self.end.planar())
    }

    /// Split into the chain `start -> cuts[0] -> ... -> end`
    ///
    /// `cuts` must already be ordered along the segment.
    pub fn split_at(&self, cuts: &[Point3D]) -> Vec<Segment> {
        let mut chain = Vec::with_capacity(cuts.len() + 1);
        let mut from = self.start;
        for cut in cuts {
            chain.push(Segment::new(from, *cut));
            from = *cut;
        }
        chain.push(Segment::new(from, self.end));
        chain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_distance_computed() {
        let seg = Segment::new(Point3D::new(0.0, 0.0, 0.0), Point3D::new(6.0, 8.0, 0.0));
        assert_eq!(seg.distance(), 10.0);
        assert!(seg.is_same_floor());
        assert!(!seg.is_degenerate());
    }

    #[test]
    fn test_elevator_hop_is_not_same_floor() {
        let seg = Segment::new(Point3D::new(1.0, 1.0, 0.0), Point3D::new(1.0, 1.0, 250.0));
        assert!(!seg.is_same_floor());
        assert_eq!(seg.distance(), 250.0);
        assert!(seg.touches_elevation(0.0));
        assert!(seg.touches_elevation(250.0));
        assert!(!seg.touches_elevation(500.0));
    }

    #[test]
    fn test_continuity() {
        let a = Segment::new(Point3D::new(0.0, 0.0, 0.0), Point3D::new(10.0, 0.0, 0.0));
        let b = Segment::new(Point3D::new(10.0, 0.0, 0.0), Point3D::new(10.0, 10.0, 0.0));
        let c = Segment::new(Point3D::new(20.0, 0.0, 0.0), Point3D::new(30.0, 0.0, 0.0));
        assert!(a.is_continuous_with(&b));
        assert!(b.is_continuous_with(&a));
        assert!(!a.is_continuous_with(&c));
    }

    #[test]
    fn test_split_at_builds_chain() {
        let seg = Segment::new(Point3D::new(0.0, 0.0, 0.0), Point3D::new(100.0, 0.0, 0.0));
        let chain = seg.split_at(&[Point3D::new(25.0, 0.0, 0.0), Point3D::new(60.0, 0.0, 0.0)]);

        assert_eq!(chain.len(), 3);
        assert_eq!(chain[0].end(), chain[1].start());
        assert_eq!(chain[1].end(), chain[2].start());
        assert_eq!(chain[2].end(), seg.end());
        let total: f64 = chain.iter().map(Segment::distance).sum();
        assert_eq!(total, 100.0);
    }

    #[test]
    fn test_split_at_without_cuts_is_identity() {
        let seg = Segment::new(Point3D::new(0.0, 0.0, 0.0), Point3D::new(5.0, 0.0, 0.0));
        assert_eq!(seg.split_at(&[]), vec![seg]);
    }
}
