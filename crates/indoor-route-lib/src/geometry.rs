//! Floor-aware geometry kernel
//!
//! Pure functions over [`Point3D`]: distances, segment/segment intersection and
//! point-to-segment projection. Planar operations work on `geo::Coord<f64>`
//! where `x` is the map latitude axis and `y` the longitude axis.

use crate::utils::{self, truncate};
use geo::{Coord, Line};
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A point on a floor: planar map coordinates plus the floor elevation
///
/// Equality is exact numeric equality on all three fields.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Point3D {
    pub lat: f64,
    pub lng: f64,
    /// Floor elevation (`floor index * floor height`)
    pub z: f64,
}

impl Point3D {
    pub const fn new(lat: f64, lng: f64, z: f64) -> Self {
        Self { lat, lng, z }
    }

    /// Lift a planar coordinate onto the floor at elevation `z`
    #[inline]
    pub fn from_planar(coord: Coord<f64>, z: f64) -> Self {
        Self::new(coord.x, coord.y, z)
    }

    /// Planar projection of this point
    #[inline]
    pub fn planar(&self) -> Coord<f64> {
        Coord {
            x: self.lat,
            y: self.lng,
        }
    }

    /// Identity key used for graph node merging
    #[inline]
    pub fn key(&self) -> PointKey {
        PointKey([
            utils::coordinate_bits(self.lat),
            utils::coordinate_bits(self.lng),
            utils::coordinate_bits(self.z),
        ])
    }

    #[inline]
    pub fn same_floor(&self, other: &Point3D) -> bool {
        self.z == other.z
    }

    /// `true` when no coordinate is NaN or infinite
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite() && self.z.is_finite()
    }

    /// Reject points that cannot take part in distance computations
    pub fn ensure_finite(&self) -> crate::Result<()> {
        if self.is_finite() {
            Ok(())
        } else {
            Err(crate::RouteError::InvalidGeometry(format!(
                "non-finite coordinate in {}",
                self
            )))
        }
    }
}

impl fmt::Display for Point3D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.lat, self.lng, self.z)
    }
}

/// Hashable identity of a [`Point3D`]
///
/// Keys are equal iff the points are equal; never compare floats through it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PointKey([u64; 3]);

impl fmt::Display for PointKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [lat, lng, z] = self.0.map(f64::from_bits);
        write!(f, "{lat}-{lng}-{z}")
    }
}

/// Result of projecting a point onto a segment (or its supporting line)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projection {
    /// Planar distance from the query point to `point`
    pub distance: f64,
    /// Foot of the projection, or the nearest endpoint when clamped
    pub point: Coord<f64>,
    /// Whether the unclamped projection parameter lay within `[0, 1]`
    pub is_vertical: bool,
}

/// Distance between two points, floored to two decimals
///
/// Points on the same floor use the planar distance; otherwise the floor
/// elevation difference is included.
#[inline]
pub fn distance(p1: &Point3D, p2: &Point3D) -> f64 {
    let dx = p1.lat - p2.lat;
    let dy = p1.lng - p2.lng;
    let raw = if p1.same_floor(p2) {
        (dx * dx + dy * dy).sqrt()
    } else {
        let dz = p1.z - p2.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    };
    truncate(raw)
}

/// Intersection point of two planar segments
///
/// Returns `None` for parallel or collinear segments and when the crossing
/// lies outside either segment. The returned coordinate is floored to two
/// decimals.
pub fn segments_intersect(a: &Line<f64>, b: &Line<f64>) -> Option<Coord<f64>> {
    let (a1, a2, b1, b2) = (a.start, a.end, b.start, b.end);

    let ua_t = (b2.x - b1.x) * (a1.y - b1.y) - (b2.y - b1.y) * (a1.x - b1.x);
    let ub_t = (a2.x - a1.x) * (a1.y - b1.y) - (a2.y - a1.y) * (a1.x - b1.x);
    let u_b = (b2.y - b1.y) * (a2.x - a1.x) - (b2.x - b1.x) * (a2.y - a1.y);

    // Parallel or collinear
    if u_b == 0.0 {
        return None;
    }

    let ua = ua_t / u_b;
    let ub = ub_t / u_b;
    if !(0.0..=1.0).contains(&ua) || !(0.0..=1.0).contains(&ub) {
        return None;
    }

    let delta = a.delta();
    Some(Coord {
        x: truncate(a1.x + ua * delta.x),
        y: truncate(a1.y + ua * delta.y),
    })
}

/// Project `point` onto the segment `start..end`
///
/// With `is_segment` the projection parameter is clamped to `[0, 1]`, snapping
/// to the nearest endpoint. A zero-length segment always projects to `start`.
pub fn point_segment_distance(
    point: Coord<f64>,
    start: Coord<f64>,
    end: Coord<f64>,
    is_segment: bool,
) -> Projection {
    let delta = end - start;
    let length_sq = delta.x * delta.x + delta.y * delta.y;

    if length_sq == 0.0 {
        return Projection {
            distance: planar_length(point - start),
            point: start,
            is_vertical: false,
        };
    }

    let t = ((point.x - start.x) * delta.x + (point.y - start.y) * delta.y) / length_sq;
    let foot = if !is_segment || (0.0..=1.0).contains(&t) {
        start + delta * t
    } else if t < 0.0 {
        start
    } else {
        end
    };

    Projection {
        distance: planar_length(point - foot),
        point: foot,
        is_vertical: (0.0..=1.0).contains(&t),
    }
}

#[inline(always)]
fn planar_length(v: Coord<f64>) -> f64 {
    (v.x * v.x + v.y * v.y).sqrt()
}
