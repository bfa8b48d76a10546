//! Raw route data: hand-drawn polylines per floor and elevator groups
//!
//! This module provides the [`RouteMap`] input contract together with the
//! [`FloorLayout`] that maps floor names to elevations.

use crate::geometry::{self, Point3D};
use crate::{Result, RouteError, utils};
use geo::Rect;
use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A planar point as drawn on a floor (no elevation yet)
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PlanarPoint {
    pub lat: f64,
    pub lng: f64,
}

impl PlanarPoint {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    #[inline]
    pub fn at_elevation(&self, z: f64) -> Point3D {
        Point3D::new(self.lat, self.lng, z)
    }
}

/// Points linked as one vertical connector, one per floor
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ElevatorGroup {
    pub list: Vec<Point3D>,
}

impl ElevatorGroup {
    pub fn new(list: Vec<Point3D>) -> Self {
        Self { list }
    }

    /// The connector chain ordered by ascending elevation
    pub fn chain(&self) -> Vec<Point3D> {
        let mut chain = self.list.clone();
        chain.sort_by(|a, b| a.z.total_cmp(&b.z));
        chain
    }
}

/// Ordered floor names and the fixed height of one floor
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FloorLayout {
    /// Floor names, lowest first
    pub floors: Vec<String>,
    /// Elevation step between consecutive floors
    pub floor_height: f64,
}

impl Default for FloorLayout {
    fn default() -> Self {
        Self {
            floors: vec!["B1".to_string(), "F1".to_string(), "F2".to_string()],
            floor_height: utils::DEFAULT_FLOOR_HEIGHT,
        }
    }
}

impl FloorLayout {
    pub fn new(floors: Vec<String>, floor_height: f64) -> Self {
        Self {
            floors,
            floor_height,
        }
    }

    /// Elevation of a named floor
    pub fn elevation(&self, floor: &str) -> Option<f64> {
        self.floors
            .iter()
            .position(|name| name == floor)
            .map(|index| self.elevation_of_index(index))
    }

    #[inline]
    pub fn elevation_of_index(&self, index: usize) -> f64 {
        utils::floor_elevation(index, self.floor_height)
    }

    /// Name of the floor at elevation `z`, if `z` is an exact floor elevation
    pub fn floor_of_elevation(&self, z: f64) -> Option<&str> {
        self.floors
            .iter()
            .enumerate()
            .find(|(index, _)| self.elevation_of_index(*index) == z)
            .map(|(_, name)| name.as_str())
    }

    /// Place a planar point on a named floor
    pub fn locate(&self, floor: &str, lat: f64, lng: f64) -> Result<Point3D> {
        let z = self
            .elevation(floor)
            .ok_or_else(|| RouteError::UnknownFloor(floor.to_string()))?;
        Ok(Point3D::new(lat, lng, z))
    }
}

/// Summary statistics for a route map
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RouteStats {
    /// Number of floors with drawn polylines
    pub floor_count: usize,
    /// Number of drawn polylines (elevators excluded)
    pub polyline_count: usize,
    /// Total number of drawn points (elevators excluded)
    pub total_points: usize,
    /// Number of elevator groups with at least two landings
    pub elevator_count: usize,
    /// Sum of planar polyline lengths
    pub total_length: f64,
}

/// Raw route data as persisted by the drawing tool
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RouteMap {
    /// Floor name -> polylines drawn on that floor
    pub floors: BTreeMap<String, Vec<Vec<PlanarPoint>>>,
    /// Vertical connectors
    #[cfg_attr(feature = "serde", serde(default))]
    pub elevators: Vec<ElevatorGroup>,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl RouteMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a polyline to a floor
    pub fn add_polyline(&mut self, floor: impl Into<String>, points: Vec<PlanarPoint>) {
        self.floors.entry(floor.into()).or_default().push(points);
    }

    pub fn add_elevator(&mut self, group: ElevatorGroup) {
        self.elevators.push(group);
    }

    /// Resolve every polyline and elevator chain into floor-aware points
    ///
    /// Drawn polylines come first (floors in name order), followed by the
    /// elevator chains sorted by ascending elevation. Polylines with fewer
    /// than two points and elevator groups with a single landing are skipped.
    pub fn polylines(&self, layout: &FloorLayout) -> Result<Vec<Vec<Point3D>>> {
        #[cfg(feature = "profiling")]
        profiling::scope!("route::polylines");

        let mut polylines = Vec::new();

        for (floor, lines) in &self.floors {
            let z = layout
                .elevation(floor)
                .ok_or_else(|| RouteError::UnknownFloor(floor.clone()))?;

            for line in lines {
                if line.len() < 2 {
                    tracing::warn!(
                        "Skipping polyline with {} point(s) on floor {}",
                        line.len(),
                        floor
                    );
                    continue;
                }
                let line: Vec<Point3D> = line.iter().map(|p| p.at_elevation(z)).collect();
                line.iter().try_for_each(Point3D::ensure_finite)?;
                polylines.push(line);
            }
        }

        for group in &self.elevators {
            if group.list.len() <= 1 {
                tracing::debug!("Skipping elevator group with a single landing");
                continue;
            }
            let chain = group.chain();
            chain.iter().try_for_each(Point3D::ensure_finite)?;
            polylines.push(chain);
        }

        Ok(polylines)
    }

    /// Compute summary statistics in a single pass
    pub fn stats(&self) -> RouteStats {
        let mut stats = RouteStats {
            floor_count: self.floors.values().filter(|lines| !lines.is_empty()).count(),
            elevator_count: self.elevators.iter().filter(|g| g.list.len() > 1).count(),
            ..RouteStats::default()
        };

        for line in self.floors.values().flatten() {
            stats.polyline_count += 1;
            stats.total_points += line.len();
            stats.total_length += line
                .windows(2)
                .map(|w| geometry::distance(&w[0].at_elevation(0.0), &w[1].at_elevation(0.0)))
                .sum::<f64>();
        }

        stats
    }

    /// Planar bounding box of all drawn points, `None` when nothing is drawn
    pub fn bounding_box(&self) -> Option<Rect<f64>> {
        let mut points = self.floors.values().flatten().flatten();
        let first = points.next()?;

        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.lat, first.lng, first.lat, first.lng);
        for point in points {
            min_x = min_x.min(point.lat);
            min_y = min_y.min(point.lng);
            max_x = max_x.max(point.lat);
            max_y = max_y.max(point.lng);
        }

        Some(Rect::new(
            geo::Coord { x: min_x, y: min_y },
            geo::Coord { x: max_x, y: max_y },
        ))
    }

    /// Parse route data from its JSON representation
    #[cfg(feature = "serde")]
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| RouteError::Json(e.to_string()))
    }

    /// Parse route data from a JSON reader
    #[cfg(feature = "serde")]
    pub fn from_reader<R: std::io::Read>(reader: R) -> Result<Self> {
        serde_json::from_reader(reader).map_err(|e| RouteError::Json(e.to_string()))
    }

    /// Load route data from a JSON file
    #[cfg(feature = "serde")]
    pub fn load_from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        Self::from_reader(std::io::BufReader::new(file))
    }
}
