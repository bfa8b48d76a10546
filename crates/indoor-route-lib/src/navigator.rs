//! Navigator - Top-level entry point for route queries
//!
//! This module ties the pipeline together: route map -> polylines -> segments
//! -> graph -> pruned graph -> path. Nothing is cached between queries; every
//! call rebuilds its segments and graph because the splice points depend on
//! the query.

use crate::graph::RouteGraph;
use crate::preprocess::{self, DEFAULT_PROXIMITY_THRESHOLD, RouteQuery};
use crate::route::{FloorLayout, RouteMap};
use crate::search::{PathResult, PathSearch, SearchStep};
use crate::{Point3D, Result, Segment};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration for route queries
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Config {
    /// Maximum distance between a query point and the segment it snaps onto.
    /// Default: 100 map units
    pub proximity_threshold: f64,
    /// Floor names and height used to assign elevations
    pub layout: FloorLayout,
    /// Remove dead-end nodes before searching (default true)
    pub prune: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            proximity_threshold: DEFAULT_PROXIMITY_THRESHOLD,
            layout: FloorLayout::default(),
            prune: true,
        }
    }
}

/// A planned route
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct PlannedRoute {
    /// Points from start to end (inclusive)
    pub points: Vec<Point3D>,
    /// Sum of edge distances along the route
    pub total_cost: f64,
    /// Names of the floors visited, in order, without repeats
    pub floors: Vec<String>,
}

/// A query prepared for step-wise driving
///
/// Holds the prepared segments for display next to the search itself.
#[derive(Debug, Clone)]
pub struct SteppedNavigation {
    segments: Vec<Segment>,
    search: PathSearch,
}

impl SteppedNavigation {
    /// Advance the search by one step
    #[inline]
    pub fn step(&mut self) -> SearchStep {
        self.search.step()
    }

    #[inline]
    pub fn search(&self) -> &PathSearch {
        &self.search
    }

    /// Prepared segments the graph was built from
    #[inline]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Prepared segments touching the floor at elevation `z`
    pub fn segments_on_floor(&self, z: f64) -> Vec<&Segment> {
        preprocess::segments_on_floor(&self.segments, z)
    }

    /// Give up step-wise control and finish the search
    pub fn finish(self) -> Result<PathResult> {
        self.search.run()
    }
}

/// Runs route queries against raw route data
#[derive(Debug, Clone, Default)]
pub struct Navigator {
    config: Config,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl Navigator {
    /// Create a navigator with the given configuration
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Get a reference to the configuration
    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Find the shortest route between two points of a route map
    pub fn navigate(&self, map: &RouteMap, start: &Point3D, end: &Point3D) -> Result<PlannedRoute> {
        #[cfg(feature = "profiling")]
        profiling::scope!("navigator::navigate");

        let polylines = map.polylines(&self.config.layout)?;
        self.navigate_polylines(&polylines, start, end)
    }

    /// Find the shortest route over already elevated polylines
    ///
    /// Elevator chains are ordinary polylines whose points differ in `z`.
    pub fn navigate_polylines(
        &self,
        polylines: &[Vec<Point3D>],
        start: &Point3D,
        end: &Point3D,
    ) -> Result<PlannedRoute> {
        let (_, search) = self.prepare(polylines, start, end)?;
        let path = search.run()?;
        tracing::debug!(
            "Route from {} to {}: {} point(s), cost {}",
            start,
            end,
            path.points.len(),
            path.total_cost
        );
        Ok(self.to_planned_route(path))
    }

    /// Prepare a query for step-wise driving
    pub fn step_navigate(
        &self,
        map: &RouteMap,
        start: &Point3D,
        end: &Point3D,
    ) -> Result<SteppedNavigation> {
        let polylines = map.polylines(&self.config.layout)?;
        let (segments, search) = self.prepare(&polylines, start, end)?;
        Ok(SteppedNavigation { segments, search })
    }

    /// Convert a raw search result into a route with floor names
    pub fn to_planned_route(&self, path: PathResult) -> PlannedRoute {
        let mut floors: Vec<String> = Vec::new();
        for point in &path.points {
            let name = match self.config.layout.floor_of_elevation(point.z) {
                Some(name) => name.to_string(),
                None => point.z.to_string(),
            };
            if floors.last() != Some(&name) {
                floors.push(name);
            }
        }

        PlannedRoute {
            points: path.points,
            total_cost: path.total_cost,
            floors,
        }
    }

    fn prepare(
        &self,
        polylines: &[Vec<Point3D>],
        start: &Point3D,
        end: &Point3D,
    ) -> Result<(Vec<Segment>, PathSearch)> {
        start.ensure_finite()?;
        end.ensure_finite()?;
        polylines
            .iter()
            .flatten()
            .try_for_each(Point3D::ensure_finite)?;

        let query = RouteQuery::new(*start, *end);
        let segments = preprocess::prepare_segments(
            polylines,
            Some(&query),
            self.config.proximity_threshold,
        )?;

        let mut graph = RouteGraph::from_segments(&segments);
        if self.config.prune {
            graph.prune(&[*start, *end]);
        }
        if cfg!(debug_assertions) {
            graph.assert_consistent();
        }

        let search = PathSearch::new(graph, start, end)?;
        Ok((segments, search))
    }
}
