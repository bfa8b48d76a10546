//! Indoor Route Library - Shortest Paths over Hand-Drawn Multi-Floor Routes
//!
//! This library turns hand-drawn polylines spread over several floors, plus
//! elevator connectors between floors, into a navigation graph and finds the
//! shortest route between two query points. Query points do not need to lie on
//! a drawn line: they are snapped onto every nearby segment of their floor.
//!
//! # Architecture
//!
//! - **[`geometry`]**: Distances, segment intersection and point projection
//! - **[`RouteMap`]**: Raw route data (polylines per floor and elevator groups)
//! - **[`preprocess`]**: Flattening, intersection splitting and query splicing
//! - **[`RouteGraph`]**: Undirected graph keyed by exact coordinates, with pruning
//! - **[`PathSearch`]**: Step-wise best-first search
//! - **[`Navigator`]**: High-level entry point running the whole pipeline
//!
//! # Performance Characteristics
//!
//! - **Preprocessing**: O(S²) pairwise intersection tests, parallelized
//! - **Search**: O(V²) with a linear scan for the next node to expand
//! - **Memory**: O(S + V + E), nothing is kept between queries

pub mod geometry;
pub mod graph;
mod navigator;
pub mod preprocess;
mod route;
pub mod search;
mod segment;
pub mod utils;

// Public API exports
pub use geometry::{Point3D, PointKey};
pub use graph::{NodeId, RouteGraph};
pub use navigator::{Config, Navigator, PlannedRoute, SteppedNavigation};
pub use route::{ElevatorGroup, FloorLayout, PlanarPoint, RouteMap, RouteStats};
pub use search::{PathResult, PathSearch, SearchStep, StepReport};
pub use segment::Segment;

/// Error types for route queries
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("Start point is not on or near a route")]
    StartNotOnRoute,

    #[error("End point is not on or near a route")]
    EndNotOnRoute,

    #[error("No path found between start and end")]
    NoPathFound,

    #[error("Unknown floor: {0}")]
    UnknownFloor(String),

    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(String),
}

impl RouteError {
    /// Stable machine-readable code for this error
    pub fn kind(&self) -> &'static str {
        match self {
            RouteError::StartNotOnRoute => "START_NOT_ON_ROUTE",
            RouteError::EndNotOnRoute => "END_NOT_ON_ROUTE",
            RouteError::NoPathFound => "NO_PATH_FOUND",
            RouteError::UnknownFloor(_) => "UNKNOWN_FLOOR",
            RouteError::InvalidGeometry(_) => "INVALID_GEOMETRY",
            RouteError::Io(_) => "IO",
            RouteError::Json(_) => "JSON",
        }
    }
}

pub type Result<T> = std::result::Result<T, RouteError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_exports() {
        // Verify that all public types are accessible
        let _: fn(Config) -> Navigator = Navigator::new;
        let _: fn() -> Config = Config::default;
        let _: fn(&[Segment]) -> RouteGraph = RouteGraph::from_segments;
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(RouteError::StartNotOnRoute.kind(), "START_NOT_ON_ROUTE");
        assert_eq!(RouteError::EndNotOnRoute.kind(), "END_NOT_ON_ROUTE");
        assert_eq!(RouteError::NoPathFound.kind(), "NO_PATH_FOUND");
        assert_eq!(RouteError::UnknownFloor("F9".into()).to_string(), "Unknown floor: F9");
    }
}
