//! Segment preprocessing: polylines to an intersection-resolved segment list
//!
//! The pipeline is
//! 1. [`flatten`] every polyline into consecutive two-point segments,
//! 2. [`resolve_intersections`] by splitting same-floor segments where they cross,
//! 3. optionally [`splice_query_point`] for the start and end of a query.
//!
//! [`prepare_segments`] runs all three steps.

use crate::geometry::{self, Point3D};
use crate::{Result, RouteError, Segment};
use rayon::prelude::*;

/// Default distance within which a query point snaps onto a segment
pub const DEFAULT_PROXIMITY_THRESHOLD: f64 = 100.0;

/// A start/end pair to route between
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RouteQuery {
    pub start: Point3D,
    pub end: Point3D,
}

impl RouteQuery {
    pub fn new(start: Point3D, end: Point3D) -> Self {
        Self { start, end }
    }
}

/// Which end of a query is being spliced into the segment list
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueryRole {
    Start,
    End,
}

impl QueryRole {
    fn not_on_route(self) -> RouteError {
        match self {
            QueryRole::Start => RouteError::StartNotOnRoute,
            QueryRole::End => RouteError::EndNotOnRoute,
        }
    }
}

/// Turn polylines into consecutive two-point segments
///
/// A polyline with `k` points yields `k - 1` segments.
pub fn flatten(polylines: &[Vec<Point3D>]) -> Vec<Segment> {
    polylines
        .iter()
        .flat_map(|line| line.windows(2).map(|pair| Segment::new(pair[0], pair[1])))
        .collect()
}

/// Split same-floor segments at every point where they cross another
///
/// Pairs that already share an endpoint are not tested. Crossings that land on
/// a segment's own endpoint are not recorded for that segment. The relative
/// order of segments is preserved; a split segment is replaced in place by its
/// chain of pieces.
pub fn resolve_intersections(segments: Vec<Segment>) -> Vec<Segment> {
    #[cfg(feature = "profiling")]
    profiling::scope!("preprocess::resolve_intersections");

    let same_floor: Vec<usize> = (0..segments.len())
        .filter(|&i| segments[i].is_same_floor())
        .collect();

    // Candidate detection is independent per segment; recording is sequential
    // below so the outcome does not depend on scheduling.
    let crossings: Vec<(usize, usize, Point3D)> = same_floor
        .par_iter()
        .enumerate()
        .map(|(position, &i)| {
            let a = &segments[i];
            let line_a = a.line();
            same_floor[position + 1..]
                .iter()
                .filter_map(|&j| {
                    let b = &segments[j];
                    if b.start().z != a.start().z || a.is_continuous_with(b) {
                        return None;
                    }
                    geometry::segments_intersect(&line_a, &b.line())
                        .map(|p| (i, j, Point3D::from_planar(p, a.start().z)))
                })
                .collect::<Vec<_>>()
        })
        .flatten()
        .collect();

    if crossings.is_empty() {
        return segments;
    }

    let mut cuts: Vec<Vec<Point3D>> = vec![Vec::new(); segments.len()];
    for (i, j, point) in &crossings {
        record_cut(&mut cuts[*i], &segments[*i], *point);
        record_cut(&mut cuts[*j], &segments[*j], *point);
    }

    tracing::debug!(
        "Resolved {} crossing(s) across {} segment(s)",
        crossings.len(),
        cuts.iter().filter(|c| !c.is_empty()).count()
    );

    let mut resolved = Vec::with_capacity(segments.len() + crossings.len() * 2);
    for (segment, mut points) in segments.into_iter().zip(cuts) {
        if points.is_empty() {
            resolved.push(segment);
            continue;
        }
        let start = *segment.start();
        points.sort_by(|a, b| {
            geometry::distance(a, &start).total_cmp(&geometry::distance(b, &start))
        });
        resolved.extend(segment.split_at(&points));
    }
    resolved
}

/// Record a crossing for one segment, ignoring duplicates and own endpoints
fn record_cut(points: &mut Vec<Point3D>, segment: &Segment, point: Point3D) {
    if segment.has_endpoint(&point) || points.contains(&point) {
        return;
    }
    points.push(point);
}

/// Snap a query point onto the nearest eligible segments of its floor
///
/// Every same-floor segment within `threshold` of `point` is a candidate; when
/// any candidate has a perpendicular foot on the segment, clamped candidates
/// are dropped. Each surviving candidate is split at the projection and a
/// connector segment between `point` and the projection is added: prepended
/// for [`QueryRole::Start`], appended for [`QueryRole::End`].
pub fn splice_query_point(
    segments: &mut Vec<Segment>,
    point: &Point3D,
    role: QueryRole,
    threshold: f64,
) -> Result<()> {
    #[cfg(feature = "profiling")]
    profiling::scope!("preprocess::splice_query_point");

    let on_floor: Vec<usize> = (0..segments.len())
        .filter(|&i| segments[i].is_same_floor() && segments[i].start().z == point.z)
        .collect();
    if on_floor.is_empty() {
        tracing::debug!("No segment on the floor of {:?} point {}", role, point);
        return Err(role.not_on_route());
    }

    let mut candidates: Vec<(usize, geometry::Projection)> = on_floor
        .into_iter()
        .map(|i| {
            let segment = &segments[i];
            let projection = geometry::point_segment_distance(
                point.planar(),
                segment.start().planar(),
                segment.end().planar(),
                true,
            );
            (i, projection)
        })
        .filter(|(_, projection)| projection.distance <= threshold)
        .collect();

    if candidates.is_empty() {
        tracing::debug!(
            "No segment within {} of {:?} point {}",
            threshold,
            role,
            point
        );
        return Err(role.not_on_route());
    }

    if candidates.iter().any(|(_, projection)| projection.is_vertical) {
        candidates.retain(|(_, projection)| projection.is_vertical);
    }

    tracing::debug!(
        "Splicing {:?} point {} onto {} segment(s)",
        role,
        point,
        candidates.len()
    );

    let mut feet: Vec<Option<Point3D>> = vec![None; segments.len()];
    for (i, projection) in &candidates {
        feet[*i] = Some(Point3D::from_planar(projection.point, point.z));
    }

    let mut spliced = Vec::with_capacity(segments.len() + candidates.len() * 2);
    for (segment, foot) in segments.drain(..).zip(feet) {
        match foot {
            // A foot on an endpoint would leave a zero-length piece behind
            Some(foot) if !segment.has_endpoint(&foot) => {
                spliced.extend(segment.split_at(&[foot]));
            }
            _ => spliced.push(segment),
        }
    }

    let connectors = candidates
        .iter()
        .map(|(_, projection)| Point3D::from_planar(projection.point, point.z));
    match role {
        QueryRole::Start => {
            // Each connector goes to the front, so the last candidate leads
            let mut front: Vec<Segment> = connectors.map(|foot| Segment::new(*point, foot)).collect();
            front.reverse();
            front.append(&mut spliced);
            spliced = front;
        }
        QueryRole::End => {
            spliced.extend(connectors.map(|foot| Segment::new(foot, *point)));
        }
    }

    *segments = spliced;
    Ok(())
}

/// Run the full preprocessing pipeline
///
/// Without a query the result is the intersection-resolved segment list.
pub fn prepare_segments(
    polylines: &[Vec<Point3D>],
    query: Option<&RouteQuery>,
    threshold: f64,
) -> Result<Vec<Segment>> {
    #[cfg(feature = "profiling")]
    profiling::scope!("preprocess::prepare_segments");

    let flat = flatten(polylines);
    let flat_count = flat.len();
    let mut segments = resolve_intersections(flat);
    tracing::debug!(
        "Flattened {} segment(s), {} after intersection splitting",
        flat_count,
        segments.len()
    );

    if let Some(query) = query {
        splice_query_point(&mut segments, &query.start, QueryRole::Start, threshold)?;
        splice_query_point(&mut segments, &query.end, QueryRole::End, threshold)?;
    }

    Ok(segments)
}

/// Segments with at least one endpoint on the floor at elevation `z`
pub fn segments_on_floor(segments: &[Segment], z: f64) -> Vec<&Segment> {
    segments.iter().filter(|s| s.touches_elevation(z)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(lat: f64, lng: f64) -> Point3D {
        Point3D::new(lat, lng, 0.0)
    }

    fn plus_shape() -> Vec<Vec<Point3D>> {
        vec![
            vec![p(0.0, 0.0), p(100.0, 0.0)],
            vec![p(50.0, -50.0), p(50.0, 50.0)],
        ]
    }

    fn sorted_keys(segments: &[Segment]) -> Vec<(String, String)> {
        let mut keys: Vec<_> = segments
            .iter()
            .map(|s| (s.start().key().to_string(), s.end().key().to_string()))
            .collect();
        keys.sort();
        keys
    }

    #[test]
    fn test_flatten_counts() {
        let polylines = vec![
            vec![p(0.0, 0.0), p(1.0, 0.0), p(2.0, 0.0), p(3.0, 0.0)],
            vec![p(0.0, 1.0), p(0.0, 2.0)],
            vec![p(5.0, 5.0)],
        ];
        let segments = flatten(&polylines);
        assert_eq!(segments.len(), 4);
        assert_eq!(segments[2].end(), &p(3.0, 0.0));
    }

    #[test]
    fn test_resolve_plus_shape_splits_both() {
        let segments = resolve_intersections(flatten(&plus_shape()));
        assert_eq!(segments.len(), 4);

        let center = p(50.0, 0.0);
        assert_eq!(segments.iter().filter(|s| s.has_endpoint(&center)).count(), 4);
        assert_eq!(segments[0].start(), &p(0.0, 0.0));
        assert_eq!(segments[0].end(), &center);
    }

    #[test]
    fn test_resolve_sorts_cuts_along_segment() {
        let polylines = vec![
            vec![p(0.0, 0.0), p(100.0, 0.0)],
            vec![p(80.0, -10.0), p(80.0, 10.0)],
            vec![p(20.0, -10.0), p(20.0, 10.0)],
        ];
        let segments = resolve_intersections(flatten(&polylines));
        // 3 pieces for the long segment, 2 for each crossing segment
        assert_eq!(segments.len(), 7);
        assert_eq!(segments[0].end(), &p(20.0, 0.0));
        assert_eq!(segments[1].start(), &p(20.0, 0.0));
        assert_eq!(segments[1].end(), &p(80.0, 0.0));
        assert_eq!(segments[2].end(), &p(100.0, 0.0));
    }

    #[test]
    fn test_resolve_skips_continuous_pairs() {
        let polylines = vec![vec![p(0.0, 0.0), p(10.0, 0.0), p(10.0, 10.0)]];
        let segments = resolve_intersections(flatten(&polylines));
        assert_eq!(segments.len(), 2);
    }

    #[test]
    fn test_resolve_t_junction_splits_only_the_crossed_segment() {
        let polylines = vec![
            vec![p(0.0, 0.0), p(100.0, 0.0)],
            vec![p(40.0, 0.0), p(40.0, 60.0)],
        ];
        let segments = resolve_intersections(flatten(&polylines));
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].end(), &p(40.0, 0.0));
        assert_eq!(segments[2].start(), &p(40.0, 0.0));
    }

    #[test]
    fn test_resolve_three_way_crossing_cuts_once() {
        let polylines = vec![
            vec![p(0.0, 0.0), p(100.0, 0.0)],
            vec![p(50.0, -50.0), p(50.0, 50.0)],
            vec![p(0.0, -50.0), p(100.0, 50.0)],
        ];
        let crossing = p(50.0, 0.0);
        let segments = resolve_intersections(flatten(&polylines));

        // Each segment sees the crossing twice but is split only once
        assert_eq!(segments.len(), 6);
        assert!(segments.iter().all(|s| s.has_endpoint(&crossing)));
        assert!(segments.iter().all(|s| !s.is_degenerate()));

        let graph = crate::graph::RouteGraph::from_segments(&segments);
        assert_eq!(graph.node_count(), 7);
        let hub = graph.find(&crossing).unwrap();
        assert_eq!(graph.node(hub).degree(), 6);
    }

    #[test]
    fn test_resolve_ignores_other_floors() {
        let polylines = vec![
            vec![p(0.0, 0.0), p(100.0, 0.0)],
            vec![Point3D::new(50.0, -50.0, 250.0), Point3D::new(50.0, 50.0, 250.0)],
        ];
        let segments = resolve_intersections(flatten(&polylines));
        assert_eq!(segments.len(), 2);
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let polylines = vec![
            vec![p(0.0, 0.0), p(100.0, 0.0), p(100.0, 100.0)],
            vec![p(50.0, -50.0), p(50.0, 50.0)],
            vec![p(0.0, 30.0), p(120.0, 30.0)],
        ];
        let once = resolve_intersections(flatten(&polylines));
        let twice = resolve_intersections(once.clone());
        assert_eq!(sorted_keys(&once), sorted_keys(&twice));
    }

    #[test]
    fn test_splice_start_prepends_connector() {
        let mut segments = flatten(&[vec![p(0.0, 0.0), p(100.0, 0.0)]]);
        let start = p(40.0, 30.0);
        splice_query_point(&mut segments, &start, QueryRole::Start, 100.0).unwrap();

        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].start(), &start);
        assert_eq!(segments[0].end(), &p(40.0, 0.0));
        assert_eq!(segments[0].distance(), 30.0);
        assert_eq!(segments[1].end(), &p(40.0, 0.0));
        assert_eq!(segments[2].start(), &p(40.0, 0.0));
    }

    #[test]
    fn test_splice_end_appends_connector() {
        let mut segments = flatten(&[vec![p(0.0, 0.0), p(100.0, 0.0)]]);
        let end = p(70.0, -20.0);
        splice_query_point(&mut segments, &end, QueryRole::End, 100.0).unwrap();

        let last = segments.last().unwrap();
        assert_eq!(last.start(), &p(70.0, 0.0));
        assert_eq!(last.end(), &end);
    }

    #[test]
    fn test_splice_prefers_vertical_candidates() {
        // The point projects perpendicularly onto the first segment and only
        // onto an endpoint of the second, which is nearer.
        let mut segments = flatten(&[
            vec![p(0.0, 0.0), p(100.0, 0.0)],
            vec![p(60.0, 25.0), p(90.0, 25.0)],
        ]);
        let start = p(50.0, 20.0);
        splice_query_point(&mut segments, &start, QueryRole::Start, 100.0).unwrap();

        let connectors: Vec<_> = segments.iter().filter(|s| s.start() == &start).collect();
        assert_eq!(connectors.len(), 1);
        assert_eq!(connectors[0].end(), &p(50.0, 0.0));
    }

    #[test]
    fn test_splice_ties_produce_multiple_connectors() {
        let mut segments = flatten(&[
            vec![p(0.0, 0.0), p(100.0, 0.0)],
            vec![p(0.0, 40.0), p(100.0, 40.0)],
        ]);
        let start = p(50.0, 20.0);
        splice_query_point(&mut segments, &start, QueryRole::Start, 100.0).unwrap();

        assert_eq!(segments.iter().filter(|s| s.start() == &start).count(), 2);
        assert_eq!(segments.len(), 6);
        // Later candidates end up first
        assert_eq!(segments[0].end(), &p(50.0, 40.0));
        assert_eq!(segments[1].end(), &p(50.0, 0.0));
    }

    #[test]
    fn test_splice_on_endpoint_keeps_segment_whole() {
        let mut segments = flatten(&[vec![p(0.0, 0.0), p(100.0, 0.0)]]);
        let end = p(100.0, 0.0);
        splice_query_point(&mut segments, &end, QueryRole::End, 100.0).unwrap();
        assert_eq!(segments.len(), 2);
        assert!(segments[1].is_degenerate());
    }

    #[test]
    fn test_splice_too_far_fails() {
        let mut segments = flatten(&[vec![p(0.0, 0.0), p(100.0, 0.0)]]);
        let result = splice_query_point(&mut segments, &p(50.0, 200.0), QueryRole::Start, 100.0);
        assert!(matches!(result, Err(RouteError::StartNotOnRoute)));

        let result = splice_query_point(&mut segments, &p(50.0, 200.0), QueryRole::End, 100.0);
        assert!(matches!(result, Err(RouteError::EndNotOnRoute)));
    }

    #[test]
    fn test_splice_wrong_floor_fails() {
        let mut segments = flatten(&[vec![p(0.0, 0.0), p(100.0, 0.0)]]);
        let result = splice_query_point(
            &mut segments,
            &Point3D::new(50.0, 0.0, 250.0),
            QueryRole::Start,
            100.0,
        );
        assert!(matches!(result, Err(RouteError::StartNotOnRoute)));
    }

    #[test]
    fn test_prepare_segments_without_query() {
        let segments = prepare_segments(&plus_shape(), None, DEFAULT_PROXIMITY_THRESHOLD).unwrap();
        assert_eq!(segments.len(), 4);
    }

    #[test]
    fn test_prepare_segments_with_query() {
        let query = RouteQuery::new(p(10.0, 5.0), p(50.0, 45.0));
        let segments =
            prepare_segments(&plus_shape(), Some(&query), DEFAULT_PROXIMITY_THRESHOLD).unwrap();
        assert_eq!(segments.first().unwrap().start(), &query.start);
        assert_eq!(segments.last().unwrap().end(), &query.end);
        for segment in &segments {
            assert_eq!(segment.distance(), geometry::distance(segment.start(), segment.end()));
        }
    }

    #[test]
    fn test_segments_on_floor() {
        let polylines = vec![
            vec![p(0.0, 0.0), p(10.0, 0.0)],
            vec![Point3D::new(10.0, 0.0, 0.0), Point3D::new(10.0, 0.0, 250.0)],
            vec![Point3D::new(0.0, 0.0, 250.0), Point3D::new(10.0, 0.0, 250.0)],
        ];
        let segments = flatten(&polylines);
        assert_eq!(segments_on_floor(&segments, 0.0).len(), 2);
        assert_eq!(segments_on_floor(&segments, 250.0).len(), 2);
        assert!(segments_on_floor(&segments, 500.0).is_empty());
    }
}
