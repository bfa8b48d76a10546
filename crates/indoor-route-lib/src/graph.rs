//! Undirected route graph built from a segment list
//!
//! Nodes live in a `Vec` arena addressed by [`NodeId`]; a `HashMap` from
//! [`PointKey`] resolves coordinates to nodes, which is what merges every
//! segment endpoint sharing a coordinate into a single vertex. Node order is
//! the order in which points are first seen and is kept stable by pruning.

use crate::Segment;
use crate::geometry::{Point3D, PointKey};
use smallvec::SmallVec;
use std::collections::HashMap;
use std::fmt;

/// Index of a node in a [`RouteGraph`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Adjacency entry of a node
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Edge {
    pub to: NodeId,
    pub distance: f64,
}

/// A unique point of the walkable network
#[derive(Clone, Debug)]
pub struct GraphNode {
    pub id: NodeId,
    pub key: PointKey,
    pub point: Point3D,
    /// Neighbours, at most one entry per neighbour
    pub children: SmallVec<[Edge; 4]>,
}

impl GraphNode {
    #[inline]
    pub fn degree(&self) -> usize {
        self.children.len()
    }

    /// Edge to `to`, if adjacent
    #[inline]
    pub fn edge_to(&self, to: NodeId) -> Option<&Edge> {
        self.children.iter().find(|edge| edge.to == to)
    }
}

/// The route graph container
#[derive(Clone, Debug, Default)]
pub struct RouteGraph {
    nodes: Vec<GraphNode>,
    index: HashMap<PointKey, NodeId>,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl RouteGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph from segments, merging coincident endpoints
    ///
    /// Repeated segments are idempotent: the first distance seen for a pair of
    /// nodes wins. Zero-length segments create their node but no edge.
    pub fn from_segments(segments: &[Segment]) -> Self {
        #[cfg(feature = "profiling")]
        profiling::scope!("graph::from_segments");

        let mut graph = Self::new();
        for segment in segments {
            let a = graph.get_or_insert(segment.start());
            let b = graph.get_or_insert(segment.end());
            if a != b {
                graph.link(a, b, segment.distance());
            }
        }

        tracing::debug!(
            "Built route graph: {} node(s), {} edge(s) from {} segment(s)",
            graph.node_count(),
            graph.edge_count(),
            segments.len()
        );
        graph
    }

    /// Look up the node for `point`, creating it if needed
    pub fn get_or_insert(&mut self, point: &Point3D) -> NodeId {
        let key = point.key();
        if let Some(&id) = self.index.get(&key) {
            return id;
        }

        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(GraphNode {
            id,
            key,
            point: *point,
            children: SmallVec::new(),
        });
        self.index.insert(key, id);
        id
    }

    /// Add an undirected edge unless it already exists on either side
    pub fn link(&mut self, a: NodeId, b: NodeId, distance: f64) {
        if self.nodes[a.index()].edge_to(b).is_none() {
            self.nodes[a.index()].children.push(Edge { to: b, distance });
        }
        if self.nodes[b.index()].edge_to(a).is_none() {
            self.nodes[b.index()].children.push(Edge { to: a, distance });
        }
    }

    /// Node for a point, if present
    #[inline]
    pub fn find(&self, point: &Point3D) -> Option<NodeId> {
        self.index.get(&point.key()).copied()
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &GraphNode {
        &self.nodes[id.index()]
    }

    #[inline]
    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of undirected edges
    pub fn edge_count(&self) -> usize {
        self.nodes.iter().map(GraphNode::degree).sum::<usize>() / 2
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Distance of the edge between `a` and `b`, if adjacent
    pub fn edge_distance(&self, a: NodeId, b: NodeId) -> Option<f64> {
        self.node(a).edge_to(b).map(|edge| edge.distance)
    }

    /// Remove nodes that cannot lie on a path between the `keep` points
    ///
    /// A node is removed while it has at most one neighbour and its point is
    /// not in `keep`; removing it strips the back-edge from its neighbour,
    /// which may expose the next node of a dead-end stub. Surviving nodes keep
    /// their relative order and are renumbered densely. Returns the number of
    /// nodes removed.
    pub fn prune(&mut self, keep: &[Point3D]) -> usize {
        #[cfg(feature = "profiling")]
        profiling::scope!("graph::prune");

        let n = self.nodes.len();
        let protected: Vec<bool> = self
            .nodes
            .iter()
            .map(|node| keep.iter().any(|p| *p == node.point))
            .collect();
        let mut degree: Vec<usize> = self.nodes.iter().map(GraphNode::degree).collect();
        let mut removed = vec![false; n];

        let mut pending: Vec<usize> = (0..n)
            .rev()
            .filter(|&i| degree[i] <= 1 && !protected[i])
            .collect();

        while let Some(i) = pending.pop() {
            if removed[i] || degree[i] > 1 || protected[i] {
                continue;
            }
            removed[i] = true;
            for edge in &self.nodes[i].children {
                let j = edge.to.index();
                if removed[j] {
                    continue;
                }
                degree[j] -= 1;
                if degree[j] <= 1 && !protected[j] {
                    pending.push(j);
                }
            }
        }

        let removed_count = removed.iter().filter(|&&r| r).count();
        if removed_count > 0 {
            self.compact(&removed);
        }

        tracing::debug!(
            "Pruned {} dead-end node(s), {} remain",
            removed_count,
            self.nodes.len()
        );
        removed_count
    }

    /// Drop removed nodes, renumber the rest and strip edges to removed nodes
    fn compact(&mut self, removed: &[bool]) {
        let mut remap: Vec<Option<NodeId>> = vec![None; self.nodes.len()];
        let mut next = 0u32;
        for (i, slot) in remap.iter_mut().enumerate() {
            if !removed[i] {
                *slot = Some(NodeId(next));
                next += 1;
            }
        }

        let old = std::mem::take(&mut self.nodes);
        self.index.clear();
        for (i, mut node) in old.into_iter().enumerate() {
            let Some(id) = remap[i] else {
                continue;
            };
            node.id = id;
            node.children = node
                .children
                .iter()
                .filter_map(|edge| {
                    remap[edge.to.index()].map(|to| Edge {
                        to,
                        distance: edge.distance,
                    })
                })
                .collect();
            self.index.insert(node.key, id);
            self.nodes.push(node);
        }
    }

    /// Panic if any structural invariant is broken
    ///
    /// Checks unique keys, ids matching positions, in-range children, no
    /// self-loops, no duplicate neighbours and mirrored edges.
    pub fn assert_consistent(&self) {
        assert_eq!(
            self.index.len(),
            self.nodes.len(),
            "route graph has duplicate node keys"
        );
        for (i, node) in self.nodes.iter().enumerate() {
            assert_eq!(node.id.index(), i, "node id {} stored at {}", node.id, i);
            assert_eq!(
                self.index.get(&node.key),
                Some(&node.id),
                "node {} missing from key index",
                node.id
            );
            for (k, edge) in node.children.iter().enumerate() {
                assert!(
                    edge.to.index() < self.nodes.len(),
                    "node {} has dangling child {}",
                    node.id,
                    edge.to
                );
                assert_ne!(edge.to, node.id, "node {} links to itself", node.id);
                assert!(
                    node.children[..k].iter().all(|other| other.to != edge.to),
                    "node {} lists child {} twice",
                    node.id,
                    edge.to
                );
                assert!(
                    self.node(edge.to).edge_to(node.id).is_some(),
                    "edge {} -> {} is not mirrored",
                    node.id,
                    edge.to
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(lat: f64, lng: f64) -> Point3D {
        Point3D::new(lat, lng, 0.0)
    }

    fn seg(a: Point3D, b: Point3D) -> Segment {
        Segment::new(a, b)
    }

    #[test]
    fn test_shared_endpoints_merge() {
        let graph = RouteGraph::from_segments(&[
            seg(p(0.0, 0.0), p(10.0, 0.0)),
            seg(p(10.0, 0.0), p(10.0, 10.0)),
        ]);
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);

        let middle = graph.find(&p(10.0, 0.0)).unwrap();
        assert_eq!(graph.node(middle).degree(), 2);
        graph.assert_consistent();
    }

    #[test]
    fn test_repeated_segments_are_idempotent() {
        let graph = RouteGraph::from_segments(&[
            seg(p(0.0, 0.0), p(10.0, 0.0)),
            seg(p(0.0, 0.0), p(10.0, 0.0)),
            seg(p(10.0, 0.0), p(0.0, 0.0)),
        ]);
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
        graph.assert_consistent();
    }

    #[test]
    fn test_edges_are_mirrored_with_distance() {
        let graph = RouteGraph::from_segments(&[seg(p(0.0, 0.0), p(3.0, 4.0))]);
        let a = graph.find(&p(0.0, 0.0)).unwrap();
        let b = graph.find(&p(3.0, 4.0)).unwrap();
        assert_eq!(graph.edge_distance(a, b), Some(5.0));
        assert_eq!(graph.edge_distance(b, a), Some(5.0));
    }

    #[test]
    fn test_degenerate_segment_creates_node_only() {
        let graph = RouteGraph::from_segments(&[seg(p(1.0, 1.0), p(1.0, 1.0))]);
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.edge_count(), 0);
        graph.assert_consistent();
    }

    #[test]
    fn test_elevator_landings_join_floors() {
        let graph = RouteGraph::from_segments(&[
            seg(p(0.0, 0.0), p(10.0, 0.0)),
            seg(p(10.0, 0.0), Point3D::new(10.0, 0.0, 250.0)),
            seg(Point3D::new(10.0, 0.0, 250.0), Point3D::new(20.0, 0.0, 250.0)),
        ]);
        assert_eq!(graph.node_count(), 4);
        let landing = graph.find(&Point3D::new(10.0, 0.0, 250.0)).unwrap();
        assert_eq!(graph.node(landing).degree(), 2);
    }

    #[test]
    fn test_prune_removes_dead_end_stub() {
        // start - a - goal with a two-node stub hanging off a
        let start = p(0.0, 0.0);
        let goal = p(20.0, 0.0);
        let mut graph = RouteGraph::from_segments(&[
            seg(start, p(10.0, 0.0)),
            seg(p(10.0, 0.0), goal),
            seg(p(10.0, 0.0), p(10.0, 10.0)),
            seg(p(10.0, 10.0), p(10.0, 20.0)),
        ]);
        assert_eq!(graph.node_count(), 5);

        let removed = graph.prune(&[start, goal]);
        assert_eq!(removed, 2);
        assert_eq!(graph.node_count(), 3);
        assert!(graph.find(&p(10.0, 20.0)).is_none());
        assert!(graph.find(&p(10.0, 10.0)).is_none());
        graph.assert_consistent();
    }

    #[test]
    fn test_prune_keeps_terminals_and_order() {
        let start = p(0.0, 0.0);
        let goal = p(20.0, 0.0);
        let mut graph = RouteGraph::from_segments(&[
            seg(start, p(10.0, 0.0)),
            seg(p(10.0, 0.0), p(10.0, 5.0)),
            seg(p(10.0, 0.0), goal),
        ]);
        graph.prune(&[start, goal]);

        let points: Vec<Point3D> = graph.nodes().iter().map(|n| n.point).collect();
        assert_eq!(points, vec![start, p(10.0, 0.0), goal]);
        assert_eq!(graph.find(&goal), Some(NodeId(2)));
    }

    #[test]
    fn test_prune_keeps_cycles() {
        let start = p(0.0, 0.0);
        let mut graph = RouteGraph::from_segments(&[
            seg(start, p(10.0, 0.0)),
            seg(p(10.0, 0.0), p(10.0, 10.0)),
            seg(p(10.0, 10.0), p(0.0, 10.0)),
            seg(p(0.0, 10.0), p(10.0, 0.0)),
        ]);
        let removed = graph.prune(&[start]);
        assert_eq!(removed, 0);
        assert_eq!(graph.node_count(), 4);
    }

    #[test]
    fn test_prune_leaves_no_useless_nodes() {
        let start = p(0.0, 0.0);
        let goal = p(30.0, 0.0);
        let mut graph = RouteGraph::from_segments(&[
            seg(start, p(10.0, 0.0)),
            seg(p(10.0, 0.0), p(20.0, 0.0)),
            seg(p(20.0, 0.0), goal),
            seg(p(20.0, 0.0), p(20.0, 10.0)),
            seg(p(20.0, 10.0), p(25.0, 10.0)),
            seg(p(50.0, 50.0), p(60.0, 60.0)),
        ]);
        graph.prune(&[start, goal]);

        for node in graph.nodes() {
            assert!(node.degree() >= 2 || node.point == start || node.point == goal);
        }
        graph.assert_consistent();
    }

    #[test]
    #[should_panic(expected = "not mirrored")]
    fn test_assert_consistent_detects_one_sided_edge() {
        let mut graph = RouteGraph::new();
        let a = graph.get_or_insert(&p(0.0, 0.0));
        let b = graph.get_or_insert(&p(1.0, 0.0));
        graph.nodes[a.index()].children.push(Edge { to: b, distance: 1.0 });
        graph.assert_consistent();
    }
}
