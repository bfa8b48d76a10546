//! Best-first path search over a pruned route graph
//!
//! [`PathSearch`] is an explicit state machine: every call to
//! [`PathSearch::step`] relaxes the neighbours of the currently open node,
//! closes it and selects the next node to open. A caller that only wants the
//! answer uses [`PathSearch::run`]; a visualiser polls `step` and inspects the
//! returned [`StepReport`] between calls.
//!
//! The heuristic is the straight-line (floor-aware) distance to the goal,
//! which never overestimates the walkable distance. Selection picks, among
//! nodes that are not closed and already have a cost, the first one in node
//! order with the strictly smallest `cost + heuristic`. Nodes that were never
//! reached are never opened; when no reached node remains, the search is
//! exhausted.
//!
//! Search state lives in a `Vec` indexed by [`NodeId`], parallel to the graph
//! arena, so parent links are plain indices.

use crate::geometry::{self, Point3D};
use crate::graph::{NodeId, RouteGraph};
use crate::{Result, RouteError};

#[cfg(feature = "serde")]
use serde::Serialize;

/// Per-node search bookkeeping
#[derive(Clone, Debug)]
struct SearchNode {
    parent: Option<NodeId>,
    /// Accumulated cost from the start, `None` until reached
    cost: Option<f64>,
    /// Straight-line distance to the goal, fixed at construction
    heuristic: f64,
    closed: bool,
}

/// A successful search result
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct PathResult {
    /// Points from start to goal (inclusive)
    pub points: Vec<Point3D>,
    /// Graph node for each point
    #[cfg_attr(feature = "serde", serde(skip))]
    pub nodes: Vec<NodeId>,
    /// Sum of edge distances along the path
    pub total_cost: f64,
}

/// A neighbour whose cost was lowered during one step
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RelaxedNode {
    pub id: NodeId,
    pub point: Point3D,
    pub cost: f64,
    pub heuristic: f64,
}

/// What one expansion step did
#[derive(Clone, Debug, PartialEq)]
pub struct StepReport {
    /// Node that was expanded and closed
    pub current: NodeId,
    pub point: Point3D,
    /// Neighbours whose cost and parent were updated
    pub relaxed: Vec<RelaxedNode>,
    /// Node the next step will open; the goal when it was just selected,
    /// `None` when no reached node is left
    pub next: Option<NodeId>,
    /// Closed nodes so far, in closing order
    pub closed: Vec<NodeId>,
}

/// Outcome of one call to [`PathSearch::step`]
#[derive(Clone, Debug, PartialEq)]
pub enum SearchStep {
    /// The search advanced; call `step` again
    Expanded(StepReport),
    /// The goal was opened; the path is complete
    Found(PathResult),
    /// No reached node is left open and the goal was not found
    Exhausted,
}

impl SearchStep {
    #[inline]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SearchStep::Expanded(_))
    }
}

#[derive(Clone, Debug)]
enum Outcome {
    Found(PathResult),
    Exhausted,
}

/// Step-wise best-first search owning its graph and bookkeeping
#[derive(Clone, Debug)]
pub struct PathSearch {
    graph: RouteGraph,
    nodes: Vec<SearchNode>,
    start: NodeId,
    goal: Point3D,
    /// Node to expand on the next step
    open: Option<NodeId>,
    closed_order: Vec<NodeId>,
    outcome: Option<Outcome>,
    steps: usize,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl PathSearch {
    /// Prepare a search from `start` to `goal`
    ///
    /// Both points must be graph nodes; a missing start is reported as
    /// [`RouteError::StartNotOnRoute`] and a missing goal as
    /// [`RouteError::EndNotOnRoute`].
    pub fn new(graph: RouteGraph, start: &Point3D, goal: &Point3D) -> Result<Self> {
        let start_id = graph.find(start).ok_or(RouteError::StartNotOnRoute)?;
        if graph.find(goal).is_none() {
            return Err(RouteError::EndNotOnRoute);
        }

        let mut nodes: Vec<SearchNode> = graph
            .nodes()
            .iter()
            .map(|node| SearchNode {
                parent: None,
                cost: None,
                heuristic: geometry::distance(&node.point, goal),
                closed: false,
            })
            .collect();
        nodes[start_id.index()].cost = Some(0.0);

        Ok(Self {
            graph,
            nodes,
            start: start_id,
            goal: *goal,
            open: Some(start_id),
            closed_order: Vec::new(),
            outcome: None,
            steps: 0,
        })
    }

    /// Advance by one relaxation and selection cycle
    ///
    /// Every expansion is reported, including the one that selects the goal;
    /// the following call returns [`SearchStep::Found`] (or
    /// [`SearchStep::Exhausted`] when nothing was selected). Once a terminal
    /// value has been returned, further calls return it again.
    pub fn step(&mut self) -> SearchStep {
        self.advance(true)
    }

    /// Drive the search to completion
    ///
    /// Every expansion closes one node, so `|V| + 1` steps always suffice;
    /// the cap only guards against a broken graph. Step reports are not
    /// collected.
    pub fn run(mut self) -> Result<PathResult> {
        #[cfg(feature = "profiling")]
        profiling::scope!("search::run");

        let cap = self.graph.node_count() + 1;
        for _ in 0..cap {
            match self.advance(false) {
                SearchStep::Expanded(_) => {}
                SearchStep::Found(path) => return Ok(path),
                SearchStep::Exhausted => return Err(RouteError::NoPathFound),
            }
        }

        tracing::warn!("Search hit its iteration cap of {}", cap);
        Err(RouteError::NoPathFound)
    }

    fn advance(&mut self, record: bool) -> SearchStep {
        if let Some(outcome) = &self.outcome {
            return match outcome {
                Outcome::Found(path) => SearchStep::Found(path.clone()),
                Outcome::Exhausted => SearchStep::Exhausted,
            };
        }

        let Some(current) = self.open.take() else {
            tracing::debug!(
                "Search exhausted after {} step(s) without reaching {}",
                self.steps,
                self.goal
            );
            self.outcome = Some(Outcome::Exhausted);
            return SearchStep::Exhausted;
        };
        self.steps += 1;

        // Covers a start that is already the goal
        if self.graph.node(current).point == self.goal {
            return self.finish(current);
        }

        let relaxed = self.relax(current, record);
        self.nodes[current.index()].closed = true;
        self.closed_order.push(current);
        self.open = self.select();

        SearchStep::Expanded(StepReport {
            current,
            point: self.graph.node(current).point,
            relaxed,
            next: self.open,
            closed: if record {
                self.closed_order.clone()
            } else {
                Vec::new()
            },
        })
    }

    /// Lower the cost of every open neighbour reachable more cheaply via `current`
    fn relax(&mut self, current: NodeId, record: bool) -> Vec<RelaxedNode> {
        let Some(current_cost) = self.nodes[current.index()].cost else {
            return Vec::new();
        };

        let mut relaxed = Vec::new();
        for edge in &self.graph.node(current).children {
            let neighbour = &mut self.nodes[edge.to.index()];
            if neighbour.closed {
                continue;
            }

            let candidate = current_cost + edge.distance;
            if neighbour.cost.is_none_or(|cost| candidate < cost) {
                neighbour.cost = Some(candidate);
                neighbour.parent = Some(current);
                if record {
                    relaxed.push(RelaxedNode {
                        id: edge.to,
                        point: self.graph.node(edge.to).point,
                        cost: candidate,
                        heuristic: neighbour.heuristic,
                    });
                }
            }
        }
        relaxed
    }

    /// First non-closed reached node with the smallest `cost + heuristic`
    fn select(&self) -> Option<NodeId> {
        let mut best: Option<(usize, f64)> = None;
        for (i, node) in self.nodes.iter().enumerate() {
            if node.closed {
                continue;
            }
            let Some(cost) = node.cost else {
                continue;
            };
            let total = cost + node.heuristic;
            if best.is_none_or(|(_, best_total)| total < best_total) {
                best = Some((i, total));
            }
        }
        best.map(|(i, _)| NodeId(i as u32))
    }

    fn finish(&mut self, goal: NodeId) -> SearchStep {
        let path = self.reconstruct(goal);
        tracing::debug!(
            "Path found after {} step(s): {} point(s), cost {}",
            self.steps,
            path.points.len(),
            path.total_cost
        );
        self.outcome = Some(Outcome::Found(path.clone()));
        SearchStep::Found(path)
    }

    /// Walk parent links back from `goal` to the start
    fn reconstruct(&self, goal: NodeId) -> PathResult {
        let mut nodes = vec![goal];
        let mut current = goal;
        while let Some(parent) = self.nodes[current.index()].parent {
            nodes.push(parent);
            current = parent;
        }
        nodes.reverse();

        PathResult {
            points: nodes.iter().map(|&id| self.graph.node(id).point).collect(),
            total_cost: self.nodes[goal.index()].cost.unwrap_or(0.0),
            nodes,
        }
    }

    /// The graph being searched
    #[inline]
    pub fn graph(&self) -> &RouteGraph {
        &self.graph
    }

    #[inline]
    pub fn start(&self) -> NodeId {
        self.start
    }

    #[inline]
    pub fn goal(&self) -> &Point3D {
        &self.goal
    }

    /// Node that the next step will expand
    #[inline]
    pub fn current(&self) -> Option<NodeId> {
        self.open
    }

    #[inline]
    pub fn cost(&self, id: NodeId) -> Option<f64> {
        self.nodes[id.index()].cost
    }

    #[inline]
    pub fn heuristic(&self, id: NodeId) -> f64 {
        self.nodes[id.index()].heuristic
    }

    #[inline]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    #[inline]
    pub fn is_closed(&self, id: NodeId) -> bool {
        self.nodes[id.index()].closed
    }

    /// Closed nodes in closing order
    #[inline]
    pub fn closed(&self) -> &[NodeId] {
        &self.closed_order
    }

    /// Number of steps taken so far
    #[inline]
    pub fn steps(&self) -> usize {
        self.steps
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }
}
