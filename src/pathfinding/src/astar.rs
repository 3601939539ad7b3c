//! A* trust-path search
//!
//! Best-first search over unexpired edges. Edge cost is derived from risk so a
//! vouch is cheaper than a flagged edge:
//!
//! ```text
//! cost = 1 + (risk + 1) / 2        ∈ [1, 2]
//! ```
//!
//! Two constraints shape the search: edges whose trust level is below the
//! configured floor are never traversed, and nodes at `max_depth` hops are not
//! expanded further. A node may be expanded once per depth at which it is
//! reached more cheaply than at any shallower depth. When no path is found
//! the outcome names the constraint, if any, that blocked every route.

use crate::heuristic::Heuristic;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};
use tracing::debug;
use trustmesh_core::{NodeId, RiskEdge, Timestamp};
use trustmesh_graph::Graph;

/// Cost of traversing an edge with the given risk
#[inline]
pub fn edge_cost(risk: f64) -> f64 {
    1.0 + (risk + 1.0) / 2.0
}

/// Pathfinder configuration
#[derive(Debug, Clone)]
pub struct PathConfig {
    /// Maximum number of hops in a path
    pub max_depth: usize,

    /// Edges below this trust level are not traversable
    pub min_trust_level: i8,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            max_depth: 8,
            min_trust_level: 0,
        }
    }
}

/// A found path
#[derive(Debug, Clone, PartialEq)]
pub struct TrustPath {
    /// Nodes from source to target inclusive
    pub nodes: Vec<NodeId>,
    /// Edges in traversal order; one fewer than `nodes`
    pub edges: Vec<RiskEdge>,
    pub cost: f64,
}

impl TrustPath {
    pub fn source(&self) -> Option<NodeId> {
        self.nodes.first().copied()
    }

    pub fn target(&self) -> Option<NodeId> {
        self.nodes.last().copied()
    }

    pub fn hops(&self) -> usize {
        self.edges.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PathOutcome {
    Found(TrustPath),
    NoPath,
    /// Paths exist, but all of them are longer than `max_depth`
    MaxDepthExceeded,
    /// Every route crosses an edge below the trust floor
    BelowTrustThreshold,
}

impl PathOutcome {
    pub fn path(&self) -> Option<&TrustPath> {
        match self {
            PathOutcome::Found(path) => Some(path),
            _ => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, PathOutcome::Found(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub outcome: PathOutcome,
    /// Distinct nodes expanded, target excluded
    pub expanded: usize,
}

/// Open-set entry; ordered so `BinaryHeap` pops the lowest f first
#[derive(Debug, Clone, Copy)]
struct OpenNode {
    node: NodeId,
    f: f64,
    g: f64,
    depth: usize,
}

impl PartialEq for OpenNode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenNode {}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f
            .total_cmp(&self.f)
            .then_with(|| other.node.cmp(&self.node))
    }
}

#[derive(Debug, Clone, Default)]
pub struct Pathfinder {
    config: PathConfig,
}

impl Pathfinder {
    pub fn new(config: PathConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PathConfig {
        &self.config
    }

    /// Search from `source` to `target` over edges unexpired at `now`
    pub fn find_path<H: Heuristic + ?Sized>(
        &self,
        graph: &Graph,
        source: NodeId,
        target: NodeId,
        heuristic: &H,
        now: Timestamp,
    ) -> SearchResult {
        if !graph.contains_node(source) || !graph.contains_node(target) {
            return SearchResult {
                outcome: PathOutcome::NoPath,
                expanded: 0,
            };
        }
        if source == target {
            return SearchResult {
                outcome: PathOutcome::Found(TrustPath {
                    nodes: vec![source],
                    edges: Vec::new(),
                    cost: 0.0,
                }),
                expanded: 0,
            };
        }

        // Search states are (node, depth) labels. A label is kept unless another
        // label at the same node is no deeper and no more expensive, so a
        // costlier but shallower route survives when only it fits `max_depth`.
        let mut open: BinaryHeap<OpenNode> = BinaryHeap::new();
        let mut labels: HashMap<NodeId, Vec<(usize, f64)>> = HashMap::new();
        let mut came_from: HashMap<(NodeId, usize), (NodeId, usize, usize)> = HashMap::new();
        let mut closed: HashSet<(NodeId, usize)> = HashSet::new();
        let mut expanded_nodes: HashSet<NodeId> = HashSet::new();

        open.push(OpenNode {
            node: source,
            f: heuristic.estimate(source, target),
            g: 0.0,
            depth: 0,
        });
        labels.insert(source, vec![(0, 0.0)]);

        while let Some(current) = open.pop() {
            if current.node == target {
                let expanded = expanded_nodes.len();
                let path = Self::reconstruct(graph, &came_from, target, current.depth, current.g);
                debug!(%source, %target, hops = path.hops(), cost = path.cost, expanded, "Trust path found");
                return SearchResult {
                    outcome: PathOutcome::Found(path),
                    expanded,
                };
            }

            if Self::superseded(&labels, current.node, current.depth, current.g)
                || !closed.insert((current.node, current.depth))
            {
                continue;
            }
            expanded_nodes.insert(current.node);

            for &idx in graph.neighbors(current.node) {
                let Some(edge) = graph.edge_at(idx) else {
                    continue;
                };
                if edge.is_expired(now) {
                    continue;
                }
                if edge.level < self.config.min_trust_level || current.depth >= self.config.max_depth {
                    continue;
                }

                let depth = current.depth + 1;
                let tentative = current.g + edge_cost(edge.risk);
                let frontier = labels.entry(edge.to).or_default();
                if frontier.iter().any(|&(d, g)| d <= depth && g <= tentative) {
                    continue;
                }
                frontier.retain(|&(d, g)| !(depth <= d && tentative <= g));
                frontier.push((depth, tentative));

                came_from.insert((edge.to, depth), (current.node, current.depth, idx));
                open.push(OpenNode {
                    node: edge.to,
                    f: tentative + heuristic.estimate(edge.to, target),
                    g: tentative,
                    depth,
                });
            }
        }
        let expanded = expanded_nodes.len();

        let outcome = if self.reachable(graph, source, target, now, true) {
            PathOutcome::MaxDepthExceeded
        } else if self.reachable(graph, source, target, now, false) {
            PathOutcome::BelowTrustThreshold
        } else {
            PathOutcome::NoPath
        };
        debug!(%source, %target, ?outcome, expanded, "No trust path");

        SearchResult { outcome, expanded }
    }

    /// Breadth-first reachability ignoring depth, optionally honouring the trust floor
    fn reachable(&self, graph: &Graph, source: NodeId, target: NodeId, now: Timestamp, trusted_only: bool) -> bool {
        let mut seen: HashSet<NodeId> = HashSet::from([source]);
        let mut queue = VecDeque::from([source]);
        while let Some(node) = queue.pop_front() {
            for &idx in graph.neighbors(node) {
                let Some(edge) = graph.edge_at(idx) else {
                    continue;
                };
                if edge.is_expired(now) || (trusted_only && edge.level < self.config.min_trust_level) {
                    continue;
                }
                if edge.to == target {
                    return true;
                }
                if seen.insert(edge.to) {
                    queue.push_back(edge.to);
                }
            }
        }
        false
    }

    /// A heap entry whose label was replaced by a dominating one
    fn superseded(labels: &HashMap<NodeId, Vec<(usize, f64)>>, node: NodeId, depth: usize, g: f64) -> bool {
        labels.get(&node).map_or(false, |frontier| {
            !frontier.iter().any(|&(d, cost)| d == depth && cost == g)
        })
    }

    fn reconstruct(
        graph: &Graph,
        came_from: &HashMap<(NodeId, usize), (NodeId, usize, usize)>,
        target: NodeId,
        depth: usize,
        cost: f64,
    ) -> TrustPath {
        let mut nodes = vec![target];
        let mut edges = Vec::new();
        let mut state = (target, depth);
        while let Some(&(parent, parent_depth, idx)) = came_from.get(&state) {
            if let Some(edge) = graph.edge_at(idx) {
                edges.push(*edge);
            }
            nodes.push(parent);
            state = (parent, parent_depth);
        }
        nodes.reverse();
        edges.reverse();

        TrustPath { nodes, edges, cost }
    }
}
