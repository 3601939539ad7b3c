//! Betrayal detection
//!
//! Bellman-Ford over edge risk from a source node. Negative risk is a vouch, so
//! a reachable cycle with negative summed risk is a ring of participants
//! vouching each other up: a provable contradiction.
//!
//! Predecessors are tracked as an index map `NodeId -> (NodeId, edge index)`
//! into the run's active edge list. When the pass after |V|-1 rounds still relaxes
//! an edge, the predecessor chain from that edge's target is walked until a
//! node repeats, which delimits exactly one cycle.

use crate::evidence::CycleEvidence;
use rayon::prelude::*;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, warn};
use trustmesh_core::{AnomalyReason, AnomalyScore, NodeId, Timestamp};
use trustmesh_graph::Graph;

/// Betrayal detector configuration
#[derive(Debug, Clone)]
pub struct BetrayalConfig {
    /// Relaxation pass cap; `None` runs the full |V|-1 passes
    pub max_passes: Option<usize>,

    /// Score contributed per cycle member
    pub score_per_member: f64,
}

impl Default for BetrayalConfig {
    fn default() -> Self {
        Self {
            max_passes: None,
            score_per_member: 0.2,
        }
    }
}

/// Result of one detection run
#[derive(Debug, Clone, PartialEq)]
pub struct BetrayalReport {
    pub source: NodeId,
    /// Disjoint cycles, each reported once
    pub cycles: Vec<CycleEvidence>,
    /// `min(1, Σ len × score_per_member)`
    pub score: f64,
    /// Relaxation passes performed, excluding the detection pass
    pub passes: usize,
    /// The pass cap cut relaxation short; the result is best-effort
    pub truncated: bool,
}

impl BetrayalReport {
    fn empty(source: NodeId) -> Self {
        Self {
            source,
            cycles: Vec::new(),
            score: 0.0,
            passes: 0,
            truncated: false,
        }
    }

    pub fn has_betrayal(&self) -> bool {
        !self.cycles.is_empty()
    }

    /// Anomaly attributed to the run's source
    pub fn anomaly(&self) -> AnomalyScore {
        if self.has_betrayal() {
            AnomalyScore::new(self.source, self.score, AnomalyReason::NegativeCycle)
        } else {
            AnomalyScore::none(self.source)
        }
    }

    /// Cycle containing `node`
    pub fn cycle_for(&self, node: NodeId) -> Option<&CycleEvidence> {
        self.cycles.iter().find(|c| c.contains(node))
    }

    /// Encoded evidence of the cycle containing `node`
    pub fn evidence_for(&self, node: NodeId) -> Option<Vec<u8>> {
        self.cycle_for(node).map(CycleEvidence::encode)
    }

    /// All nodes on any reported cycle
    pub fn members(&self) -> BTreeSet<NodeId> {
        self.cycles.iter().flat_map(|c| c.nodes()).collect()
    }
}

/// Active edge as seen by one run
struct RunEdge {
    from: NodeId,
    to: NodeId,
    risk: f64,
}

#[derive(Debug, Clone, Default)]
pub struct BetrayalDetector {
    config: BetrayalConfig,
}

impl BetrayalDetector {
    pub fn new(config: BetrayalConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BetrayalConfig {
        &self.config
    }

    /// Run detection from `source`, ignoring edges expired at `now`
    pub fn detect(&self, graph: &Graph, source: NodeId, now: Timestamp) -> BetrayalReport {
        if !graph.contains_node(source) {
            return BetrayalReport::empty(source);
        }

        let edges = Self::collect_edges(graph, now);
        let limit = graph.node_count().saturating_sub(1);
        let cap = self.config.max_passes.map_or(limit, |m| m.min(limit));

        let mut dist: HashMap<NodeId, f64> = HashMap::with_capacity(graph.node_count());
        let mut pred: HashMap<NodeId, (NodeId, usize)> = HashMap::with_capacity(graph.node_count());
        dist.insert(source, 0.0);

        let mut passes = 0;
        let mut settled = false;
        while passes < cap {
            passes += 1;
            let mut changed = false;
            for (pos, edge) in edges.iter().enumerate() {
                if Self::relax(&mut dist, &mut pred, pos, edge) {
                    changed = true;
                }
            }
            if !changed {
                settled = true;
                break;
            }
        }

        let mut report = BetrayalReport {
            source,
            passes,
            truncated: !settled && cap < limit,
            ..BetrayalReport::empty(source)
        };
        if settled {
            debug!(%source, passes, "No reachable negative cycle");
            return report;
        }

        // Detection pass: any further relaxation sits downstream of a negative cycle
        let mut attributed: BTreeSet<NodeId> = BTreeSet::new();
        for (pos, edge) in edges.iter().enumerate() {
            if !Self::relax(&mut dist, &mut pred, pos, edge) {
                continue;
            }
            if let Some(cycle) = Self::trace_cycle(edge.to, &pred, &edges, &attributed) {
                attributed.extend(cycle.nodes());
                report.cycles.push(cycle);
            }
        }

        let members: usize = report.cycles.iter().map(CycleEvidence::len).sum();
        report.score = (members as f64 * self.config.score_per_member).min(1.0);

        if report.has_betrayal() {
            warn!(
                %source,
                cycles = report.cycles.len(),
                members,
                score = report.score,
                truncated = report.truncated,
                "Betrayal cycle detected"
            );
        }
        report
    }

    /// Whether every edge of `evidence` is still active at `now` and the cycle
    /// still sums to negative risk over the graph's current edges
    pub fn confirms(&self, graph: &Graph, evidence: &CycleEvidence, now: Timestamp) -> bool {
        let members = evidence.members();
        let mut total = 0.0;
        for (i, &(from, _)) in members.iter().enumerate() {
            let to = members[(i + 1) % members.len()].0;
            match graph.edge(from, to) {
                Some(edge) if !edge.is_expired(now) => total += edge.risk,
                _ => return false,
            }
        }
        total < 0.0
    }

    /// Independent runs from many sources over a shared graph
    pub fn scan(&self, graph: &Graph, sources: &[NodeId], now: Timestamp) -> Vec<BetrayalReport> {
        sources
            .par_iter()
            .map(|&source| self.detect(graph, source, now))
            .collect()
    }

    fn collect_edges(graph: &Graph, now: Timestamp) -> Vec<RunEdge> {
        let mut edges = Vec::with_capacity(graph.edge_count());
        for node in graph.nodes() {
            for &idx in graph.neighbors(node) {
                if let Some(edge) = graph.edge_at(idx) {
                    if !edge.is_expired(now) {
                        edges.push(RunEdge {
                            from: edge.from,
                            to: edge.to,
                            risk: edge.risk,
                        });
                    }
                }
            }
        }
        edges
    }

    fn relax(
        dist: &mut HashMap<NodeId, f64>,
        pred: &mut HashMap<NodeId, (NodeId, usize)>,
        pos: usize,
        edge: &RunEdge,
    ) -> bool {
        let Some(&from_dist) = dist.get(&edge.from) else {
            return false;
        };
        let candidate = from_dist + edge.risk;
        let improves = dist.get(&edge.to).map_or(true, |&d| candidate < d);
        if improves {
            dist.insert(edge.to, candidate);
            pred.insert(edge.to, (edge.from, pos));
        }
        improves
    }

    /// Walk predecessors from `start` until a node repeats.
    ///
    /// Returns `None` when the walk leaves the predecessor map or touches a
    /// node already attributed to a reported cycle.
    fn trace_cycle(
        start: NodeId,
        pred: &HashMap<NodeId, (NodeId, usize)>,
        edges: &[RunEdge],
        attributed: &BTreeSet<NodeId>,
    ) -> Option<CycleEvidence> {
        let mut walk: Vec<NodeId> = Vec::new();
        let mut position: HashMap<NodeId, usize> = HashMap::new();
        let mut current = start;

        let repeat_at = loop {
            if attributed.contains(&current) {
                return None;
            }
            if let Some(&at) = position.get(&current) {
                break at;
            }
            position.insert(current, walk.len());
            walk.push(current);
            current = pred.get(&current)?.0;
        };

        // walk[repeat_at..] is the cycle in backward order; pair each member's
        // predecessor with the risk of the edge into the member
        let mut members: Vec<(NodeId, f64)> = walk[repeat_at..]
            .iter()
            .filter_map(|node| {
                let (prev, pos) = *pred.get(node)?;
                Some((prev, edges[pos].risk))
            })
            .collect();
        members.reverse();

        debug!(start = %start, len = members.len(), "Traced cycle");
        CycleEvidence::new(members).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trustmesh_core::RiskEdge;

    const A: NodeId = NodeId(0);
    const B: NodeId = NodeId(1);
    const C: NodeId = NodeId(2);

    fn graph(edges: &[(u32, u32, f64)]) -> Graph {
        let mut graph = Graph::new();
        for &(from, to, risk) in edges {
            graph
                .add_edge(RiskEdge::new(NodeId(from), NodeId(to), risk, 0, 1_000).unwrap())
                .unwrap();
        }
        graph
    }

    #[test]
    fn test_no_cycle_scores_zero() {
        let g = graph(&[(0, 1, 0.5), (1, 2, 0.3)]);
        let report = BetrayalDetector::default().detect(&g, A, 0);

        assert!(!report.has_betrayal());
        assert_eq!(report.score, 0.0);
        assert_eq!(report.anomaly().reason, AnomalyReason::None);
    }

    #[test]
    fn test_negative_ring_detected() {
        let g = graph(&[(0, 1, 0.2), (1, 2, 0.2), (2, 0, -0.8)]);
        let report = BetrayalDetector::default().detect(&g, A, 0);

        assert_eq!(report.cycles.len(), 1);
        let members: BTreeSet<_> = report.members();
        assert_eq!(members, [A, B, C].into_iter().collect());
        assert!(report.score > 0.0);
        assert!((report.score - 0.6).abs() < 1e-12);

        let cycle = &report.cycles[0];
        assert_eq!(cycle.members()[0], (A, 0.2));
        assert_eq!(cycle.members()[1], (B, 0.2));
        assert_eq!(cycle.members()[2], (C, -0.8));
        assert_eq!(report.anomaly().reason, AnomalyReason::NegativeCycle);
    }

    #[test]
    fn test_non_negative_ring_not_reported() {
        let g = graph(&[(0, 1, 0.2), (1, 2, 0.2), (2, 0, -0.4)]);
        let report = BetrayalDetector::default().detect(&g, A, 0);
        assert!(!report.has_betrayal());
    }

    #[test]
    fn test_confirms_tracks_current_edges() {
        let mut g = graph(&[(0, 1, 0.2), (1, 2, 0.2), (2, 0, -0.8)]);
        let detector = BetrayalDetector::default();
        let evidence = detector.detect(&g, A, 0).cycles[0].clone();

        assert!(detector.confirms(&g, &evidence, 0));
        assert!(!detector.confirms(&g, &evidence, 1_001));

        g.add_edge(RiskEdge::new(C, A, -0.3, 0, 1_000).unwrap()).unwrap();
        assert!(!detector.confirms(&g, &evidence, 0));

        g.add_edge(RiskEdge::new(C, A, -0.8, 0, 1_000).unwrap()).unwrap();
        g.remove_edge(C, A, 1).unwrap();
        assert!(!detector.confirms(&g, &evidence, 1));
    }

    #[test]
    fn test_same_evidence_from_any_source() {
        let g = graph(&[(0, 1, 0.2), (1, 2, 0.2), (2, 0, -0.8)]);
        let detector = BetrayalDetector::default();

        let from_a = detector.detect(&g, A, 0).evidence_for(A).unwrap();
        let from_c = detector.detect(&g, C, 0).evidence_for(B).unwrap();
        assert_eq!(from_a, from_c);
    }

    #[test]
    fn test_disjoint_cycles_reported_once() {
        let g = graph(&[
            (0, 1, -0.5),
            (1, 0, -0.5),
            (0, 2, 0.1),
            (2, 3, -0.5),
            (3, 2, -0.5),
        ]);
        let report = BetrayalDetector::default().detect(&g, A, 0);

        assert_eq!(report.cycles.len(), 2);
        assert_eq!(report.members().len(), 4);
        assert!((report.score - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_score_capped() {
        // Six-member ring: 6 × 0.2 > 1
        let g = graph(&[
            (0, 1, -0.1),
            (1, 2, -0.1),
            (2, 3, -0.1),
            (3, 4, -0.1),
            (4, 5, -0.1),
            (5, 0, -0.1),
        ]);
        let report = BetrayalDetector::default().detect(&g, A, 0);
        assert_eq!(report.score, 1.0);
    }

    #[test]
    fn test_expired_edges_ignored() {
        let mut g = graph(&[(0, 1, 0.2), (1, 2, 0.2)]);
        g.add_edge(RiskEdge::new(C, A, -0.8, 0, 10).unwrap()).unwrap();

        assert!(BetrayalDetector::default().detect(&g, A, 5).has_betrayal());
        assert!(!BetrayalDetector::default().detect(&g, A, 11).has_betrayal());
    }

    #[test]
    fn test_unreachable_cycle_not_reported() {
        let g = graph(&[(0, 1, 0.3), (2, 3, -0.5), (3, 2, -0.5)]);
        let report = BetrayalDetector::default().detect(&g, A, 0);
        assert!(!report.has_betrayal());
    }

    #[test]
    fn test_unknown_source() {
        let g = graph(&[(0, 1, 0.3)]);
        let report = BetrayalDetector::default().detect(&g, NodeId(42), 0);
        assert_eq!(report, BetrayalReport::empty(NodeId(42)));
    }

    #[test]
    fn test_pass_cap_flags_truncation() {
        let g = graph(&[(0, 1, -0.1), (1, 2, -0.1), (2, 3, -0.1), (3, 4, -0.1)]);
        let capped = BetrayalDetector::new(BetrayalConfig {
            max_passes: Some(1),
            ..Default::default()
        });
        let report = capped.detect(&g, A, 0);
        assert!(report.truncated);
        assert_eq!(report.passes, 1);
        assert!(!report.has_betrayal());
    }

    #[test]
    fn test_early_exit() {
        let g = graph(&[(0, 1, 0.1), (1, 2, 0.1), (2, 3, 0.1), (3, 4, 0.1)]);
        let report = BetrayalDetector::default().detect(&g, A, 0);
        // Edges are in topological order, so the second pass relaxes nothing
        assert_eq!(report.passes, 2);
        assert!(!report.truncated);
    }

    #[test]
    fn test_scan_matches_detect() {
        let g = graph(&[(0, 1, 0.2), (1, 2, 0.2), (2, 0, -0.8), (3, 0, 0.5)]);
        let detector = BetrayalDetector::default();
        let sources = [A, B, NodeId(3)];

        let reports = detector.scan(&g, &sources, 0);
        for (report, source) in reports.iter().zip(sources) {
            assert_eq!(*report, detector.detect(&g, source, 0));
        }
    }
}
