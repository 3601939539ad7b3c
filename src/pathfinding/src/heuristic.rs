//! A* heuristics
//!
//! Every hop costs at least 1.0 (see [`edge_cost`](crate::astar::edge_cost)),
//! so any estimate within [0, 1] for non-target nodes and 0 at the target is
//! admissible and consistent.

use trustmesh_core::{NodeId, Timestamp};
use trustmesh_reputation::ReputationLedger;

/// Remaining-cost estimate from `node` to `target`
pub trait Heuristic {
    fn estimate(&self, node: NodeId, target: NodeId) -> f64;
}

/// Caller-supplied estimates
impl<F> Heuristic for F
where
    F: Fn(NodeId, NodeId) -> f64,
{
    fn estimate(&self, node: NodeId, target: NodeId) -> f64 {
        self(node, target)
    }
}

/// Always zero: A* degrades to Dijkstra
#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroHeuristic;

impl Heuristic for ZeroHeuristic {
    fn estimate(&self, _node: NodeId, _target: NodeId) -> f64 {
        0.0
    }
}

/// `baseline + (1 − reputation) × penalty_scale`, capped at one hop
pub struct ReputationHeuristic<'a> {
    ledger: &'a ReputationLedger,
    now: Timestamp,
    baseline: f64,
    penalty_scale: f64,
}

impl<'a> ReputationHeuristic<'a> {
    pub const MAX_ESTIMATE: f64 = 1.0;

    pub fn new(ledger: &'a ReputationLedger, now: Timestamp) -> Self {
        Self::with_scale(ledger, now, 0.5, 0.5)
    }

    pub fn with_scale(ledger: &'a ReputationLedger, now: Timestamp, baseline: f64, penalty_scale: f64) -> Self {
        Self {
            ledger,
            now,
            baseline: baseline.max(0.0),
            penalty_scale: penalty_scale.max(0.0),
        }
    }
}

impl Heuristic for ReputationHeuristic<'_> {
    fn estimate(&self, node: NodeId, target: NodeId) -> f64 {
        if node == target {
            return 0.0;
        }
        let reputation = self.ledger.get_at(node, self.now);
        (self.baseline + (1.0 - reputation) * self.penalty_scale).min(Self::MAX_ESTIMATE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use trustmesh_core::{ManualClock, PopVerdict};
    use trustmesh_reputation::LedgerConfig;

    #[test]
    fn test_reputation_heuristic_bounds() {
        let mut ledger =
            ReputationLedger::with_clock(LedgerConfig::default(), Arc::new(ManualClock::new(0)));
        ledger.update(NodeId(1), &PopVerdict::Valid, 0);
        ledger.update(NodeId(2), &PopVerdict::Replay, 0);

        let h = ReputationHeuristic::new(&ledger, 0);
        assert_eq!(h.estimate(NodeId(9), NodeId(9)), 0.0);
        // Unknown node sits at the neutral prior
        assert!((h.estimate(NodeId(3), NodeId(9)) - 0.75).abs() < 1e-12);
        // Better reputation, lower estimate
        assert!(h.estimate(NodeId(1), NodeId(9)) < h.estimate(NodeId(2), NodeId(9)));

        let steep = ReputationHeuristic::with_scale(&ledger, 0, 0.9, 5.0);
        assert_eq!(steep.estimate(NodeId(2), NodeId(9)), 1.0);
    }

    #[test]
    fn test_closure_heuristic() {
        let h = |node: NodeId, _target: NodeId| f64::from(node.as_u32()) * 0.1;
        assert!((h.estimate(NodeId(3), NodeId(0)) - 0.3).abs() < 1e-12);
        assert_eq!(ZeroHeuristic.estimate(NodeId(3), NodeId(0)), 0.0);
    }
}
