//! Detection integration tests
//!
//! Betrayal detection is checked against petgraph's Bellman-Ford on random
//! graphs. Risks are multiples of 0.25 so sums are exact.

use petgraph::algo::bellman_ford;
use proptest::prelude::*;
use trustmesh_core::{AnomalyReason, NodeId, RiskEdge};
use trustmesh_detection::{
    AlertLog, AlertPriority, BeliefPropagation, BetrayalDetector, CycleEvidence, SlashSignal,
};
use trustmesh_graph::snapshot::to_digraph;
use trustmesh_graph::Graph;

fn build(edges: &[(u32, u32, i8)]) -> Graph {
    let mut graph = Graph::new();
    for &(from, to, quarters) in edges {
        if from == to {
            continue;
        }
        let risk = f64::from(quarters) * 0.25;
        graph
            .add_edge(RiskEdge::new(NodeId(from), NodeId(to), risk, 0, 1_000).unwrap())
            .unwrap();
    }
    graph
}

fn edge_strategy(nodes: u32) -> impl Strategy<Value = Vec<(u32, u32, i8)>> {
    prop::collection::vec((0..nodes, 0..nodes, -4i8..=4), 0..24)
}

proptest! {
    #[test]
    fn prop_detection_matches_bellman_ford(edges in edge_strategy(8), source in 0u32..8) {
        let mut graph = build(&edges);
        graph.add_node(NodeId(source));

        let report = BetrayalDetector::default().detect(&graph, NodeId(source), 0);

        let (digraph, index) = to_digraph(&graph, 0);
        let oracle_negative = bellman_ford(&digraph, index[&NodeId(source)]).is_err();

        prop_assert_eq!(report.has_betrayal(), oracle_negative);
        prop_assert!(!report.truncated);
    }

    #[test]
    fn prop_reported_cycles_are_real_and_negative(edges in edge_strategy(8), source in 0u32..8) {
        let mut graph = build(&edges);
        graph.add_node(NodeId(source));
        let report = BetrayalDetector::default().detect(&graph, NodeId(source), 0);

        let mut seen = std::collections::BTreeSet::new();
        for cycle in &report.cycles {
            prop_assert!(cycle.total_risk() < 0.0);

            let members = cycle.members();
            for (i, (node, risk)) in members.iter().enumerate() {
                let next = members[(i + 1) % members.len()].0;
                let edge = graph.edge(*node, next);
                prop_assert!(edge.is_some());
                prop_assert_eq!(edge.unwrap().risk, *risk);
                // Cycles are disjoint
                prop_assert!(seen.insert(*node));
            }
        }

        let expected = (report.members().len() as f64 * 0.2).min(1.0);
        prop_assert!((report.score - expected).abs() < 1e-12);
    }

    #[test]
    fn prop_evidence_is_rotation_independent(
        nodes in prop::collection::btree_set(0u32..1_000, 1..12),
        shift in 0usize..12,
    ) {
        let cycle: Vec<(NodeId, f64)> = nodes
            .iter()
            .enumerate()
            .map(|(i, &n)| (NodeId(n), (i as f64 * 0.1) - 0.5))
            .collect();
        let mut rotated = cycle.clone();
        rotated.rotate_left(shift % cycle.len());

        let a = CycleEvidence::new(cycle).unwrap();
        let b = CycleEvidence::new(rotated).unwrap();
        prop_assert_eq!(a.encode(), b.encode());
        prop_assert_eq!(CycleEvidence::decode(&a.encode()).unwrap(), b);
    }

    #[test]
    fn prop_decode_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..64)) {
        let _ = CycleEvidence::decode(&bytes);
    }
}

#[test]
fn test_evidence_identical_from_every_member() {
    let graph = build(&[(0, 1, 1), (1, 2, 1), (2, 0, -3), (5, 0, 2)]);
    let detector = BetrayalDetector::default();

    let reports = detector.scan(&graph, &[NodeId(0), NodeId(1), NodeId(2), NodeId(5)], 0);
    let encoded: Vec<_> = reports
        .iter()
        .map(|r| r.evidence_for(NodeId(1)).unwrap())
        .collect();
    assert!(encoded.windows(2).all(|w| w[0] == w[1]));
}

#[test]
fn test_feedback_then_rerun() {
    let mut graph = build(&[(0, 1, 1), (1, 2, 1), (2, 0, -3), (0, 3, 2)]);
    let bp = BeliefPropagation::default();
    let detector = BetrayalDetector::default();

    assert!(detector.detect(&graph, NodeId(0), 0).has_betrayal());

    let outcome = bp.run(&graph, 0);
    bp.feedback(&mut graph, &outcome);

    // Reweighting only scales risks, so the ring survives iff its sum stays negative
    let ring: f64 = [(0, 1), (1, 2), (2, 0)]
        .iter()
        .map(|&(f, t)| graph.edge(NodeId(f), NodeId(t)).unwrap().risk)
        .sum();
    let rerun = detector.detect(&graph, NodeId(0), 0);
    assert_eq!(rerun.has_betrayal(), ring < 0.0);
}

#[test]
fn test_report_to_alert_and_slash_signal() {
    let graph = build(&[(0, 1, 1), (1, 2, 1), (2, 3, 1), (3, 0, -4)]);
    let report = BetrayalDetector::default().detect(&graph, NodeId(0), 0);
    assert_eq!(report.cycles.len(), 1);

    let anomaly = report.anomaly();
    assert_eq!(anomaly.reason, AnomalyReason::NegativeCycle);
    assert!((anomaly.score - 0.8).abs() < 1e-12);

    let log = AlertLog::new();
    let alert = log.emit(anomaly);
    assert_eq!(alert.priority, AlertPriority::Warning);

    let target = trustmesh_crypto::Did([4u8; 32]);
    let signal = SlashSignal::for_cycle(target, &report.cycles[0], &anomaly, 99, 1);
    let decoded = SlashSignal::from_bytes(&signal.to_bytes()).unwrap();
    assert_eq!(decoded.evidence_hash, report.cycles[0].digest());
    assert_eq!(decoded.severity, 80);
}
