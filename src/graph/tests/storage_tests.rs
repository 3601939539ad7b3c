//! Integration tests for the sled repository and the cached graph
//!
//! Tests:
//! - Edge, revocation and score persistence across reopen
//! - Cache rebuild from disk
//! - Adjacency consistency under random upserts and removals

use proptest::prelude::*;
use tempfile::TempDir;
use trustmesh_core::traits::{EdgeRepository, ScoreRepository};
use trustmesh_core::{NodeId, ReputationScore, RiskEdge, SignedEdge};
use trustmesh_graph::{CachedGraph, Graph, SledRepository};

fn edge(from: u32, to: u32, risk: f64) -> RiskEdge {
    RiskEdge::new(NodeId(from), NodeId(to), risk, 10, 10_000).unwrap()
}

#[test]
fn test_sled_edges_survive_reopen() {
    let temp_dir = TempDir::new().unwrap();

    {
        let repo = SledRepository::open(temp_dir.path()).unwrap();
        repo.put_edge(&SignedEdge::new(edge(1, 2, -0.3), vec![1; 64]))
            .unwrap();
        repo.put_edge(&SignedEdge::unsigned(edge(2, 3, 0.4))).unwrap();
        repo.flush().unwrap();
    }

    let repo = SledRepository::open(temp_dir.path()).unwrap();
    let stored = repo.get_edge(NodeId(1), NodeId(2)).unwrap().unwrap();
    assert_eq!(stored.edge, edge(1, 2, -0.3));
    assert_eq!(stored.signature, vec![1; 64]);
    assert_eq!(repo.load_edges().unwrap().len(), 2);
}

#[test]
fn test_sled_upsert_and_delete() {
    let temp_dir = TempDir::new().unwrap();
    let repo = SledRepository::open(temp_dir.path()).unwrap();

    repo.put_edge(&SignedEdge::unsigned(edge(1, 2, 0.1))).unwrap();
    repo.put_edge(&SignedEdge::unsigned(edge(1, 2, 0.9))).unwrap();
    assert_eq!(repo.load_edges().unwrap().len(), 1);
    assert_eq!(
        repo.get_edge(NodeId(1), NodeId(2)).unwrap().unwrap().edge.risk,
        0.9
    );

    repo.delete_edge(NodeId(1), NodeId(2)).unwrap();
    assert!(repo.get_edge(NodeId(1), NodeId(2)).unwrap().is_none());
}

#[test]
fn test_sled_scores() {
    let temp_dir = TempDir::new().unwrap();
    let repo = SledRepository::open(temp_dir.path()).unwrap();

    let mut score = ReputationScore::new(NodeId(5), 100);
    score.score = 0.8;
    score.total_checks = 3;
    repo.put_score(&score).unwrap();

    assert_eq!(repo.get_score(NodeId(5)).unwrap(), Some(score));
    assert_eq!(repo.load_scores().unwrap(), vec![score]);
}

#[test]
fn test_cached_graph_over_sled() {
    let temp_dir = TempDir::new().unwrap();

    {
        let mut cached = CachedGraph::new(SledRepository::open(temp_dir.path()).unwrap());
        cached.add_edge(edge(1, 2, 0.2)).unwrap();
        cached.add_edge(edge(2, 3, 0.2)).unwrap();
        cached.add_edge(edge(3, 1, -0.8)).unwrap();
        cached.remove_edge(NodeId(2), NodeId(3), 500).unwrap();
        cached.repository().flush().unwrap();
    }

    let mut cached = CachedGraph::new(SledRepository::open(temp_dir.path()).unwrap());
    let graph = cached.load().unwrap();
    assert_eq!(graph.node_count(), 3);
    assert_eq!(graph.edge_count(), 2);
    assert!(graph.edge(NodeId(2), NodeId(3)).is_none());
    assert_eq!(graph.revocation(NodeId(2), NodeId(3)).unwrap().revoked_at, 500);
}

#[derive(Debug, Clone)]
enum Op {
    Upsert(u32, u32),
    Remove(u32, u32),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u32..6, 0u32..6).prop_map(|(a, b)| Op::Upsert(a, b)),
        (0u32..6, 0u32..6).prop_map(|(a, b)| Op::Remove(a, b)),
    ]
}

proptest! {
    #[test]
    fn prop_adjacency_matches_edge_set(ops in proptest::collection::vec(op_strategy(), 0..60)) {
        let mut graph = Graph::new();
        for op in ops {
            match op {
                Op::Upsert(a, b) if a != b => {
                    graph.add_edge(edge(a, b, 0.1)).unwrap();
                }
                Op::Remove(a, b) => {
                    let _ = graph.remove_edge(NodeId(a), NodeId(b), 0);
                }
                _ => {}
            }
        }

        let mut seen = 0;
        for node in graph.nodes().collect::<Vec<_>>() {
            for &idx in graph.neighbors(node) {
                let e = graph.edge_at(idx).unwrap();
                prop_assert_eq!(e.from, node);
                prop_assert_eq!(graph.edge(e.from, e.to), Some(e));
                seen += 1;
            }
        }
        prop_assert_eq!(seen, graph.edge_count());
    }
}
