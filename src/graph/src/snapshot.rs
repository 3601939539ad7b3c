//! petgraph export of the active edge set

use crate::store::Graph;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;
use trustmesh_core::{NodeId, Timestamp};

/// Export unexpired edges with their risk as weight.
///
/// Every known node is present, including ones whose edges have all expired.
pub fn to_digraph(graph: &Graph, now: Timestamp) -> (DiGraph<NodeId, f64>, HashMap<NodeId, NodeIndex>) {
    let mut out = DiGraph::with_capacity(graph.node_count(), graph.edge_count());
    let mut indices = HashMap::with_capacity(graph.node_count());

    for node in graph.nodes() {
        indices.insert(node, out.add_node(node));
    }
    for edge in graph.active_edges(now) {
        if let (Some(&a), Some(&b)) = (indices.get(&edge.from), indices.get(&edge.to)) {
            out.add_edge(a, b, edge.risk);
        }
    }

    (out, indices)
}
