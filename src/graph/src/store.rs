//! Graph store implementation
//!
//! Holds the node set, the edge arena and the derived adjacency index. Edges
//! are addressed by their position in the arena; adjacency lists hold those
//! positions in ascending order.
//!
//! The store is not internally synchronised. One owner mutates it; readers
//! take `&Graph`.

use crate::error::{GraphError, Result};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, info};
use trustmesh_core::{level_for_risk, NodeId, Revocation, RiskEdge, SignedEdge, Timestamp};

#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: BTreeSet<NodeId>,

    /// Edge arena
    edges: Vec<RiskEdge>,

    /// Signatures parallel to `edges`; empty for unsigned edges
    signatures: Vec<Vec<u8>>,

    /// (from, to) -> arena position
    index: HashMap<(NodeId, NodeId), usize>,

    /// from -> outgoing arena positions
    adjacency: BTreeMap<NodeId, Vec<usize>>,

    /// Audit trail of explicit removals
    revocations: HashMap<(NodeId, NodeId), Revocation>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node. Returns false if it was already known.
    pub fn add_node(&mut self, node: NodeId) -> bool {
        self.nodes.insert(node)
    }

    /// Upsert an unsigned edge, returning its arena position
    pub fn add_edge(&mut self, edge: RiskEdge) -> Result<usize> {
        self.add_signed_edge(SignedEdge::unsigned(edge))
    }

    /// Upsert an edge with the asserting party's signature.
    ///
    /// Unknown endpoints are registered. Replacing an edge keeps its position
    /// and clears any revocation recorded for the key.
    pub fn add_signed_edge(&mut self, signed: SignedEdge) -> Result<usize> {
        signed.edge.validate()?;
        let SignedEdge { edge, signature } = signed;
        let key = edge.key();

        self.nodes.insert(edge.from);
        self.nodes.insert(edge.to);
        self.revocations.remove(&key);

        if let Some(&idx) = self.index.get(&key) {
            debug!(from = %edge.from, to = %edge.to, risk = edge.risk, "Replacing edge");
            self.edges[idx] = edge;
            self.signatures[idx] = signature;
            return Ok(idx);
        }

        let idx = self.edges.len();
        self.edges.push(edge);
        self.signatures.push(signature);
        self.index.insert(key, idx);
        self.adjacency.entry(edge.from).or_default().push(idx);
        debug!(from = %edge.from, to = %edge.to, risk = edge.risk, idx, "Inserted edge");
        Ok(idx)
    }

    /// Outgoing edge positions of `node`, expired edges included
    pub fn neighbors(&self, node: NodeId) -> &[usize] {
        self.adjacency
            .get(&node)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn edge(&self, from: NodeId, to: NodeId) -> Option<&RiskEdge> {
        self.index.get(&(from, to)).map(|&idx| &self.edges[idx])
    }

    pub fn edge_at(&self, idx: usize) -> Option<&RiskEdge> {
        self.edges.get(idx)
    }

    /// Signature stored with the edge, `None` when absent or unsigned
    pub fn signature(&self, from: NodeId, to: NodeId) -> Option<&[u8]> {
        self.index
            .get(&(from, to))
            .map(|&idx| self.signatures[idx].as_slice())
            .filter(|sig| !sig.is_empty())
    }

    pub fn signed_edge(&self, from: NodeId, to: NodeId) -> Option<SignedEdge> {
        self.index
            .get(&(from, to))
            .map(|&idx| SignedEdge::new(self.edges[idx], self.signatures[idx].clone()))
    }

    /// Explicitly delete an edge, leaving a revocation record
    pub fn remove_edge(&mut self, from: NodeId, to: NodeId, now: Timestamp) -> Result<RiskEdge> {
        let idx = self
            .index
            .remove(&(from, to))
            .ok_or(GraphError::EdgeNotFound { from, to })?;

        let edge = self.edges.remove(idx);
        self.signatures.remove(idx);
        self.rebuild_index();

        let revocation = Revocation {
            from,
            to,
            nonce: edge.nonce,
            revoked_at: now,
        };
        self.revocations.insert((from, to), revocation);

        info!(%from, %to, nonce = edge.nonce, "Edge revoked");
        Ok(edge)
    }

    /// Re-insert a revocation record, e.g. when loading from storage
    pub fn record_revocation(&mut self, revocation: Revocation) {
        self.revocations
            .insert((revocation.from, revocation.to), revocation);
    }

    pub fn revocation(&self, from: NodeId, to: NodeId) -> Option<&Revocation> {
        self.revocations.get(&(from, to))
    }

    pub fn revocations(&self) -> impl Iterator<Item = &Revocation> {
        self.revocations.values()
    }

    /// All edges in arena order
    pub fn edges(&self) -> impl Iterator<Item = &RiskEdge> {
        self.edges.iter()
    }

    /// Edges not expired at `now`
    pub fn active_edges(&self, now: Timestamp) -> impl Iterator<Item = &RiskEdge> {
        self.edges.iter().filter(move |e| !e.is_expired(now))
    }

    /// Rescale every edge's risk, clamping into [-1, 1]. Levels follow the new risk.
    ///
    /// A non-finite result leaves the edge unchanged.
    pub fn reweight_edges<F>(&mut self, mut f: F)
    where
        F: FnMut(&RiskEdge) -> f64,
    {
        for edge in &mut self.edges {
            let risk = f(edge);
            if risk.is_finite() {
                edge.risk = risk.clamp(-1.0, 1.0);
                edge.level = level_for_risk(edge.risk);
            }
        }
    }

    /// Nodes in ascending id order
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().copied()
    }

    pub fn contains_node(&self, node: NodeId) -> bool {
        self.nodes.contains(&node)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn rebuild_index(&mut self) {
        self.index.clear();
        self.adjacency.clear();
        for (idx, edge) in self.edges.iter().enumerate() {
            self.index.insert(edge.key(), idx);
            self.adjacency.entry(edge.from).or_default().push(idx);
        }
    }
}
