//! In-memory repository for tests and ephemeral nodes

use parking_lot::RwLock;
use std::collections::BTreeMap;
use trustmesh_core::traits::{EdgeRepository, ScoreRepository};
use trustmesh_core::{NodeId, ReputationScore, Result, Revocation, SignedEdge};

#[derive(Debug, Default)]
pub struct MemoryRepository {
    edges: RwLock<BTreeMap<(NodeId, NodeId), SignedEdge>>,
    revocations: RwLock<BTreeMap<(NodeId, NodeId), Revocation>>,
    scores: RwLock<BTreeMap<NodeId, ReputationScore>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EdgeRepository for MemoryRepository {
    fn put_edge(&self, edge: &SignedEdge) -> Result<()> {
        self.edges.write().insert(edge.edge.key(), edge.clone());
        Ok(())
    }

    fn get_edge(&self, from: NodeId, to: NodeId) -> Result<Option<SignedEdge>> {
        Ok(self.edges.read().get(&(from, to)).cloned())
    }

    fn delete_edge(&self, from: NodeId, to: NodeId) -> Result<()> {
        self.edges.write().remove(&(from, to));
        Ok(())
    }

    fn load_edges(&self) -> Result<Vec<SignedEdge>> {
        Ok(self.edges.read().values().cloned().collect())
    }

    fn put_revocation(&self, revocation: &Revocation) -> Result<()> {
        self.revocations
            .write()
            .insert((revocation.from, revocation.to), *revocation);
        Ok(())
    }

    fn delete_revocation(&self, from: NodeId, to: NodeId) -> Result<()> {
        self.revocations.write().remove(&(from, to));
        Ok(())
    }

    fn load_revocations(&self) -> Result<Vec<Revocation>> {
        Ok(self.revocations.read().values().copied().collect())
    }
}

impl ScoreRepository for MemoryRepository {
    fn put_score(&self, score: &ReputationScore) -> Result<()> {
        self.scores.write().insert(score.node, *score);
        Ok(())
    }

    fn get_score(&self, node: NodeId) -> Result<Option<ReputationScore>> {
        Ok(self.scores.read().get(&node).copied())
    }

    fn load_scores(&self) -> Result<Vec<ReputationScore>> {
        Ok(self.scores.read().values().copied().collect())
    }
}
