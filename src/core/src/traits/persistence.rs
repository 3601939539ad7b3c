//! Durable storage of edges and scores
//!
//! Committed writes must be visible to the next local read.

use crate::error::Result;
use crate::types::{NodeId, ReputationScore, Revocation, SignedEdge};

pub trait EdgeRepository: Send + Sync {
    /// Upsert keyed by `(from, to)`
    fn put_edge(&self, edge: &SignedEdge) -> Result<()>;

    fn get_edge(&self, from: NodeId, to: NodeId) -> Result<Option<SignedEdge>>;

    fn delete_edge(&self, from: NodeId, to: NodeId) -> Result<()>;

    fn load_edges(&self) -> Result<Vec<SignedEdge>>;

    fn put_revocation(&self, revocation: &Revocation) -> Result<()>;

    fn delete_revocation(&self, from: NodeId, to: NodeId) -> Result<()>;

    fn load_revocations(&self) -> Result<Vec<Revocation>>;
}

pub trait ScoreRepository: Send + Sync {
    fn put_score(&self, score: &ReputationScore) -> Result<()>;

    fn get_score(&self, node: NodeId) -> Result<Option<ReputationScore>>;

    fn load_scores(&self) -> Result<Vec<ReputationScore>>;

    /// Make every committed write durable
    fn sync(&self) -> Result<()> {
        Ok(())
    }
}
