//! Cached graph over a persistent repository
//!
//! The cache state is an explicit value. Every read goes through
//! [`CachedGraph::load`], which fills the cache from the repository on first
//! use; [`CachedGraph::invalidate`] drops it again. Mutations write through to
//! the repository before touching the cached graph, so a failed write leaves
//! both sides unchanged.

use crate::error::{GraphError, Result};
use crate::store::Graph;
use tracing::debug;
use trustmesh_core::traits::EdgeRepository;
use trustmesh_core::{NodeId, RiskEdge, SignedEdge, Timestamp};

#[derive(Debug, Default)]
pub enum CacheState {
    #[default]
    NotLoaded,
    Loaded(Graph),
}

pub struct CachedGraph<R> {
    repo: R,
    state: CacheState,
}

impl<R: EdgeRepository> CachedGraph<R> {
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            state: CacheState::NotLoaded,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.state, CacheState::Loaded(_))
    }

    /// Single entry point for reads; loads from the repository when needed
    pub fn load(&mut self) -> Result<&mut Graph> {
        if let CacheState::NotLoaded = self.state {
            let graph = Self::read_repository(&self.repo)?;
            self.state = CacheState::Loaded(graph);
        }
        match &mut self.state {
            CacheState::Loaded(graph) => Ok(graph),
            CacheState::NotLoaded => Err(GraphError::Storage("cache failed to load".to_string())),
        }
    }

    /// Drop the cached graph; the next `load()` re-reads the repository
    pub fn invalidate(&mut self) {
        debug!("Graph cache invalidated");
        self.state = CacheState::NotLoaded;
    }

    /// Upsert an edge in the repository, then in the cache
    pub fn add_signed_edge(&mut self, signed: SignedEdge) -> Result<usize> {
        signed.edge.validate()?;
        self.repo.put_edge(&signed)?;
        self.repo.delete_revocation(signed.edge.from, signed.edge.to)?;
        self.load()?.add_signed_edge(signed)
    }

    pub fn add_edge(&mut self, edge: RiskEdge) -> Result<usize> {
        self.add_signed_edge(SignedEdge::unsigned(edge))
    }

    /// Remove an edge in both places and persist the revocation record
    pub fn remove_edge(&mut self, from: NodeId, to: NodeId, now: Timestamp) -> Result<RiskEdge> {
        let graph = self.load()?;
        if graph.edge(from, to).is_none() {
            return Err(GraphError::EdgeNotFound { from, to });
        }
        self.repo.delete_edge(from, to)?;

        let graph = self.load()?;
        let edge = graph.remove_edge(from, to, now)?;
        if let Some(revocation) = graph.revocation(from, to).copied() {
            self.repo.put_revocation(&revocation)?;
        }
        Ok(edge)
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    fn read_repository(repo: &R) -> Result<Graph> {
        let mut graph = Graph::new();
        for signed in repo.load_edges()? {
            graph.add_signed_edge(signed)?;
        }
        for revocation in repo.load_revocations()? {
            graph.record_revocation(revocation);
        }
        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "Loaded graph from repository"
        );
        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryRepository;

    fn edge(from: u32, to: u32) -> RiskEdge {
        RiskEdge::new(NodeId(from), NodeId(to), -0.2, 0, 100).unwrap()
    }

    #[test]
    fn test_cache_starts_unloaded() {
        let mut cached = CachedGraph::new(MemoryRepository::new());
        assert!(!cached.is_loaded());
        assert!(cached.load().unwrap().is_empty());
        assert!(cached.is_loaded());
    }

    #[test]
    fn test_write_through() {
        let mut cached = CachedGraph::new(MemoryRepository::new());
        cached.add_edge(edge(1, 2)).unwrap();
        assert_eq!(cached.repository().load_edges().unwrap().len(), 1);

        cached.invalidate();
        assert!(!cached.is_loaded());
        assert!(cached.load().unwrap().edge(NodeId(1), NodeId(2)).is_some());
    }

    #[test]
    fn test_invalidate_picks_up_external_writes() {
        let mut cached = CachedGraph::new(MemoryRepository::new());
        cached.load().unwrap();

        cached
            .repository()
            .put_edge(&SignedEdge::unsigned(edge(3, 4)))
            .unwrap();
        // Stale until invalidated
        assert!(cached.load().unwrap().edge(NodeId(3), NodeId(4)).is_none());

        cached.invalidate();
        assert!(cached.load().unwrap().edge(NodeId(3), NodeId(4)).is_some());
    }

    #[test]
    fn test_remove_persists_revocation() {
        let mut cached = CachedGraph::new(MemoryRepository::new());
        cached.add_edge(edge(1, 2)).unwrap();
        cached.remove_edge(NodeId(1), NodeId(2), 50).unwrap();

        assert!(cached.repository().load_edges().unwrap().is_empty());
        assert_eq!(cached.repository().load_revocations().unwrap().len(), 1);

        cached.invalidate();
        let graph = cached.load().unwrap();
        assert_eq!(graph.revocation(NodeId(1), NodeId(2)).unwrap().revoked_at, 50);
    }

    #[test]
    fn test_remove_missing_edge_leaves_repository() {
        let mut cached = CachedGraph::new(MemoryRepository::new());
        assert!(matches!(
            cached.remove_edge(NodeId(1), NodeId(2), 0),
            Err(GraphError::EdgeNotFound { .. })
        ));
        assert!(cached.repository().load_revocations().unwrap().is_empty());
    }
}
