//! Sled-backed persistent storage
//!
//! Uses three sled trees:
//! - `edges`: `from BE | to BE` → bincode `SignedEdge`
//! - `revocations`: `from BE | to BE` → bincode `Revocation`
//! - `scores`: `node BE` → bincode `ReputationScore`
//!
//! sled operations are internally synchronised, so the repository is shared
//! by reference.

use super::edge_key;
use crate::error::Result;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::debug;
use trustmesh_core::traits::{EdgeRepository, ScoreRepository};
use trustmesh_core::{CoreError, NodeId, ReputationScore, Revocation, SignedEdge};

const EDGES_TREE: &str = "edges";
const REVOCATIONS_TREE: &str = "revocations";
const SCORES_TREE: &str = "scores";

/// Storage configuration
#[derive(Debug, Clone)]
pub struct SledConfig {
    /// Database path
    pub path: PathBuf,

    /// Page cache size in megabytes
    pub cache_mb: u64,

    /// Background flush interval; `None` flushes only on demand
    pub flush_every_ms: Option<u64>,
}

impl Default for SledConfig {
    fn default() -> Self {
        SledConfig {
            path: PathBuf::from("./data/trustmesh"),
            cache_mb: 4,
            flush_every_ms: Some(1000),
        }
    }
}

pub struct SledRepository {
    db: sled::Db,
    edges: sled::Tree,
    revocations: sled::Tree,
    scores: sled::Tree,
}

impl std::fmt::Debug for SledRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SledRepository")
            .field("edges", &self.edges.len())
            .field("revocations", &self.revocations.len())
            .field("scores", &self.scores.len())
            .finish()
    }
}

impl SledRepository {
    /// Open or create a repository at `path` with default settings
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_config(SledConfig {
            path: path.as_ref().to_path_buf(),
            ..Default::default()
        })
    }

    pub fn open_with_config(config: SledConfig) -> Result<Self> {
        let db = sled::Config::new()
            .path(&config.path)
            .cache_capacity(config.cache_mb * 1024 * 1024)
            .mode(sled::Mode::LowSpace)
            .flush_every_ms(config.flush_every_ms)
            .open()?;

        let edges = db.open_tree(EDGES_TREE)?;
        let revocations = db.open_tree(REVOCATIONS_TREE)?;
        let scores = db.open_tree(SCORES_TREE)?;

        debug!(
            path = %config.path.display(),
            edges = edges.len(),
            scores = scores.len(),
            "Opened sled repository"
        );

        Ok(Self {
            db,
            edges,
            revocations,
            scores,
        })
    }

    /// Flush dirty pages to disk
    pub fn flush(&self) -> Result<usize> {
        Ok(self.db.flush()?)
    }
}

fn storage_err(err: sled::Error) -> CoreError {
    CoreError::persistence(err.to_string())
}

fn put<T: serde::Serialize>(tree: &sled::Tree, key: &[u8], value: &T) -> trustmesh_core::Result<()> {
    let bytes = bincode::serialize(value)?;
    tree.insert(key, bytes).map_err(storage_err)?;
    Ok(())
}

fn get<T: DeserializeOwned>(tree: &sled::Tree, key: &[u8]) -> trustmesh_core::Result<Option<T>> {
    match tree.get(key).map_err(storage_err)? {
        Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
        None => Ok(None),
    }
}

fn load_all<T: DeserializeOwned>(tree: &sled::Tree) -> trustmesh_core::Result<Vec<T>> {
    let mut out = Vec::with_capacity(tree.len());
    for item in tree.iter() {
        let (_, bytes) = item.map_err(storage_err)?;
        out.push(bincode::deserialize(&bytes)?);
    }
    Ok(out)
}

impl EdgeRepository for SledRepository {
    fn put_edge(&self, edge: &SignedEdge) -> trustmesh_core::Result<()> {
        put(&self.edges, &edge_key(edge.edge.from, edge.edge.to), edge)
    }

    fn get_edge(&self, from: NodeId, to: NodeId) -> trustmesh_core::Result<Option<SignedEdge>> {
        get(&self.edges, &edge_key(from, to))
    }

    fn delete_edge(&self, from: NodeId, to: NodeId) -> trustmesh_core::Result<()> {
        self.edges.remove(edge_key(from, to)).map_err(storage_err)?;
        Ok(())
    }

    fn load_edges(&self) -> trustmesh_core::Result<Vec<SignedEdge>> {
        load_all(&self.edges)
    }

    fn put_revocation(&self, revocation: &Revocation) -> trustmesh_core::Result<()> {
        put(
            &self.revocations,
            &edge_key(revocation.from, revocation.to),
            revocation,
        )
    }

    fn delete_revocation(&self, from: NodeId, to: NodeId) -> trustmesh_core::Result<()> {
        self.revocations
            .remove(edge_key(from, to))
            .map_err(storage_err)?;
        Ok(())
    }

    fn load_revocations(&self) -> trustmesh_core::Result<Vec<Revocation>> {
        load_all(&self.revocations)
    }
}

impl ScoreRepository for SledRepository {
    fn put_score(&self, score: &ReputationScore) -> trustmesh_core::Result<()> {
        put(&self.scores, &score.node.as_u32().to_be_bytes(), score)
    }

    fn get_score(&self, node: NodeId) -> trustmesh_core::Result<Option<ReputationScore>> {
        get(&self.scores, &node.as_u32().to_be_bytes())
    }

    fn load_scores(&self) -> trustmesh_core::Result<Vec<ReputationScore>> {
        load_all(&self.scores)
    }

    fn sync(&self) -> trustmesh_core::Result<()> {
        self.db.flush().map_err(storage_err)?;
        Ok(())
    }
}
