//! Engine error types

use thiserror::Error;
use trustmesh_core::{CoreError, NodeId};
use trustmesh_crypto::CryptoError;
use trustmesh_detection::DetectionError;
use trustmesh_gossip::GossipError;
use trustmesh_graph::GraphError;
use trustmesh_pathfinding::PathError;
use trustmesh_reputation::ReputationError;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),

    /// An assertion or revocation older than what the graph already holds
    #[error("Stale update for {from} -> {to}: nonce {nonce} does not supersede {stored}")]
    StaleNonce {
        from: NodeId,
        to: NodeId,
        nonce: u64,
        stored: u64,
    },

    /// Revocations are only accepted from the party that asserted the edge
    #[error("Node {sender} cannot revoke edge {from} -> {to}")]
    UnauthorizedRevocation { sender: NodeId, from: NodeId, to: NodeId },

    #[error("Engine service has stopped")]
    ServiceClosed,

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Identity error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Detection error: {0}")]
    Detection(#[from] DetectionError),

    #[error("Reputation error: {0}")]
    Reputation(#[from] ReputationError),

    #[error("Path error: {0}")]
    Path(#[from] PathError),

    #[error("Gossip error: {0}")]
    Gossip(#[from] GossipError),

    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error(transparent)]
    Core(#[from] CoreError),
}
