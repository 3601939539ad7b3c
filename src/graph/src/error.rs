//! Error types for the graph store

use thiserror::Error;
use trustmesh_core::{CoreError, NodeId};

pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("Edge not found: {from} -> {to}")]
    EdgeNotFound { from: NodeId, to: NodeId },

    /// Edge invariant violations and repository failures
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<sled::Error> for GraphError {
    fn from(err: sled::Error) -> Self {
        GraphError::Storage(err.to_string())
    }
}

impl From<Box<bincode::ErrorKind>> for GraphError {
    fn from(err: Box<bincode::ErrorKind>) -> Self {
        GraphError::Serialization(err.to_string())
    }
}

impl From<GraphError> for CoreError {
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::Core(inner) => inner,
            GraphError::EdgeNotFound { from, to } => {
                CoreError::not_found(format!("edge {} -> {}", from, to))
            }
            other => CoreError::persistence(other.to_string()),
        }
    }
}
