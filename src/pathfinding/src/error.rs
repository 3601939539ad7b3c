//! Error types for path search and proofs
//!
//! Search non-findings are outcomes, not errors; see `PathOutcome`.

use thiserror::Error;
use trustmesh_core::{CoreError, NodeId};

#[derive(Error, Debug)]
pub enum PathError {
    #[error("Malformed proof: {0}")]
    Malformed(String),

    #[error("Unsupported proof version: {0}")]
    UnsupportedVersion(u8),

    #[error("Cannot build a proof from an empty path")]
    EmptyPath,

    #[error("Edge {from} -> {to} missing from the graph")]
    MissingEdge { from: NodeId, to: NodeId },

    #[error("Signer {actual} cannot sign for sender {expected}")]
    SignerMismatch { expected: NodeId, actual: NodeId },

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl From<Box<bincode::ErrorKind>> for PathError {
    fn from(err: Box<bincode::ErrorKind>) -> Self {
        PathError::Malformed(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PathError>;
