//! Error types for detection

use thiserror::Error;
use trustmesh_core::NodeId;

pub type Result<T> = std::result::Result<T, DetectionError>;

/// Structural problems in cycle evidence bytes
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvidenceError {
    #[error("Evidence truncated: need {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("Unsupported evidence version: {0}")]
    UnknownVersion(u8),

    #[error("Evidence describes an empty cycle")]
    EmptyCycle,

    #[error("Evidence has {0} trailing bytes")]
    TrailingBytes(usize),

    #[error("Invalid risk {risk} at position {index}")]
    InvalidRisk { index: usize, risk: f64 },

    #[error("Evidence does not start at the smallest node")]
    NotCanonical,

    #[error("Node {0} appears more than once in the cycle")]
    RepeatedNode(NodeId),
}

#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("Evidence error: {0}")]
    Evidence(#[from] EvidenceError),

    #[error("No cycle evidence for {0}")]
    NoEvidence(NodeId),

    #[error("Malformed slash signal: {0}")]
    MalformedSignal(String),

    #[error("Graph error: {0}")]
    Graph(#[from] trustmesh_graph::GraphError),
}
