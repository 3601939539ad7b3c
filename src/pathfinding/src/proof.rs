//! Proof-of-Path bundles
//!
//! A found path packaged with each hop's edge signature, an issue timestamp and
//! an entropy stamp, then signed by the sender over the canonical body bytes
//! (bincode of everything but the bundle signature). The proof id is the
//! BLAKE3 hash of those body bytes.

use crate::astar::TrustPath;
use crate::error::{PathError, Result};
use serde::{Deserialize, Serialize};
use trustmesh_core::traits::Signer;
use trustmesh_core::{EntropyStamp, NodeId, SignedEdge, Timestamp};
use trustmesh_crypto::Blake3Hash;
use trustmesh_graph::Graph;

pub const PROOF_VERSION: u8 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProofOfPath {
    pub version: u8,
    pub sender: NodeId,
    pub receiver: NodeId,
    pub hops: Vec<SignedEdge>,
    pub timestamp: Timestamp,
    pub entropy: EntropyStamp,
    /// Sender's signature over [`body_bytes`](Self::body_bytes)
    pub signature: Vec<u8>,
}

/// Signed portion of a proof
#[derive(Serialize)]
struct ProofBody<'a> {
    version: u8,
    sender: NodeId,
    receiver: NodeId,
    hops: &'a [SignedEdge],
    timestamp: Timestamp,
    entropy: EntropyStamp,
}

impl ProofOfPath {
    /// Package `path` with the stored edge signatures and sign it as `signer`.
    ///
    /// The signer must be the path's source.
    pub fn build(
        path: &TrustPath,
        graph: &Graph,
        signer: &dyn Signer,
        timestamp: Timestamp,
        entropy: EntropyStamp,
    ) -> Result<Self> {
        let (Some(sender), Some(receiver)) = (path.source(), path.target()) else {
            return Err(PathError::EmptyPath);
        };
        if path.edges.is_empty() {
            return Err(PathError::EmptyPath);
        }
        if signer.node_id() != sender {
            return Err(PathError::SignerMismatch {
                expected: sender,
                actual: signer.node_id(),
            });
        }

        let hops = path
            .edges
            .iter()
            .map(|edge| {
                graph
                    .signed_edge(edge.from, edge.to)
                    .ok_or(PathError::MissingEdge {
                        from: edge.from,
                        to: edge.to,
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut proof = Self {
            version: PROOF_VERSION,
            sender,
            receiver,
            hops,
            timestamp,
            entropy,
            signature: Vec::new(),
        };
        proof.signature = signer.sign(&proof.body_bytes()?);
        Ok(proof)
    }

    /// Canonical bytes covered by the bundle signature
    pub fn body_bytes(&self) -> Result<Vec<u8>> {
        let body = ProofBody {
            version: self.version,
            sender: self.sender,
            receiver: self.receiver,
            hops: &self.hops,
            timestamp: self.timestamp,
            entropy: self.entropy,
        };
        Ok(bincode::serialize(&body)?)
    }

    /// Content address of the proof
    pub fn id(&self) -> Result<Blake3Hash> {
        Ok(Blake3Hash::hash(&self.body_bytes()?))
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let proof: Self = bincode::deserialize(bytes)?;
        if proof.version != PROOF_VERSION {
            return Err(PathError::UnsupportedVersion(proof.version));
        }
        Ok(proof)
    }

    pub fn hop_count(&self) -> usize {
        self.hops.len()
    }
}
