//! Signing and verification capability

use crate::error::Result;
use crate::types::NodeId;

/// Signs on behalf of one participant
pub trait Signer: Send + Sync {
    /// Participant this signer speaks for
    fn node_id(&self) -> NodeId;

    fn sign(&self, message: &[u8]) -> Vec<u8>;
}

/// Verifies signatures attributed to participants
pub trait SignatureVerifier: Send + Sync {
    /// Verify `signature` over `message` as produced by `signer`.
    ///
    /// Unknown signers and bad signatures are both errors.
    fn verify(&self, signer: NodeId, message: &[u8], signature: &[u8]) -> Result<()>;
}
