//! Gossip messages
//!
//! A message id is a content address over the sender, the entropy stamp and
//! the payload bytes (bincode of [`GossipPayload`]):
//!
//! ```text
//! id = BLAKE3(u32 sender LE | u64 epoch LE | u64 salt LE | payload)
//! ```
//!
//! References name earlier messages and are not part of the id.

use crate::error::{GossipError, Result};
use serde::{Deserialize, Serialize};
use trustmesh_core::{EntropyStamp, NodeId, SignedEdge};
use trustmesh_crypto::Blake3Hash;

pub type MessageId = Blake3Hash;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageType {
    EdgeAssertion,
    Revocation,
    Heartbeat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GossipPayload {
    /// A new or updated trust edge, signed by its `from` party
    EdgeAssertion(SignedEdge),
    /// Withdrawal of an edge by its `from` party
    Revocation { from: NodeId, to: NodeId, nonce: u64 },
    /// Liveness only
    Heartbeat,
}

impl GossipPayload {
    pub fn message_type(&self) -> MessageType {
        match self {
            GossipPayload::EdgeAssertion(_) => MessageType::EdgeAssertion,
            GossipPayload::Revocation { .. } => MessageType::Revocation,
            GossipPayload::Heartbeat => MessageType::Heartbeat,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GossipMessage {
    pub id: MessageId,
    pub sender: NodeId,
    pub references: Vec<MessageId>,
    pub entropy: EntropyStamp,
    pub payload: GossipPayload,
}

impl GossipMessage {
    pub fn new(
        sender: NodeId,
        references: Vec<MessageId>,
        entropy: EntropyStamp,
        payload: GossipPayload,
    ) -> Result<Self> {
        let id = Self::compute_id(sender, &entropy, &payload)?;
        Ok(Self {
            id,
            sender,
            references,
            entropy,
            payload,
        })
    }

    pub fn compute_id(sender: NodeId, entropy: &EntropyStamp, payload: &GossipPayload) -> Result<MessageId> {
        let payload = payload.to_bytes()?;
        Ok(Blake3Hash::hash_parts(&[
            &sender.to_le_bytes(),
            &entropy.epoch.to_le_bytes(),
            &entropy.salt.to_le_bytes(),
            &payload,
        ]))
    }

    pub fn message_type(&self) -> MessageType {
        self.payload.message_type()
    }

    /// Check that `id` matches the content
    pub fn verify_id(&self) -> Result<()> {
        let computed = Self::compute_id(self.sender, &self.entropy, &self.payload)?;
        if computed != self.id {
            return Err(GossipError::IdMismatch {
                claimed: self.id,
                computed,
            });
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Decode and check the id against the content
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let message: Self = bincode::deserialize(bytes)?;
        message.verify_id()?;
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trustmesh_core::RiskEdge;

    fn assertion() -> GossipPayload {
        let edge = RiskEdge::new(NodeId(1), NodeId(2), -0.3, 5, 50).unwrap();
        GossipPayload::EdgeAssertion(SignedEdge::new(edge, vec![7; 64]))
    }

    #[test]
    fn test_id_is_pure_function_of_content() {
        let stamp = EntropyStamp::new(100, 9);
        let a = GossipMessage::new(NodeId(1), vec![], stamp, assertion()).unwrap();
        let b = GossipMessage::new(NodeId(1), vec![Blake3Hash::hash(b"ref")], stamp, assertion()).unwrap();
        assert_eq!(a.id, b.id);

        let other_salt = GossipMessage::new(NodeId(1), vec![], EntropyStamp::new(100, 10), assertion()).unwrap();
        assert_ne!(a.id, other_salt.id);

        let other_sender = GossipMessage::new(NodeId(2), vec![], stamp, assertion()).unwrap();
        assert_ne!(a.id, other_sender.id);
    }

    #[test]
    fn test_id_layout() {
        let stamp = EntropyStamp::new(0x0102, 0x0304);
        let message = GossipMessage::new(NodeId(5), vec![], stamp, GossipPayload::Heartbeat).unwrap();

        let mut preimage = Vec::new();
        preimage.extend_from_slice(&5u32.to_le_bytes());
        preimage.extend_from_slice(&0x0102u64.to_le_bytes());
        preimage.extend_from_slice(&0x0304u64.to_le_bytes());
        // bincode encodes the Heartbeat variant as its u32 index
        preimage.extend_from_slice(&2u32.to_le_bytes());
        assert_eq!(message.id, Blake3Hash::hash(&preimage));
    }

    #[test]
    fn test_bytes_roundtrip_and_tamper() {
        let message = GossipMessage::new(
            NodeId(1),
            vec![Blake3Hash::hash(b"parent")],
            EntropyStamp::new(100, 9),
            GossipPayload::Revocation {
                from: NodeId(1),
                to: NodeId(2),
                nonce: 3,
            },
        )
        .unwrap();

        let decoded = GossipMessage::from_bytes(&message.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded, message);
        assert_eq!(decoded.message_type(), MessageType::Revocation);

        let mut tampered = message.clone();
        tampered.sender = NodeId(9);
        let err = GossipMessage::from_bytes(&tampered.to_bytes().unwrap());
        assert!(matches!(err, Err(GossipError::IdMismatch { .. })));

        assert!(matches!(GossipMessage::from_bytes(&[1, 2]), Err(GossipError::Malformed(_))));
    }
}
