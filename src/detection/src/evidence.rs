//! Cycle evidence
//!
//! Canonical byte encoding of a betrayal cycle, little-endian:
//!
//! ```text
//! u8  version (= 1)
//! u32 length
//! length × { u32 node, u64 risk (f64 bits) }
//! ```
//!
//! Each pair holds a cycle member and the risk of the edge leaving it towards
//! the next member. The first pair is the numerically smallest node, so a cycle
//! encodes to the same bytes whichever member it was discovered from.

use crate::error::EvidenceError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use trustmesh_core::NodeId;
use trustmesh_crypto::Sha3Hash256;

pub const EVIDENCE_VERSION: u8 = 1;

const HEADER_LEN: usize = 5;
const PAIR_LEN: usize = 12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleEvidence {
    members: Vec<(NodeId, f64)>,
}

impl CycleEvidence {
    /// Canonicalise a cycle given in forward order.
    ///
    /// Rotates so the smallest node leads; member order is otherwise kept.
    pub fn new(cycle: Vec<(NodeId, f64)>) -> Result<Self, EvidenceError> {
        Self::check_members(&cycle)?;

        let start = cycle
            .iter()
            .enumerate()
            .min_by_key(|(_, (node, _))| *node)
            .map(|(i, _)| i)
            .unwrap_or(0);

        let mut members = cycle;
        members.rotate_left(start);
        Ok(Self { members })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_LEN + PAIR_LEN * self.members.len());
        bytes.push(EVIDENCE_VERSION);
        bytes.extend_from_slice(&(self.members.len() as u32).to_le_bytes());
        for (node, risk) in &self.members {
            bytes.extend_from_slice(&node.to_le_bytes());
            bytes.extend_from_slice(&risk.to_bits().to_le_bytes());
        }
        bytes
    }

    /// Decode canonical evidence, rejecting anything not produced by [`encode`](Self::encode)
    pub fn decode(bytes: &[u8]) -> Result<Self, EvidenceError> {
        if bytes.len() < HEADER_LEN {
            return Err(EvidenceError::Truncated {
                expected: HEADER_LEN,
                actual: bytes.len(),
            });
        }
        if bytes[0] != EVIDENCE_VERSION {
            return Err(EvidenceError::UnknownVersion(bytes[0]));
        }

        let len = u32::from_le_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]) as usize;
        if len == 0 {
            return Err(EvidenceError::EmptyCycle);
        }

        let expected = len
            .checked_mul(PAIR_LEN)
            .and_then(|n| n.checked_add(HEADER_LEN))
            .unwrap_or(usize::MAX);
        if bytes.len() < expected {
            return Err(EvidenceError::Truncated {
                expected,
                actual: bytes.len(),
            });
        }
        if bytes.len() > expected {
            return Err(EvidenceError::TrailingBytes(bytes.len() - expected));
        }

        let members: Vec<(NodeId, f64)> = bytes[HEADER_LEN..]
            .chunks_exact(PAIR_LEN)
            .map(|chunk| {
                let mut node = [0u8; 4];
                let mut risk = [0u8; 8];
                node.copy_from_slice(&chunk[..4]);
                risk.copy_from_slice(&chunk[4..]);
                (
                    NodeId(u32::from_le_bytes(node)),
                    f64::from_bits(u64::from_le_bytes(risk)),
                )
            })
            .collect();

        Self::check_members(&members)?;
        if members.iter().skip(1).any(|(node, _)| *node < members[0].0) {
            return Err(EvidenceError::NotCanonical);
        }

        Ok(Self { members })
    }

    /// SHA3-256 of the canonical encoding
    pub fn digest(&self) -> [u8; 32] {
        *Sha3Hash256::hash(&self.encode()).as_bytes()
    }

    pub fn members(&self) -> &[(NodeId, f64)] {
        &self.members
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.members.iter().map(|(node, _)| *node)
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.members.iter().any(|(n, _)| *n == node)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Summed risk around the cycle; negative for a genuine betrayal cycle
    pub fn total_risk(&self) -> f64 {
        self.members.iter().map(|(_, risk)| risk).sum()
    }

    fn check_members(members: &[(NodeId, f64)]) -> Result<(), EvidenceError> {
        if members.is_empty() {
            return Err(EvidenceError::EmptyCycle);
        }
        let mut seen = HashSet::with_capacity(members.len());
        for (index, (node, risk)) in members.iter().enumerate() {
            if !risk.is_finite() || !(-1.0..=1.0).contains(risk) {
                return Err(EvidenceError::InvalidRisk { index, risk: *risk });
            }
            if !seen.insert(*node) {
                return Err(EvidenceError::RepeatedNode(*node));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring() -> Vec<(NodeId, f64)> {
        vec![(NodeId(0), 0.2), (NodeId(1), 0.2), (NodeId(2), -0.8)]
    }

    #[test]
    fn test_rotation_independent_encoding() {
        let a = CycleEvidence::new(ring()).unwrap();
        let mut rotated = ring();
        rotated.rotate_left(2);
        let b = CycleEvidence::new(rotated).unwrap();

        assert_eq!(a.encode(), b.encode());
        assert_eq!(a.digest(), b.digest());
        assert_eq!(a.members()[0].0, NodeId(0));
    }

    #[test]
    fn test_encoding_layout() {
        let evidence = CycleEvidence::new(vec![(NodeId(9), -0.5), (NodeId(4), 0.25)]).unwrap();
        let bytes = evidence.encode();

        assert_eq!(bytes.len(), 5 + 2 * 12);
        assert_eq!(bytes[0], 1);
        assert_eq!(&bytes[1..5], &2u32.to_le_bytes());
        assert_eq!(&bytes[5..9], &4u32.to_le_bytes());
        assert_eq!(&bytes[9..17], &0.25f64.to_bits().to_le_bytes());
        assert_eq!(&bytes[17..21], &9u32.to_le_bytes());
    }

    #[test]
    fn test_decode_roundtrip() {
        let evidence = CycleEvidence::new(ring()).unwrap();
        let decoded = CycleEvidence::decode(&evidence.encode()).unwrap();
        assert_eq!(decoded, evidence);
        assert!((decoded.total_risk() + 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_decode_rejects_malformed() {
        let bytes = CycleEvidence::new(ring()).unwrap().encode();

        assert!(matches!(
            CycleEvidence::decode(&bytes[..3]),
            Err(EvidenceError::Truncated { expected: 5, actual: 3 })
        ));
        assert!(matches!(
            CycleEvidence::decode(&bytes[..bytes.len() - 1]),
            Err(EvidenceError::Truncated { .. })
        ));

        let mut versioned = bytes.clone();
        versioned[0] = 2;
        assert_eq!(CycleEvidence::decode(&versioned), Err(EvidenceError::UnknownVersion(2)));

        let mut trailing = bytes.clone();
        trailing.push(0);
        assert_eq!(CycleEvidence::decode(&trailing), Err(EvidenceError::TrailingBytes(1)));

        assert_eq!(
            CycleEvidence::decode(&[1, 0, 0, 0, 0]),
            Err(EvidenceError::EmptyCycle)
        );
    }

    #[test]
    fn test_decode_rejects_bad_risk() {
        let mut bytes = CycleEvidence::new(ring()).unwrap().encode();
        bytes[9..17].copy_from_slice(&f64::NAN.to_bits().to_le_bytes());
        assert!(matches!(
            CycleEvidence::decode(&bytes),
            Err(EvidenceError::InvalidRisk { index: 0, .. })
        ));

        bytes[9..17].copy_from_slice(&1.5f64.to_bits().to_le_bytes());
        assert!(matches!(
            CycleEvidence::decode(&bytes),
            Err(EvidenceError::InvalidRisk { index: 0, .. })
        ));
    }

    #[test]
    fn test_decode_rejects_non_canonical() {
        let mut bytes = CycleEvidence::new(ring()).unwrap().encode();
        // Swap the first node id with the second
        bytes[5..9].copy_from_slice(&5u32.to_le_bytes());
        assert_eq!(CycleEvidence::decode(&bytes), Err(EvidenceError::NotCanonical));
    }

    #[test]
    fn test_new_rejects_repeats() {
        let cycle = vec![(NodeId(1), 0.1), (NodeId(1), -0.5)];
        assert_eq!(
            CycleEvidence::new(cycle),
            Err(EvidenceError::RepeatedNode(NodeId(1)))
        );
    }
}
