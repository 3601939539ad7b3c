//! Trust edges
//!
//! A [`RiskEdge`] is a directed assertion from one participant about another.
//! Negative risk is a vouch and positive risk a flagged betrayal signal, so the
//! summed risk along a path behaves as a shortest-path distance and a net
//! negative cycle is a provable contradiction.

use crate::clock::Timestamp;
use crate::error::{CoreError, Result};
use crate::types::node::NodeId;
use serde::{Deserialize, Serialize};

/// Defined trust levels and their risk. Levels 4..=6 and -6..=-4 are unassigned.
const LEVEL_TABLE: [(i8, f64); 9] = [
    (7, -1.0),
    (3, -0.3),
    (2, -0.2),
    (1, -0.1),
    (0, 0.0),
    (-1, 0.1),
    (-2, 0.2),
    (-3, 0.3),
    (-7, 1.0),
];

/// Risk for a discrete trust level, `None` when the level has no defined mapping
pub fn risk_for_level(level: i8) -> Option<f64> {
    LEVEL_TABLE
        .iter()
        .find(|(l, _)| *l == level)
        .map(|(_, risk)| *risk)
}

/// The defined trust level whose risk is closest to `risk`.
///
/// Ties resolve towards the more trusting level.
pub fn level_for_risk(risk: f64) -> i8 {
    let mut best = LEVEL_TABLE[0];
    for entry in LEVEL_TABLE.iter().skip(1) {
        if (entry.1 - risk).abs() < (best.1 - risk).abs() {
            best = *entry;
        }
    }
    best.0
}

/// Directed trust edge
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskEdge {
    pub from: NodeId,
    pub to: NodeId,
    /// Risk in [-1.0, 1.0]
    pub risk: f64,
    /// Issue time (ns)
    pub timestamp: Timestamp,
    /// Assertion counter; a higher nonce supersedes a lower one for the same key
    pub nonce: u64,
    /// Discrete trust grade
    pub level: i8,
    /// Expiry (ns); the edge counts as absent once `now > expires_at`
    pub expires_at: Timestamp,
}

impl RiskEdge {
    /// Create an edge from a continuous risk. The level is the closest defined grade.
    pub fn new(
        from: NodeId,
        to: NodeId,
        risk: f64,
        timestamp: Timestamp,
        expires_at: Timestamp,
    ) -> Result<Self> {
        let edge = Self {
            from,
            to,
            risk,
            timestamp,
            nonce: 0,
            level: level_for_risk(risk),
            expires_at,
        };
        edge.validate()?;
        Ok(edge)
    }

    /// Create an edge from a discrete trust level using the level table
    pub fn from_level(
        from: NodeId,
        to: NodeId,
        level: i8,
        timestamp: Timestamp,
        expires_at: Timestamp,
    ) -> Result<Self> {
        let risk = risk_for_level(level).ok_or(CoreError::UnknownTrustLevel(level))?;
        let edge = Self {
            from,
            to,
            risk,
            timestamp,
            nonce: 0,
            level,
            expires_at,
        };
        edge.validate()?;
        Ok(edge)
    }

    pub fn with_nonce(mut self, nonce: u64) -> Self {
        self.nonce = nonce;
        self
    }

    /// Check the edge invariants.
    ///
    /// The level must be a defined grade and the one the risk maps to.
    pub fn validate(&self) -> Result<()> {
        if !self.risk.is_finite() || !(-1.0..=1.0).contains(&self.risk) {
            return Err(CoreError::InvalidRisk(self.risk));
        }
        if self.expires_at < self.timestamp {
            return Err(CoreError::InvalidExpiry {
                timestamp: self.timestamp,
                expires_at: self.expires_at,
            });
        }
        if self.from == self.to {
            return Err(CoreError::SelfEdge(self.from.as_u32()));
        }
        if risk_for_level(self.level).is_none() {
            return Err(CoreError::UnknownTrustLevel(self.level));
        }
        if level_for_risk(self.risk) != self.level {
            return Err(CoreError::LevelMismatch {
                level: self.level,
                risk: self.risk,
            });
        }
        Ok(())
    }

    pub fn key(&self) -> (NodeId, NodeId) {
        (self.from, self.to)
    }

    pub fn is_expired(&self, now: Timestamp) -> bool {
        now > self.expires_at
    }

    /// Fixed little-endian layout covered by the asserting party's signature
    pub fn signing_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(41);
        bytes.extend_from_slice(&self.from.to_le_bytes());
        bytes.extend_from_slice(&self.to.to_le_bytes());
        bytes.extend_from_slice(&self.risk.to_bits().to_le_bytes());
        bytes.extend_from_slice(&self.timestamp.to_le_bytes());
        bytes.extend_from_slice(&self.nonce.to_le_bytes());
        bytes.push(self.level as u8);
        bytes.extend_from_slice(&self.expires_at.to_le_bytes());
        bytes
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Decode and validate an edge
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let edge: Self = bincode::deserialize(bytes)?;
        edge.validate()?;
        Ok(edge)
    }
}

/// Edge plus the signature of the asserting party (`edge.from`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedEdge {
    pub edge: RiskEdge,
    pub signature: Vec<u8>,
}

impl SignedEdge {
    pub fn new(edge: RiskEdge, signature: Vec<u8>) -> Self {
        Self { edge, signature }
    }

    /// Edge without a signature, for locally observed assertions
    pub fn unsigned(edge: RiskEdge) -> Self {
        Self {
            edge,
            signature: Vec::new(),
        }
    }

    pub fn is_signed(&self) -> bool {
        !self.signature.is_empty()
    }
}

/// Audit record for an explicitly removed edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revocation {
    pub from: NodeId,
    pub to: NodeId,
    /// Nonce of the edge that was removed
    pub nonce: u64,
    pub revoked_at: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(risk: f64) -> RiskEdge {
        RiskEdge::new(NodeId(1), NodeId(2), risk, 100, 200).unwrap()
    }

    #[test]
    fn test_level_table() {
        assert_eq!(risk_for_level(7), Some(-1.0));
        assert_eq!(risk_for_level(3), Some(-0.3));
        assert_eq!(risk_for_level(0), Some(0.0));
        assert_eq!(risk_for_level(-3), Some(0.3));
        assert_eq!(risk_for_level(-7), Some(1.0));
        assert_eq!(risk_for_level(5), None);
        assert_eq!(risk_for_level(-4), None);
    }

    #[test]
    fn test_level_for_risk() {
        assert_eq!(level_for_risk(-1.0), 7);
        assert_eq!(level_for_risk(-0.8), 7);
        assert_eq!(level_for_risk(-0.3), 3);
        assert_eq!(level_for_risk(0.0), 0);
        assert_eq!(level_for_risk(0.2), -2);
        assert_eq!(level_for_risk(0.9), -7);
    }

    #[test]
    fn test_edge_validation() {
        assert!(RiskEdge::new(NodeId(1), NodeId(2), 1.5, 0, 10).is_err());
        assert!(RiskEdge::new(NodeId(1), NodeId(2), f64::NAN, 0, 10).is_err());
        assert!(matches!(
            RiskEdge::new(NodeId(1), NodeId(2), 0.1, 10, 5),
            Err(CoreError::InvalidExpiry { .. })
        ));
        assert!(matches!(
            RiskEdge::new(NodeId(1), NodeId(1), 0.1, 0, 5),
            Err(CoreError::SelfEdge(1))
        ));
        assert!(matches!(
            RiskEdge::from_level(NodeId(1), NodeId(2), 5, 0, 5),
            Err(CoreError::UnknownTrustLevel(5))
        ));
    }

    #[test]
    fn test_decoded_level_must_match_risk() {
        let mut undefined = edge(0.0);
        undefined.level = 5;
        assert!(matches!(
            RiskEdge::from_bytes(&undefined.to_bytes().unwrap()),
            Err(CoreError::UnknownTrustLevel(5))
        ));

        let mut mismatched = edge(0.9);
        mismatched.level = 7;
        assert!(matches!(
            mismatched.validate(),
            Err(CoreError::LevelMismatch { level: 7, .. })
        ));

        for level in [7, 3, 2, 1, 0, -1, -2, -3, -7] {
            assert!(RiskEdge::from_level(NodeId(1), NodeId(2), level, 0, 5).is_ok());
        }
    }

    #[test]
    fn test_edge_expiry() {
        let e = edge(0.1);
        assert!(!e.is_expired(150));
        assert!(!e.is_expired(200));
        assert!(e.is_expired(201));
    }

    #[test]
    fn test_edge_roundtrip() {
        let e = edge(-0.35).with_nonce(9);
        let decoded = RiskEdge::from_bytes(&e.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded, e);
    }

    #[test]
    fn test_signing_bytes_layout() {
        let e = edge(0.5).with_nonce(3);
        let bytes = e.signing_bytes();
        assert_eq!(bytes.len(), 41);
        assert_eq!(&bytes[0..4], &[1, 0, 0, 0]);
        assert_eq!(&bytes[4..8], &[2, 0, 0, 0]);
        assert_eq!(&bytes[8..16], &0.5f64.to_bits().to_le_bytes());
        assert_eq!(&bytes[24..32], &3u64.to_le_bytes());
    }

    #[test]
    fn test_signing_bytes_change_with_nonce() {
        let e = edge(0.5);
        assert_ne!(e.signing_bytes(), e.with_nonce(1).signing_bytes());
    }
}
