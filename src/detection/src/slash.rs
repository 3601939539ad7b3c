//! Slash signals
//!
//! Fixed 82-byte accusation record handed to the enforcement layer, which
//! signs and broadcasts it. Layout:
//!
//! ```text
//! [0..32)   target DID
//! [32]      reason code
//! [33..65)  evidence hash (SHA3-256 of the cycle evidence)
//! [65..73)  timestamp, u64 LE (ns)
//! [73..81)  nonce, u64 LE
//! [81]      severity (score as a percentage, 0..=100)
//! ```

use crate::error::{DetectionError, Result};
use crate::evidence::CycleEvidence;
use trustmesh_core::{AnomalyReason, AnomalyScore, Timestamp};
use trustmesh_crypto::Did;

pub const SLASH_SIGNAL_LEN: usize = 82;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlashSignal {
    pub target: Did,
    pub reason: AnomalyReason,
    pub evidence_hash: [u8; 32],
    pub timestamp: Timestamp,
    pub nonce: u64,
    pub severity: u8,
}

impl SlashSignal {
    /// Accuse `target` of membership in the cycle described by `evidence`
    pub fn for_cycle(
        target: Did,
        evidence: &CycleEvidence,
        anomaly: &AnomalyScore,
        timestamp: Timestamp,
        nonce: u64,
    ) -> Self {
        Self {
            target,
            reason: AnomalyReason::NegativeCycle,
            evidence_hash: evidence.digest(),
            timestamp,
            nonce,
            severity: Self::severity_for(anomaly.score),
        }
    }

    pub fn severity_for(score: f64) -> u8 {
        (score.clamp(0.0, 1.0) * 100.0).round() as u8
    }

    pub fn to_bytes(&self) -> [u8; SLASH_SIGNAL_LEN] {
        let mut out = [0u8; SLASH_SIGNAL_LEN];
        out[0..32].copy_from_slice(self.target.as_bytes());
        out[32] = self.reason.code();
        out[33..65].copy_from_slice(&self.evidence_hash);
        out[65..73].copy_from_slice(&self.timestamp.to_le_bytes());
        out[73..81].copy_from_slice(&self.nonce.to_le_bytes());
        out[81] = self.severity;
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != SLASH_SIGNAL_LEN {
            return Err(DetectionError::MalformedSignal(format!(
                "expected {} bytes, got {}",
                SLASH_SIGNAL_LEN,
                bytes.len()
            )));
        }

        let mut target = [0u8; 32];
        target.copy_from_slice(&bytes[0..32]);
        let reason = AnomalyReason::from_code(bytes[32])
            .map_err(|e| DetectionError::MalformedSignal(e.to_string()))?;
        let mut evidence_hash = [0u8; 32];
        evidence_hash.copy_from_slice(&bytes[33..65]);
        let mut timestamp = [0u8; 8];
        timestamp.copy_from_slice(&bytes[65..73]);
        let mut nonce = [0u8; 8];
        nonce.copy_from_slice(&bytes[73..81]);

        if bytes[81] > 100 {
            return Err(DetectionError::MalformedSignal(format!(
                "severity {} out of range",
                bytes[81]
            )));
        }

        Ok(Self {
            target: Did(target),
            reason,
            evidence_hash,
            timestamp: u64::from_le_bytes(timestamp),
            nonce: u64::from_le_bytes(nonce),
            severity: bytes[81],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trustmesh_core::NodeId;

    #[test]
    fn test_slash_signal_layout() {
        let signal = SlashSignal {
            target: Did([1u8; 32]),
            reason: AnomalyReason::NegativeCycle,
            evidence_hash: [0xFA; 32],
            timestamp: 5,
            nonce: 9,
            severity: 80,
        };
        let bytes = signal.to_bytes();

        assert_eq!(bytes.len(), 82);
        assert_eq!(bytes[0], 1);
        assert_eq!(bytes[32], 1);
        assert_eq!(bytes[33], 0xFA);
        assert_eq!(bytes[65], 5);
        assert_eq!(bytes[73], 9);
        assert_eq!(bytes[81], 80);
        assert_eq!(SlashSignal::from_bytes(&bytes).unwrap(), signal);
    }

    #[test]
    fn test_for_cycle_hashes_evidence() {
        let evidence = CycleEvidence::new(vec![(NodeId(0), 0.2), (NodeId(1), -0.8)]).unwrap();
        let anomaly = AnomalyScore::new(NodeId(0), 0.4, AnomalyReason::NegativeCycle);
        let signal = SlashSignal::for_cycle(Did([3u8; 32]), &evidence, &anomaly, 10, 1);

        assert_eq!(signal.evidence_hash, evidence.digest());
        assert_eq!(signal.severity, 40);
    }

    #[test]
    fn test_from_bytes_rejects_malformed() {
        assert!(SlashSignal::from_bytes(&[0u8; 81]).is_err());

        let mut bytes = [0u8; 82];
        bytes[32] = 7;
        assert!(SlashSignal::from_bytes(&bytes).is_err());

        bytes[32] = 1;
        bytes[81] = 200;
        assert!(SlashSignal::from_bytes(&bytes).is_err());
    }
}
