//! Entropy stamps
//!
//! Gossip messages and path proofs carry an entropy stamp: a nanosecond epoch
//! plus a random salt. Freshness checks compare epochs only.

use crate::clock::Timestamp;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntropyStamp {
    pub epoch: Timestamp,
    pub salt: u64,
}

impl EntropyStamp {
    pub fn new(epoch: Timestamp, salt: u64) -> Self {
        Self { epoch, salt }
    }

    /// `epoch LE | salt LE`
    pub fn to_bytes(&self) -> [u8; 16] {
        let mut bytes = [0u8; 16];
        bytes[..8].copy_from_slice(&self.epoch.to_le_bytes());
        bytes[8..].copy_from_slice(&self.salt.to_le_bytes());
        bytes
    }

    /// True when this stamp is older than `reference - window`
    pub fn is_stale(&self, reference: Timestamp, window: u64) -> bool {
        self.epoch < reference.saturating_sub(window)
    }
}
