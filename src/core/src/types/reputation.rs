//! Reputation record

use crate::clock::Timestamp;
use crate::types::node::NodeId;
use serde::{Deserialize, Serialize};

/// Neutral prior for nodes without history
pub const NEUTRAL_SCORE: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReputationScore {
    pub node: NodeId,
    /// Score in [0, 1]
    pub score: f64,
    pub total_checks: u64,
    pub successful_checks: u64,
    /// Time of the last verification (ns)
    pub last_verified: Timestamp,
}

impl ReputationScore {
    /// Fresh record at the neutral prior
    pub fn new(node: NodeId, now: Timestamp) -> Self {
        Self {
            node,
            score: NEUTRAL_SCORE,
            total_checks: 0,
            successful_checks: 0,
            last_verified: now,
        }
    }

    pub fn success_rate(&self) -> f64 {
        if self.total_checks == 0 {
            return NEUTRAL_SCORE;
        }
        self.successful_checks as f64 / self.total_checks as f64
    }
}
