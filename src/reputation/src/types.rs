//! Ledger configuration and summaries

use crate::error::{ReputationError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use trustmesh_core::NEUTRAL_SCORE;

/// Configuration for the reputation ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Weight kept from the previous score on each update (default: 0.7)
    pub damping: f64,

    /// Half-life of the lazy time decay (default: 30 days)
    pub half_life: Duration,

    /// Floor for stored and decayed scores (default: 1e-6)
    pub min_score: f64,

    /// Score reported for nodes without history (default: 0.5)
    pub initial_score: f64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            damping: 0.7,
            half_life: Duration::from_secs(30 * 24 * 3600),
            min_score: 1e-6,
            initial_score: NEUTRAL_SCORE,
        }
    }
}

impl LedgerConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.damping) {
            return Err(ReputationError::InvalidConfig(format!(
                "damping {} outside [0, 1]",
                self.damping
            )));
        }
        if self.half_life.is_zero() {
            return Err(ReputationError::InvalidConfig("half_life must be positive".into()));
        }
        if !(self.min_score > 0.0 && self.min_score < 1.0) {
            return Err(ReputationError::InvalidConfig(format!(
                "min_score {} outside (0, 1)",
                self.min_score
            )));
        }
        if !(0.0..=1.0).contains(&self.initial_score) {
            return Err(ReputationError::InvalidConfig(format!(
                "initial_score {} outside [0, 1]",
                self.initial_score
            )));
        }
        Ok(())
    }
}

/// Ledger-wide summary, scores decayed to the time of the call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerStatistics {
    pub tracked_nodes: usize,
    pub total_checks: u64,
    pub successful_checks: u64,
    pub average_score: f64,
    pub highest_score: f64,
    pub lowest_score: f64,
}
