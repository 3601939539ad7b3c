//! Anomaly scores surfaced to the enforcement layer

use crate::error::{CoreError, Result};
use crate::types::node::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Scores at or above this are critical
pub const CRITICAL_THRESHOLD: f64 = 0.9;

/// Scores at or above this raise an alert
pub const ALERT_THRESHOLD: f64 = 0.7;

/// Why a node was flagged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnomalyReason {
    None,
    /// Member of a reachable negative-risk cycle
    NegativeCycle,
    /// Local gossip coverage stayed below threshold (possible eclipse)
    LowCoverage,
    /// Belief propagation placed the node well below the prior
    BeliefDivergence,
}

impl AnomalyReason {
    /// Stable wire code
    pub fn code(&self) -> u8 {
        match self {
            AnomalyReason::None => 0,
            AnomalyReason::NegativeCycle => 1,
            AnomalyReason::LowCoverage => 2,
            AnomalyReason::BeliefDivergence => 3,
        }
    }

    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            0 => Ok(AnomalyReason::None),
            1 => Ok(AnomalyReason::NegativeCycle),
            2 => Ok(AnomalyReason::LowCoverage),
            3 => Ok(AnomalyReason::BeliefDivergence),
            other => Err(CoreError::UnknownCode(other)),
        }
    }
}

impl fmt::Display for AnomalyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AnomalyReason::None => "none",
            AnomalyReason::NegativeCycle => "negative-cycle",
            AnomalyReason::LowCoverage => "low-coverage",
            AnomalyReason::BeliefDivergence => "belief-divergence",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnomalyScore {
    pub node: NodeId,
    /// Score in [0, 1]
    pub score: f64,
    pub reason: AnomalyReason,
}

impl AnomalyScore {
    /// Create a score, clamping into [0, 1]. NaN becomes 0.
    pub fn new(node: NodeId, score: f64, reason: AnomalyReason) -> Self {
        let score = if score.is_nan() { 0.0 } else { score.clamp(0.0, 1.0) };
        Self { node, score, reason }
    }

    pub fn none(node: NodeId) -> Self {
        Self::new(node, 0.0, AnomalyReason::None)
    }

    pub fn is_critical(&self) -> bool {
        self.score >= CRITICAL_THRESHOLD
    }

    pub fn is_alert(&self) -> bool {
        self.score >= ALERT_THRESHOLD
    }
}
