//! Shared data model for the TrustMesh engine

pub mod anomaly;
pub mod edge;
pub mod entropy;
pub mod node;
pub mod reputation;
pub mod verdict;

// Re-export commonly used types
pub use anomaly::{AnomalyReason, AnomalyScore, ALERT_THRESHOLD, CRITICAL_THRESHOLD};
pub use edge::{level_for_risk, risk_for_level, Revocation, RiskEdge, SignedEdge};
pub use entropy::EntropyStamp;
pub use node::NodeId;
pub use reputation::{ReputationScore, NEUTRAL_SCORE};
pub use verdict::PopVerdict;
