//! # TrustMesh Core
//!
//! Shared types, traits, and error handling for the TrustMesh trust-graph engine.
//! Every other crate in the workspace builds on this one, which keeps the
//! algorithm crates free of circular dependencies.
//!
//! ## Module Structure
//!
//! ```text
//! core/
//! ├── types/     - NodeId, RiskEdge, AnomalyScore, ReputationScore, PopVerdict, EntropyStamp
//! ├── traits/    - identity, persistence and transport collaborator seams
//! ├── clock      - injectable time source
//! ├── estimate   - exponentially damped online estimate
//! └── error      - CoreError
//! ```

pub mod clock;
pub mod error;
pub mod estimate;
pub mod traits;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock, Timestamp, NANOS_PER_SEC};
pub use error::{CoreError, Result};
pub use estimate::damped_update;
pub use types::{
    level_for_risk, risk_for_level, AnomalyReason, AnomalyScore, EntropyStamp, NodeId, PopVerdict,
    ReputationScore, Revocation, RiskEdge, SignedEdge, ALERT_THRESHOLD, CRITICAL_THRESHOLD,
    NEUTRAL_SCORE,
};
