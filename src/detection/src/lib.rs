//! # TrustMesh Detection
//!
//! Read-only analyses over the graph store that surface anomalies.
//!
//! ## Features
//!
//! - **Betrayal detection**: Bellman-Ford negative-cycle search with canonical,
//!   hashable cycle evidence
//! - **Belief propagation**: damped loopy message passing that tolerates
//!   partially visible cycles
//! - **Alerts**: prioritised, bounded alert log with broadcast subscription
//! - **Slash signals**: fixed-layout accusation records for the enforcement layer
//!
//! ## Module Structure
//!
//! ```text
//! detection/
//! ├── betrayal   - BetrayalDetector, BetrayalReport
//! ├── evidence   - CycleEvidence wire format
//! ├── belief     - BeliefPropagation, BeliefOutcome
//! ├── alerts     - AlertLog, Alert, AlertPriority
//! └── slash      - SlashSignal
//! ```

pub mod alerts;
pub mod belief;
pub mod betrayal;
pub mod error;
pub mod evidence;
pub mod slash;

pub use alerts::{Alert, AlertLog, AlertPriority};
pub use belief::{BeliefConfig, BeliefOutcome, BeliefPropagation};
pub use betrayal::{BetrayalConfig, BetrayalDetector, BetrayalReport};
pub use error::{DetectionError, EvidenceError, Result};
pub use evidence::CycleEvidence;
pub use slash::SlashSignal;
