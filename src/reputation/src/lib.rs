//! Reputation Ledger for TrustMesh
//!
//! Tracks how often each node's proofs of path verify and turns that into a
//! score in (0, 1]:
//! - **Damped update**: each verification blends the success rate into the
//!   previous score, so one bad actor cannot swing a score in a single step
//! - **Lazy decay**: scores halve every half-life without activity, computed
//!   on read from an injectable clock
//! - **Persistence**: records round-trip through a `ScoreRepository`
//! - **Metrics**: optional Prometheus counters and gauges

pub mod error;
pub mod ledger;
pub mod metrics;
pub mod types;

pub use error::{ReputationError, Result};
pub use ledger::{decay_factor, ReputationLedger};
pub use metrics::LedgerMetrics;
pub use types::{LedgerConfig, LedgerStatistics};
