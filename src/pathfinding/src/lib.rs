//! # TrustMesh Pathfinding
//!
//! Trust-path search and portable, verifiable proofs of the paths found.
//!
//! ## Features
//!
//! - **A\* search**: risk-derived edge costs, depth limit and trust floor,
//!   distinct outcomes for each kind of non-finding
//! - **Heuristics**: zero (Dijkstra), reputation-guided, or any closure
//! - **Proof-of-Path**: bincode bundle of signed hops, signed by the sender
//! - **Verifier**: ordered checks yielding a `PopVerdict`, replay protection
//!   and reputation feedback
//!
//! ## Module Structure
//!
//! ```text
//! pathfinding/
//! ├── astar      - Pathfinder, PathConfig, PathOutcome, TrustPath
//! ├── heuristic  - Heuristic, ZeroHeuristic, ReputationHeuristic
//! ├── proof      - ProofOfPath
//! └── verifier   - ProofVerifier, VerifierConfig, Verification
//! ```

pub mod astar;
pub mod error;
pub mod heuristic;
pub mod proof;
pub mod verifier;

pub use astar::{edge_cost, PathConfig, PathOutcome, Pathfinder, SearchResult, TrustPath};
pub use error::{PathError, Result};
pub use heuristic::{Heuristic, ReputationHeuristic, ZeroHeuristic};
pub use proof::ProofOfPath;
pub use verifier::{ProofVerifier, Verification, VerifierConfig};
