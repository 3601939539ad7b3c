//! # TrustMesh Gossip
//!
//! Probabilistic flooding of trust assertions with DAG references between
//! messages and a coverage metric for partition and eclipse detection.
//!
//! ## Features
//!
//! - **Content-addressed ids**: BLAKE3 over sender, entropy stamp and payload
//! - **DAG references**: each message names up to k recent message ids
//! - **Flood control**: bounded seen set, per-neighbour forwarding probability
//! - **Replay defence**: stale entropy stamps are dropped
//! - **Coverage**: fraction of peers recently heard from, with a sustained
//!   low-coverage anomaly
//!
//! ## Module Structure
//!
//! ```text
//! gossip/
//! ├── message     - GossipMessage, GossipPayload, id derivation
//! ├── cache       - MessageCache (bounded seen set)
//! └── propagator  - GossipPropagator, GossipConfig, ReceiveOutcome
//! ```

pub mod cache;
pub mod error;
pub mod message;
pub mod propagator;

pub use cache::MessageCache;
pub use error::{GossipError, Result};
pub use message::{GossipMessage, GossipPayload, MessageId, MessageType};
pub use propagator::{GossipConfig, GossipPropagator, ReceiveOutcome};
