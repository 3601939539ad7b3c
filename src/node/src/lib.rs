//! # TrustMesh Node
//!
//! Runs one participant of the trust mesh: a [`TrustEngine`] that owns the
//! local view of the graph, and an [`EngineService`] that drives it from a
//! single task.
//!
//! ## Features
//!
//! - **Engine**: signed edge assertions and revocations with nonce ordering,
//!   betrayal findings, belief anomalies, proofs of path
//! - **Service**: command channel, periodic heartbeats and detection passes,
//!   detached gossip sends
//! - **Configuration**: TOML file with per-component sections
//! - **Transport**: in-process channel network
//!
//! ## Module Structure
//!
//! ```text
//! node/
//! ├── config     - EngineConfig and its sections
//! ├── engine     - TrustEngine, Outbound, GossipReceipt
//! ├── service    - EngineService, EngineHandle
//! ├── transport  - ChannelNetwork, ChannelTransport
//! └── error      - EngineError
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod service;
pub mod transport;

pub use config::EngineConfig;
pub use engine::{EngineStatistics, GossipReceipt, GraphChange, Outbound, TrustEngine};
pub use error::{EngineError, Result};
pub use service::{EngineHandle, EngineService, ServiceConfig};
pub use transport::{ChannelNetwork, ChannelTransport};
