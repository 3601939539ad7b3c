//! # TrustMesh Graph Store
//!
//! Adjacency-indexed directed graph of participants and risk edges. Every
//! detection, inference and search algorithm runs over this store.
//!
//! ## Features
//!
//! - **Idempotent upsert**: edges are keyed by `(from, to)`; a repeat replaces
//! - **Ordered adjacency**: outgoing edge indices per node in insertion order
//! - **Auditable deletion**: removals leave a revocation record behind
//! - **Persistence**: sled-backed and in-memory repositories
//! - **Cache**: explicit not-loaded/loaded state behind one `load()` call
//!
//! ## Module Structure
//!
//! ```text
//! graph/
//! ├── store      - Graph (nodes, edges, adjacency, revocations)
//! ├── storage/   - sled and in-memory repositories
//! ├── cache      - CachedGraph over a repository
//! └── snapshot   - petgraph export
//! ```

pub mod cache;
pub mod error;
pub mod snapshot;
pub mod storage;
pub mod store;

pub use cache::{CacheState, CachedGraph};
pub use error::{GraphError, Result};
pub use storage::{MemoryRepository, SledConfig, SledRepository};
pub use store::Graph;
