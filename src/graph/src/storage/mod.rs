//! Persistence adapters for edges, revocations and scores

pub mod memory;
pub mod sled_backend;

pub use self::memory::MemoryRepository;
pub use self::sled_backend::{SledConfig, SledRepository};

use trustmesh_core::NodeId;

/// Storage key for an edge or revocation: `from BE | to BE`
pub(crate) fn edge_key(from: NodeId, to: NodeId) -> [u8; 8] {
    let mut key = [0u8; 8];
    key[..4].copy_from_slice(&from.as_u32().to_be_bytes());
    key[4..].copy_from_slice(&to.as_u32().to_be_bytes());
    key
}
