//! Participant handle

use serde::{Deserialize, Serialize};
use std::fmt;

/// Dense process-local handle for a participant.
///
/// The handle stands in for a cryptographic identifier; the identity
/// collaborator owns the mapping between the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub const fn as_u32(&self) -> u32 {
        self.0
    }

    /// Little-endian bytes, as used in evidence and gossip id encodings
    pub fn to_le_bytes(&self) -> [u8; 4] {
        self.0.to_le_bytes()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

impl From<u32> for NodeId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_ordering() {
        let mut ids = vec![NodeId(7), NodeId(2), NodeId(5)];
        ids.sort();
        assert_eq!(ids, vec![NodeId(2), NodeId(5), NodeId(7)]);
    }

    #[test]
    fn test_node_id_display() {
        assert_eq!(NodeId::new(42).to_string(), "node#42");
        assert_eq!(NodeId::from(3).to_le_bytes(), [3, 0, 0, 0]);
    }
}
