use sha3::{Digest, Sha3_256};

/// SHA3-256 hash output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Sha3Hash256([u8; 32]);

impl Sha3Hash256 {
    /// Hash data using SHA3-256
    pub fn hash(data: &[u8]) -> Self {
        let mut hasher = Sha3_256::new();
        hasher.update(data);
        let result = hasher.finalize();
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&result);
        Sha3Hash256(hash)
    }

    /// Get hash bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}
