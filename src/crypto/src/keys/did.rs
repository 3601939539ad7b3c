use crate::error::{CryptoError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Decentralised identifier: the participant's Ed25519 verifying key
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Did(pub [u8; 32]);

impl Did {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s).map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidKey("DID must be 32 bytes".to_string()))?;
        Ok(Self(bytes))
    }
}

impl fmt::Debug for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Did({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "did:trustmesh:{}", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_did_hex_roundtrip() {
        let did = Did([0xab; 32]);
        assert_eq!(Did::from_hex(&did.to_hex()).unwrap(), did);
        assert!(Did::from_hex("abcd").is_err());
        assert!(Did::from_hex("zz").is_err());
    }
}
