//! Error types for the cryptography module

use thiserror::Error;
use trustmesh_core::CoreError;

/// Result type alias for cryptographic operations
pub type Result<T> = std::result::Result<T, CryptoError>;

/// Errors that can occur during cryptographic operations
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Signature verification failed (no details)
    #[error("Signature verification failed")]
    SignatureVerificationFailed,

    /// Invalid key format
    #[error("Invalid key format: {0}")]
    InvalidKey(String),

    /// Bytes do not form an Ed25519 public key
    #[error("Invalid public key")]
    InvalidPublicKey,

    /// Invalid signature format
    #[error("Invalid signature format: {0}")]
    InvalidSignature(String),

    /// No key registered for the node
    #[error("Unknown signer: node#{0}")]
    UnknownSigner(u32),

    /// DID not registered
    #[error("Unknown DID: {0}")]
    UnknownDid(String),

    /// Key file errors
    #[error("Key storage error: {0}")]
    KeyStorage(#[from] std::io::Error),
}

impl From<CryptoError> for CoreError {
    fn from(err: CryptoError) -> Self {
        CoreError::identity(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_into_core() {
        let err: CoreError = CryptoError::UnknownSigner(4).into();
        assert!(matches!(err, CoreError::Identity(msg) if msg == "Unknown signer: node#4"));
    }
}
