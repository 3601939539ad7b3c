//! Identity registry
//!
//! Assigns dense [`NodeId`] handles to DIDs in registration order and verifies
//! Ed25519 signatures attributed to those handles. Registration is idempotent.

use crate::error::{CryptoError, Result};
use crate::keys::Did;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use parking_lot::RwLock;
use std::collections::HashMap;
use trustmesh_core::traits::SignatureVerifier;
use trustmesh_core::NodeId;

#[derive(Default)]
struct Inner {
    by_did: HashMap<Did, NodeId>,
    keys: Vec<(Did, VerifyingKey)>,
}

/// DID ↔ NodeId mapping plus the verifying key for each node
#[derive(Default)]
pub struct IdentityRegistry {
    inner: RwLock<Inner>,
}

impl IdentityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a DID, returning its handle. A known DID keeps its handle.
    pub fn register(&self, did: Did) -> Result<NodeId> {
        if let Some(node) = self.inner.read().by_did.get(&did) {
            return Ok(*node);
        }

        let key = VerifyingKey::from_bytes(did.as_bytes()).map_err(|_| CryptoError::InvalidPublicKey)?;
        let mut inner = self.inner.write();
        // Lost a race with another registration of the same DID
        if let Some(node) = inner.by_did.get(&did) {
            return Ok(*node);
        }
        let node = NodeId(inner.keys.len() as u32);
        inner.keys.push((did, key));
        inner.by_did.insert(did, node);
        Ok(node)
    }

    pub fn node_id(&self, did: &Did) -> Option<NodeId> {
        self.inner.read().by_did.get(did).copied()
    }

    pub fn did(&self, node: NodeId) -> Option<Did> {
        self.inner
            .read()
            .keys
            .get(node.as_u32() as usize)
            .map(|(did, _)| *did)
    }

    /// Resolve a DID or fail with `UnknownDid`
    pub fn resolve(&self, did: &Did) -> Result<NodeId> {
        self.node_id(did)
            .ok_or_else(|| CryptoError::UnknownDid(did.to_hex()))
    }

    pub fn len(&self) -> usize {
        self.inner.read().keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn verifying_key(&self, node: NodeId) -> Result<VerifyingKey> {
        self.inner
            .read()
            .keys
            .get(node.as_u32() as usize)
            .map(|(_, key)| *key)
            .ok_or(CryptoError::UnknownSigner(node.as_u32()))
    }
}

impl SignatureVerifier for IdentityRegistry {
    fn verify(&self, signer: NodeId, message: &[u8], signature: &[u8]) -> trustmesh_core::Result<()> {
        let key = self.verifying_key(signer)?;
        verify_with_key(&key, message, signature)?;
        Ok(())
    }
}

/// Verify a raw 64-byte Ed25519 signature
pub(crate) fn verify_with_key(key: &VerifyingKey, message: &[u8], signature: &[u8]) -> Result<()> {
    let bytes: &[u8; 64] = signature
        .try_into()
        .map_err(|_| CryptoError::InvalidSignature(format!("expected 64 bytes, got {}", signature.len())))?;
    let signature = Signature::from_bytes(bytes);
    key.verify(message, &signature)
        .map_err(|_| CryptoError::SignatureVerificationFailed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::NodeKeypair;
    use trustmesh_core::traits::Signer;

    #[test]
    fn test_register_assigns_dense_ids() {
        let registry = IdentityRegistry::new();
        let a = NodeKeypair::generate(NodeId(0));
        let b = NodeKeypair::generate(NodeId(0));

        assert_eq!(registry.register(a.did()).unwrap(), NodeId(0));
        assert_eq!(registry.register(b.did()).unwrap(), NodeId(1));
        // Idempotent
        assert_eq!(registry.register(a.did()).unwrap(), NodeId(0));
        assert_eq!(registry.len(), 2);

        assert_eq!(registry.did(NodeId(1)), Some(b.did()));
        assert_eq!(registry.node_id(&a.did()), Some(NodeId(0)));
    }

    #[test]
    fn test_resolve_unknown_did() {
        let registry = IdentityRegistry::new();
        let did = NodeKeypair::generate(NodeId(0)).did();
        assert!(matches!(registry.resolve(&did), Err(CryptoError::UnknownDid(_))));
    }

    #[test]
    fn test_verify_through_registry() {
        let registry = IdentityRegistry::new();
        let keypair = NodeKeypair::generate(NodeId(0));
        let node = registry.register(keypair.did()).unwrap();
        let keypair = keypair.with_node(node);

        let signature = keypair.sign(b"bundle");
        assert!(registry.verify(node, b"bundle", &signature).is_ok());
        assert!(registry.verify(node, b"tampered", &signature).is_err());
        assert!(registry.verify(NodeId(5), b"bundle", &signature).is_err());
        assert!(registry.verify(node, b"bundle", &signature[..10]).is_err());
    }
}
