use crate::error::{CryptoError, Result};
use crate::keys::did::Did;
use ed25519_dalek::{Signer as _, SigningKey, VerifyingKey};
use rand::RngCore;
use trustmesh_core::traits::Signer;
use trustmesh_core::NodeId;

/// Ed25519 keypair bound to a local node handle
#[derive(Clone)]
pub struct NodeKeypair {
    node: NodeId,
    signing_key: SigningKey,
}

impl NodeKeypair {
    /// Generate a new keypair from the OS RNG
    pub fn generate(node: NodeId) -> Self {
        let mut csprng = rand::rngs::OsRng;
        let mut seed = [0u8; 32];
        csprng.fill_bytes(&mut seed);
        Self::from_seed(node, &seed)
    }

    /// Deterministic keypair from a 32-byte seed
    pub fn from_seed(node: NodeId, seed: &[u8; 32]) -> Self {
        Self {
            node,
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Rebind the keypair to another handle, e.g. after registry assignment
    pub fn with_node(mut self, node: NodeId) -> Self {
        self.node = node;
        self
    }

    pub fn did(&self) -> Did {
        Did(self.signing_key.verifying_key().to_bytes())
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    pub fn seed(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    /// Verify a signature made by this keypair
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<()> {
        crate::registry::verify_with_key(&self.verifying_key(), message, signature)
    }
}

impl Signer for NodeKeypair {
    fn node_id(&self) -> NodeId {
        self.node
    }

    fn sign(&self, message: &[u8]) -> Vec<u8> {
        self.signing_key.sign(message).to_bytes().to_vec()
    }
}

impl std::fmt::Debug for NodeKeypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeKeypair")
            .field("node", &self.node)
            .field("did", &self.did())
            .finish()
    }
}

impl TryFrom<(&[u8], NodeId)> for NodeKeypair {
    type Error = CryptoError;

    fn try_from((seed, node): (&[u8], NodeId)) -> Result<Self> {
        let seed: [u8; 32] = seed
            .try_into()
            .map_err(|_| CryptoError::InvalidKey("seed must be 32 bytes".to_string()))?;
        Ok(Self::from_seed(node, &seed))
    }
}
