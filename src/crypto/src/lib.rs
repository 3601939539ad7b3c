//! # TrustMesh Cryptography Module
//!
//! Reference identity adapter and hashing primitives for the trust-graph engine.
//!
//! ## Features
//!
//! - **Content addressing**: BLAKE3 ids for gossip messages and proofs
//! - **Evidence digests**: SHA3-256 over canonical cycle evidence
//! - **Signatures**: Ed25519 keypairs implementing the engine's `Signer` seam
//! - **Identity registry**: DID ↔ NodeId mapping that doubles as the `SignatureVerifier`
//!
//! ## Module Structure
//!
//! ```text
//! crypto/
//! ├── hash/      - BLAKE3 and SHA3-256
//! ├── keys/      - Ed25519 keypairs and key files
//! └── registry   - DID registry and signature verification
//! ```

pub mod error;
pub mod hash;
pub mod keys;
pub mod registry;

pub use error::{CryptoError, Result};
pub use hash::{Blake3Hash, Sha3Hash256};
pub use keys::{Did, NodeKeypair};
pub use registry::IdentityRegistry;
