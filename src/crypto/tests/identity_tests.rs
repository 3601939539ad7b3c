//! Integration tests for keypairs, key files and the identity registry
//!
//! Tests:
//! - Handles follow registration order and survive re-registration
//! - Signatures verify only for the registered signer and exact message
//! - Key files reproduce the same DID

use proptest::prelude::*;
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;
use trustmesh_core::traits::{SignatureVerifier, Signer};
use trustmesh_core::NodeId;
use trustmesh_crypto::keys::{load_keypair, save_keypair};
use trustmesh_crypto::{Blake3Hash, Did, IdentityRegistry, NodeKeypair};

#[test]
fn test_concurrent_registration_is_dense() {
    let registry = Arc::new(IdentityRegistry::new());
    let keys: Vec<_> = (0..16u8)
        .map(|i| NodeKeypair::from_seed(NodeId(0), &[i + 1; 32]))
        .collect();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let registry = registry.clone();
            let dids: Vec<Did> = keys.iter().map(|k| k.did()).collect();
            thread::spawn(move || {
                for did in dids {
                    registry.register(did).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(registry.len(), 16);
    let mut ids: Vec<u32> = keys
        .iter()
        .map(|k| registry.node_id(&k.did()).unwrap().as_u32())
        .collect();
    ids.sort_unstable();
    assert_eq!(ids, (0..16).collect::<Vec<_>>());
}

#[test]
fn test_signature_bound_to_signer() {
    let registry = IdentityRegistry::new();
    let alice = NodeKeypair::from_seed(NodeId(0), &[1; 32]);
    let bob = NodeKeypair::from_seed(NodeId(0), &[2; 32]);
    let alice_id = registry.register(alice.did()).unwrap();
    let bob_id = registry.register(bob.did()).unwrap();

    let signature = alice.with_node(alice_id).sign(b"edge 0 -> 1");
    assert!(registry.verify(alice_id, b"edge 0 -> 1", &signature).is_ok());
    assert!(registry.verify(bob_id, b"edge 0 -> 1", &signature).is_err());
}

#[test]
fn test_key_file_preserves_identity() {
    let temp_dir = TempDir::new().unwrap();
    let keypair = NodeKeypair::generate(NodeId(0));

    let path = save_keypair(&keypair, temp_dir.path()).unwrap();
    let loaded = load_keypair(&path, NodeId(9)).unwrap();

    assert_eq!(loaded.did(), keypair.did());
    assert_eq!(loaded.node_id(), NodeId(9));
    let public = std::fs::read_to_string(temp_dir.path().join("node.pub")).unwrap();
    assert_eq!(Did::from_hex(public.trim()).unwrap(), keypair.did());
}

#[test]
fn test_truncated_key_file_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("node.key");
    std::fs::write(&path, "abcd\n").unwrap();
    assert!(load_keypair(&path, NodeId(0)).is_err());
}

proptest! {
    #[test]
    fn prop_flipped_bit_fails_verification(
        seed in any::<[u8; 32]>(),
        message in proptest::collection::vec(any::<u8>(), 1..128),
        bit in 0usize..1024,
    ) {
        let registry = IdentityRegistry::new();
        let keypair = NodeKeypair::from_seed(NodeId(0), &seed);
        let node = registry.register(keypair.did()).unwrap();
        let signature = keypair.with_node(node).sign(&message);

        let mut tampered = message.clone();
        let index = (bit / 8) % tampered.len();
        tampered[index] ^= 1 << (bit % 8);

        prop_assert!(registry.verify(node, &message, &signature).is_ok());
        prop_assert!(registry.verify(node, &tampered, &signature).is_err());
    }

    #[test]
    fn prop_hash_parts_matches_concatenation(
        data in proptest::collection::vec(any::<u8>(), 0..256),
        split in 0usize..256,
    ) {
        let split = split.min(data.len());
        let (head, tail) = data.split_at(split);
        prop_assert_eq!(Blake3Hash::hash_parts(&[head, tail]), Blake3Hash::hash(&data));
    }
}
