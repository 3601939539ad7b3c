//! Proof-of-Path verification
//!
//! Checks run in a fixed order and the first failure decides the verdict:
//!
//! 1. endpoints: hops present, first hop leaves the sender, last hop reaches
//!    the receiver
//! 2. replay: proof id already accepted
//! 3. age: issued more than `max_proof_age` ago
//! 4. bundle signature by the sender (failure reads as invalid endpoints)
//! 5. per hop, in order: chain continuity, edge still stored (revoked when a
//!    revocation is on record), nonce not superseded, edge unexpired, edge
//!    signature by its asserting party
//!
//! Every verdict on a structurally sound proof is recorded in the reputation
//! ledger against the sender. Only valid proofs enter the bounded seen-set.

use crate::error::Result;
use crate::proof::ProofOfPath;
use std::collections::{HashSet, VecDeque};
use tracing::{debug, warn};
use trustmesh_core::traits::SignatureVerifier;
use trustmesh_core::{NodeId, PopVerdict, Timestamp, NANOS_PER_SEC};
use trustmesh_crypto::Blake3Hash;
use trustmesh_graph::Graph;
use trustmesh_reputation::ReputationLedger;

#[derive(Debug, Clone)]
pub struct VerifierConfig {
    /// Proofs older than this (ns) are expired
    pub max_proof_age: u64,

    /// Accepted proof ids remembered for replay detection
    pub seen_capacity: usize,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            max_proof_age: 3600 * NANOS_PER_SEC,
            seen_capacity: 10_000,
        }
    }
}

/// Outcome of verifying one proof
#[derive(Debug, Clone, PartialEq)]
pub struct Verification {
    pub proof_id: Blake3Hash,
    pub sender: NodeId,
    pub verdict: PopVerdict,
}

pub struct ProofVerifier {
    config: VerifierConfig,
    seen: HashSet<Blake3Hash>,
    order: VecDeque<Blake3Hash>,
}

impl ProofVerifier {
    pub fn new(config: VerifierConfig) -> Self {
        Self {
            seen: HashSet::with_capacity(config.seen_capacity),
            order: VecDeque::with_capacity(config.seen_capacity),
            config,
        }
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// Decode, check and record a serialized proof.
    ///
    /// Malformed bytes are an error and leave the ledger untouched.
    pub fn verify(
        &mut self,
        bytes: &[u8],
        graph: &Graph,
        identity: &dyn SignatureVerifier,
        ledger: &mut ReputationLedger,
        now: Timestamp,
    ) -> Result<Verification> {
        let proof = ProofOfPath::from_bytes(bytes)?;
        self.verify_proof(&proof, graph, identity, ledger, now)
    }

    pub fn verify_proof(
        &mut self,
        proof: &ProofOfPath,
        graph: &Graph,
        identity: &dyn SignatureVerifier,
        ledger: &mut ReputationLedger,
        now: Timestamp,
    ) -> Result<Verification> {
        let proof_id = proof.id()?;
        let verdict = self.check(proof, &proof_id, graph, identity, now)?;

        if verdict.is_valid() {
            self.remember(proof_id);
            debug!(sender = %proof.sender, receiver = %proof.receiver, hops = proof.hop_count(), "Proof of path accepted");
        } else {
            warn!(sender = %proof.sender, receiver = %proof.receiver, %verdict, "Proof of path rejected");
        }
        ledger.update(proof.sender, &verdict, now);

        Ok(Verification {
            proof_id,
            sender: proof.sender,
            verdict,
        })
    }

    /// Verdict for `proof` without recording it anywhere
    pub fn check(
        &self,
        proof: &ProofOfPath,
        proof_id: &Blake3Hash,
        graph: &Graph,
        identity: &dyn SignatureVerifier,
        now: Timestamp,
    ) -> Result<PopVerdict> {
        let (Some(first), Some(last)) = (proof.hops.first(), proof.hops.last()) else {
            return Ok(PopVerdict::InvalidEndpoints);
        };
        if first.edge.from != proof.sender || last.edge.to != proof.receiver {
            return Ok(PopVerdict::InvalidEndpoints);
        }

        if self.seen.contains(proof_id) {
            return Ok(PopVerdict::Replay);
        }

        if now.saturating_sub(proof.timestamp) > self.config.max_proof_age {
            return Ok(PopVerdict::Expired);
        }

        if identity
            .verify(proof.sender, &proof.body_bytes()?, &proof.signature)
            .is_err()
        {
            return Ok(PopVerdict::InvalidEndpoints);
        }

        let mut expected_from = proof.sender;
        for (hop, signed) in proof.hops.iter().enumerate() {
            let claimed = &signed.edge;
            if claimed.from != expected_from {
                return Ok(PopVerdict::BrokenLink { hop });
            }
            expected_from = claimed.to;

            let Some(stored) = graph.edge(claimed.from, claimed.to) else {
                if graph.revocation(claimed.from, claimed.to).is_some() {
                    return Ok(PopVerdict::Revoked { hop });
                }
                return Ok(PopVerdict::BrokenLink { hop });
            };
            if stored.nonce > claimed.nonce {
                return Ok(PopVerdict::Revoked { hop });
            }
            if stored != claimed {
                return Ok(PopVerdict::BrokenLink { hop });
            }
            if stored.is_expired(now) {
                return Ok(PopVerdict::Expired);
            }
            if identity
                .verify(claimed.from, &claimed.signing_bytes(), &signed.signature)
                .is_err()
            {
                return Ok(PopVerdict::BrokenLink { hop });
            }
        }

        Ok(PopVerdict::Valid)
    }

    pub fn has_seen(&self, proof_id: &Blake3Hash) -> bool {
        self.seen.contains(proof_id)
    }

    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }

    fn remember(&mut self, proof_id: Blake3Hash) {
        if self.config.seen_capacity == 0 || !self.seen.insert(proof_id) {
            return;
        }
        self.order.push_back(proof_id);
        while self.order.len() > self.config.seen_capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.seen.remove(&evicted);
            }
        }
    }
}

impl Default for ProofVerifier {
    fn default() -> Self {
        Self::new(VerifierConfig::default())
    }
}
