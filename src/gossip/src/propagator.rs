//! Gossip propagation
//!
//! Per node state:
//! - a bounded seen set (id -> referenced ids) for deduplication and ancestry
//! - a bounded pool of recent ids that new messages reference, forming a DAG
//! - the last entropy epoch heard from each peer, for coverage and replay checks
//!
//! Flooding forwards a new message to each active graph neighbour except its
//! sender, independently with probability `forward_probability`. The caller
//! hands the returned targets to a transport.

use crate::cache::MessageCache;
use crate::error::Result;
use crate::message::{GossipMessage, GossipPayload, MessageId};
use rand::rngs::StdRng;
use rand::seq::IteratorRandom;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use tracing::{debug, warn};
use trustmesh_core::{AnomalyReason, AnomalyScore, EntropyStamp, NodeId, Timestamp, NANOS_PER_SEC};
use trustmesh_graph::Graph;

/// Gossip configuration
#[derive(Debug, Clone)]
pub struct GossipConfig {
    /// Chance of forwarding to each neighbour
    pub forward_probability: f64,

    /// Prior ids referenced by each new message (k)
    pub reference_count: usize,

    /// Seen-set capacity
    pub seen_capacity: usize,

    /// Reference pool capacity
    pub pool_capacity: usize,

    /// Messages older than a sender's last-seen epoch minus this (ns) are replays
    pub replay_window: u64,

    /// A peer counts towards coverage if heard from within this window (ns)
    pub activity_window: u64,

    /// Coverage below this is low
    pub coverage_threshold: f64,

    /// Low coverage must persist this long (ns) before it is reported
    pub low_coverage_window: u64,
}

impl Default for GossipConfig {
    fn default() -> Self {
        Self {
            forward_probability: 0.7,
            reference_count: 3,
            seen_capacity: 4096,
            pool_capacity: 256,
            replay_window: 60 * NANOS_PER_SEC,
            activity_window: 30 * NANOS_PER_SEC,
            coverage_threshold: 0.5,
            low_coverage_window: 60 * NANOS_PER_SEC,
        }
    }
}

/// Result of handling an incoming message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiveOutcome {
    /// New message; forward to these peers
    Accepted { forward_to: Vec<NodeId> },
    /// Already seen; not forwarded
    Duplicate,
    /// Entropy stamp too old; not forwarded
    Replay,
}

pub struct GossipPropagator {
    local: NodeId,
    config: GossipConfig,
    seen: MessageCache<Vec<MessageId>>,
    pool: VecDeque<MessageId>,
    peers: HashMap<NodeId, Timestamp>,
    low_since: Option<Timestamp>,
    rng: StdRng,
}

impl GossipPropagator {
    pub fn new(local: NodeId, config: GossipConfig) -> Self {
        Self::with_rng(local, config, StdRng::from_entropy())
    }

    /// Deterministic sampling and forwarding decisions
    pub fn with_seed(local: NodeId, config: GossipConfig, seed: u64) -> Self {
        Self::with_rng(local, config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(local: NodeId, config: GossipConfig, rng: StdRng) -> Self {
        Self {
            local,
            seen: MessageCache::new(config.seen_capacity),
            pool: VecDeque::with_capacity(config.pool_capacity),
            peers: HashMap::new(),
            low_since: None,
            rng,
            config,
        }
    }

    pub fn local(&self) -> NodeId {
        self.local
    }

    pub fn config(&self) -> &GossipConfig {
        &self.config
    }

    /// Originate a message stamped at `now`, referencing up to k pooled ids
    pub fn create(&mut self, payload: GossipPayload, now: Timestamp) -> Result<GossipMessage> {
        let references: Vec<MessageId> = self
            .pool
            .iter()
            .copied()
            .choose_multiple(&mut self.rng, self.config.reference_count);
        let entropy = EntropyStamp::new(now, self.rng.gen());

        let message = GossipMessage::new(self.local, references, entropy, payload)?;
        self.record(&message);

        debug!(
            id = %message.id,
            kind = ?message.message_type(),
            references = message.references.len(),
            "Created gossip message"
        );
        Ok(message)
    }

    /// Handle a message received from the network
    pub fn receive(&mut self, message: &GossipMessage, graph: &Graph, now: Timestamp) -> Result<ReceiveOutcome> {
        message.verify_id()?;

        if self.seen.contains(&message.id) {
            return Ok(ReceiveOutcome::Duplicate);
        }

        if let Some(&last_seen) = self.peers.get(&message.sender) {
            if message.entropy.is_stale(last_seen, self.config.replay_window) {
                warn!(
                    id = %message.id,
                    sender = %message.sender,
                    epoch = message.entropy.epoch,
                    last_seen,
                    "Rejected replayed gossip message"
                );
                return Ok(ReceiveOutcome::Replay);
            }
        }

        self.record(message);
        self.observe(message.sender, message.entropy.epoch);

        let forward_to = self.forward_targets(graph, Some(message.sender), now);
        debug!(id = %message.id, sender = %message.sender, forward = forward_to.len(), "Accepted gossip message");
        Ok(ReceiveOutcome::Accepted { forward_to })
    }

    /// Sample forwarding targets among active neighbours of the local node
    pub fn forward_targets(&mut self, graph: &Graph, exclude: Option<NodeId>, now: Timestamp) -> Vec<NodeId> {
        let neighbours: BTreeSet<NodeId> = graph
            .neighbors(self.local)
            .iter()
            .filter_map(|&idx| graph.edge_at(idx))
            .filter(|edge| !edge.is_expired(now))
            .map(|edge| edge.to)
            .filter(|&peer| Some(peer) != exclude && peer != self.local)
            .collect();

        let p = self.config.forward_probability.clamp(0.0, 1.0);
        neighbours
            .into_iter()
            .filter(|_| self.rng.gen_bool(p))
            .collect()
    }

    /// Track a peer for coverage without having heard from it
    pub fn add_peer(&mut self, peer: NodeId) {
        if peer != self.local {
            self.peers.entry(peer).or_insert(0);
        }
    }

    /// Record that `peer` was heard from at entropy epoch `epoch`
    pub fn observe(&mut self, peer: NodeId, epoch: Timestamp) {
        if peer == self.local {
            return;
        }
        let last = self.peers.entry(peer).or_insert(epoch);
        *last = (*last).max(epoch);
    }

    pub fn last_seen(&self, peer: NodeId) -> Option<Timestamp> {
        self.peers.get(&peer).copied()
    }

    /// Fraction of known peers heard from within the activity window
    pub fn coverage(&self, now: Timestamp) -> f64 {
        if self.peers.is_empty() {
            return 1.0;
        }
        let horizon = now.saturating_sub(self.config.activity_window);
        let active = self.peers.values().filter(|&&last| last >= horizon).count();
        active as f64 / self.peers.len() as f64
    }

    /// Low-coverage anomaly once coverage has stayed low for the sustain window
    pub fn check_coverage(&mut self, now: Timestamp) -> Option<AnomalyScore> {
        let coverage = self.coverage(now);
        if coverage >= self.config.coverage_threshold {
            self.low_since = None;
            return None;
        }

        let since = *self.low_since.get_or_insert(now);
        if now.saturating_sub(since) < self.config.low_coverage_window {
            return None;
        }

        warn!(node = %self.local, coverage, peers = self.peers.len(), "Sustained low gossip coverage");
        Some(AnomalyScore::new(self.local, 1.0 - coverage, AnomalyReason::LowCoverage))
    }

    pub fn has_seen(&self, id: &MessageId) -> bool {
        self.seen.contains(id)
    }

    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }

    pub fn pool_len(&self) -> usize {
        self.pool.len()
    }

    /// Referenced ids not yet seen locally
    pub fn missing_references(&self, message: &GossipMessage) -> Vec<MessageId> {
        message
            .references
            .iter()
            .filter(|id| !self.seen.contains(id))
            .copied()
            .collect()
    }

    /// Ancestors of `id` reachable through retained references, nearest first
    pub fn ancestors(&self, id: &MessageId, depth: usize) -> Vec<MessageId> {
        let mut found = Vec::new();
        let mut visited: HashSet<MessageId> = HashSet::from([*id]);
        let mut frontier = vec![*id];

        for _ in 0..depth {
            let mut next = Vec::new();
            for current in &frontier {
                let Some(references) = self.seen.get(current) else {
                    continue;
                };
                for reference in references {
                    if visited.insert(*reference) {
                        found.push(*reference);
                        next.push(*reference);
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            frontier = next;
        }
        found
    }

    fn record(&mut self, message: &GossipMessage) {
        if !self.seen.insert(message.id, message.references.clone()) {
            return;
        }
        if self.pool.len() >= self.config.pool_capacity.max(1) {
            self.pool.pop_front();
        }
        self.pool.push_back(message.id);
    }
}
