//! Trust engine
//!
//! [`TrustEngine`] wires every component for one graph owner: the cached graph
//! over a repository, the identity registry, the reputation ledger, betrayal
//! detection with belief propagation, the pathfinder and proof verifier, and
//! the gossip propagator. It is not internally synchronised;
//! [`EngineService`](crate::service::EngineService) owns it on a single task.
//!
//! Mutations that other nodes must learn about return an [`Outbound`] gossip
//! message together with its sampled targets. Sending is left to the caller.

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use prometheus::{Encoder, Registry, TextEncoder};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use trustmesh_core::traits::{EdgeRepository, ScoreRepository, SignatureVerifier, Signer};
use trustmesh_core::{
    AnomalyReason, AnomalyScore, Clock, EntropyStamp, NodeId, RiskEdge, SignedEdge, Timestamp,
};
use trustmesh_crypto::{Did, IdentityRegistry, NodeKeypair};
use trustmesh_detection::{
    AlertLog, BeliefOutcome, BeliefPropagation, BetrayalDetector, BetrayalReport, CycleEvidence,
    DetectionError, SlashSignal,
};
use trustmesh_gossip::{GossipMessage, GossipPayload, GossipPropagator, MessageId, ReceiveOutcome};
use trustmesh_graph::{CachedGraph, Graph};
use trustmesh_pathfinding::{
    PathOutcome, Pathfinder, ProofOfPath, ProofVerifier, ReputationHeuristic, SearchResult,
    Verification, ZeroHeuristic,
};
use trustmesh_reputation::{LedgerMetrics, LedgerStatistics, ReputationLedger};

/// Gossip to hand to the transport
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub message: GossipMessage,
    pub targets: Vec<NodeId>,
}

impl Outbound {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(self.message.to_bytes()?)
    }
}

/// Effect of an accepted gossip payload on the graph
#[derive(Debug, Clone, PartialEq)]
pub enum GraphChange {
    None,
    Upserted(RiskEdge),
    Removed(RiskEdge),
}

/// Result of handling one incoming gossip message
#[derive(Debug, Clone, PartialEq)]
pub struct GossipReceipt {
    pub id: MessageId,
    pub outcome: ReceiveOutcome,
    pub change: GraphChange,
    /// Present when the message should be passed on
    pub forward: Option<Outbound>,
}

/// Cycle membership recorded by the latest detection run that found it
#[derive(Debug, Clone, PartialEq)]
struct Finding {
    evidence: CycleEvidence,
    score: f64,
    detected_at: Timestamp,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EngineStatistics {
    pub local: u32,
    pub registered: usize,
    pub nodes: usize,
    pub edges: usize,
    pub flagged: usize,
    pub alerts: usize,
    pub gossip_seen: usize,
    pub coverage: f64,
    pub reputation: LedgerStatistics,
}

pub struct TrustEngine<R> {
    keypair: NodeKeypair,
    registry: IdentityRegistry,
    graph: CachedGraph<R>,
    ledger: ReputationLedger,
    detector: BetrayalDetector,
    belief: BeliefPropagation,
    pathfinder: Pathfinder,
    verifier: ProofVerifier,
    gossip: GossipPropagator,
    alerts: Arc<AlertLog>,
    findings: BTreeMap<NodeId, Finding>,
    metrics: Registry,
    clock: Arc<dyn Clock>,
    edge_ttl: u64,
    reputation_heuristic: bool,
    belief_feedback: bool,
    /// Beliefs from the latest run, applied to a copy of the graph for detection
    belief_weights: Option<BeliefOutcome>,
    slash_nonce: u64,
}

impl<R> TrustEngine<R>
where
    R: EdgeRepository + ScoreRepository,
{
    /// Build an engine for `keypair`'s owner over `repo`.
    ///
    /// Configured members are registered first, in order, then the local DID.
    /// Stored edges and scores are loaded.
    pub fn new(config: &EngineConfig, keypair: NodeKeypair, repo: R, clock: Arc<dyn Clock>) -> Result<Self> {
        let registry = IdentityRegistry::new();
        for member in &config.node.members {
            registry.register(Did::from_hex(member)?)?;
        }
        let local = registry.register(keypair.did())?;
        let keypair = keypair.with_node(local);

        let metrics = Registry::new();
        let mut ledger = ReputationLedger::with_clock(config.ledger_config(), clock.clone());
        if config.node.metrics_enabled {
            ledger = ledger.with_metrics(LedgerMetrics::new(&metrics)?);
        }

        let mut engine = Self {
            registry,
            graph: CachedGraph::new(repo),
            ledger,
            detector: BetrayalDetector::new(config.betrayal_config()),
            belief: BeliefPropagation::new(config.belief_config()),
            pathfinder: Pathfinder::new(config.path_config()),
            verifier: ProofVerifier::new(config.verifier_config()),
            gossip: GossipPropagator::new(local, config.gossip_config()),
            alerts: Arc::new(AlertLog::with_capacity(config.node.alert_capacity)),
            findings: BTreeMap::new(),
            metrics,
            clock,
            edge_ttl: config.edge_ttl(),
            reputation_heuristic: config.pathfinding.reputation_heuristic,
            belief_feedback: config.belief.feedback,
            belief_weights: None,
            slash_nonce: 0,
            keypair,
        };

        engine.restore()?;
        let peers = engine.add_registered_nodes()?;
        for &peer in &peers {
            engine.gossip.add_peer(peer);
        }

        info!(
            %local,
            did = %engine.keypair.did(),
            members = peers.len(),
            "Trust engine initialized"
        );
        Ok(engine)
    }

    /// Replace the gossip propagator with a deterministically seeded one
    pub fn with_gossip_seed(mut self, config: &EngineConfig, seed: u64) -> Self {
        let mut gossip = GossipPropagator::with_seed(self.local(), config.gossip_config(), seed);
        for peer in 0..self.registry.len() as u32 {
            gossip.add_peer(NodeId(peer));
        }
        self.gossip = gossip;
        self
    }

    pub fn local(&self) -> NodeId {
        self.keypair.node_id()
    }

    pub fn did(&self) -> Did {
        self.keypair.did()
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    pub fn alerts(&self) -> Arc<AlertLog> {
        self.alerts.clone()
    }

    pub fn identity(&self) -> &IdentityRegistry {
        &self.registry
    }

    pub fn repository(&self) -> &R {
        self.graph.repository()
    }

    pub fn graph(&mut self) -> Result<&Graph> {
        Ok(self.graph.load()?)
    }

    // Identity

    /// Register a participant, returning its handle. Idempotent.
    pub fn register_node(&mut self, did: Did) -> Result<NodeId> {
        let node = self.registry.register(did)?;
        if self.graph.load()?.add_node(node) {
            debug!(%node, %did, "Registered node");
        }
        self.gossip.add_peer(node);
        Ok(node)
    }

    pub fn resolve(&self, did: &Did) -> Result<NodeId> {
        Ok(self.registry.resolve(did)?)
    }

    // Reputation

    /// Decayed reputation of a registered DID
    pub fn trust_score(&self, did: &Did) -> Result<f64> {
        let node = self.resolve(did)?;
        Ok(self.ledger.get_at(node, self.now()))
    }

    pub fn reputation(&self, node: NodeId) -> f64 {
        self.ledger.get_at(node, self.now())
    }

    pub fn ranked(&self, limit: usize) -> Vec<(NodeId, f64)> {
        self.ledger.ranked(limit)
    }

    // Edges

    /// Assert a trust edge from the local node with a continuous risk
    pub fn assert_edge(&mut self, to: NodeId, risk: f64) -> Result<Outbound> {
        let now = self.now();
        let edge = RiskEdge::new(self.local(), to, risk, now, now.saturating_add(self.edge_ttl))?;
        self.publish_edge(edge)
    }

    /// Assert a trust edge from the local node at a discrete trust level
    pub fn assert_level(&mut self, to: NodeId, level: i8) -> Result<Outbound> {
        let now = self.now();
        let edge = RiskEdge::from_level(self.local(), to, level, now, now.saturating_add(self.edge_ttl))?;
        self.publish_edge(edge)
    }

    fn publish_edge(&mut self, edge: RiskEdge) -> Result<Outbound> {
        if self.registry.did(edge.to).is_none() {
            return Err(EngineError::UnknownNode(edge.to));
        }

        let graph = self.graph.load()?;
        let nonce = [
            graph.edge(edge.from, edge.to).map(|e| e.nonce),
            graph.revocation(edge.from, edge.to).map(|r| r.nonce),
        ]
        .into_iter()
        .flatten()
        .max()
        .map_or(0, |n| n + 1);

        let edge = edge.with_nonce(nonce);
        let signed = SignedEdge::new(edge, self.keypair.sign(&edge.signing_bytes()));
        self.graph.add_signed_edge(signed.clone())?;
        info!(from = %edge.from, to = %edge.to, risk = edge.risk, nonce, "Asserted trust edge");

        self.broadcast(GossipPayload::EdgeAssertion(signed), None)
    }

    /// Withdraw the local node's edge to `to`
    pub fn revoke_edge(&mut self, to: NodeId) -> Result<Outbound> {
        let now = self.now();
        let removed = self.graph.remove_edge(self.local(), to, now)?;
        self.broadcast(
            GossipPayload::Revocation {
                from: removed.from,
                to: removed.to,
                nonce: removed.nonce,
            },
            Some(to),
        )
    }

    /// Liveness message for coverage tracking at peers
    pub fn heartbeat(&mut self) -> Result<Outbound> {
        self.broadcast(GossipPayload::Heartbeat, None)
    }

    fn broadcast(&mut self, payload: GossipPayload, also: Option<NodeId>) -> Result<Outbound> {
        let now = self.now();
        let message = self.gossip.create(payload, now)?;
        let graph = self.graph.load()?;
        let mut targets = self.gossip.forward_targets(graph, None, now);
        if let Some(peer) = also {
            if peer != self.keypair.node_id() && !targets.contains(&peer) {
                targets.push(peer);
            }
        }
        Ok(Outbound { message, targets })
    }

    // Gossip

    /// Decode, deduplicate and apply an incoming gossip message.
    ///
    /// A payload that fails its checks is an error and is not forwarded; the
    /// message id stays recorded so a resend reads as a duplicate.
    pub fn handle_gossip(&mut self, bytes: &[u8]) -> Result<GossipReceipt> {
        let message = GossipMessage::from_bytes(bytes)?;
        let now = self.now();
        let graph = self.graph.load()?;
        let outcome = self.gossip.receive(&message, graph, now)?;

        let forward_to = match &outcome {
            ReceiveOutcome::Accepted { forward_to } => forward_to.clone(),
            _ => {
                return Ok(GossipReceipt {
                    id: message.id,
                    outcome,
                    change: GraphChange::None,
                    forward: None,
                })
            }
        };

        let change = self.apply_payload(&message, now)?;
        Ok(GossipReceipt {
            id: message.id,
            outcome,
            change,
            forward: Some(Outbound {
                message,
                targets: forward_to,
            }),
        })
    }

    fn apply_payload(&mut self, message: &GossipMessage, now: Timestamp) -> Result<GraphChange> {
        match &message.payload {
            GossipPayload::Heartbeat => Ok(GraphChange::None),
            GossipPayload::EdgeAssertion(signed) => self.ingest_edge(signed.clone()),
            GossipPayload::Revocation { from, to, nonce } => {
                if message.sender != *from {
                    return Err(EngineError::UnauthorizedRevocation {
                        sender: message.sender,
                        from: *from,
                        to: *to,
                    });
                }
                self.ingest_revocation(*from, *to, *nonce, now)
            }
        }
    }

    /// Store an edge asserted elsewhere after checking its signature and nonce
    pub fn ingest_edge(&mut self, signed: SignedEdge) -> Result<GraphChange> {
        let edge = signed.edge;
        edge.validate()?;
        self.registry
            .verify(edge.from, &edge.signing_bytes(), &signed.signature)?;

        let graph = self.graph.load()?;
        if let Some(stored) = graph.edge(edge.from, edge.to) {
            if *stored == edge {
                return Ok(GraphChange::None);
            }
            if stored.nonce >= edge.nonce {
                return Err(EngineError::StaleNonce {
                    from: edge.from,
                    to: edge.to,
                    nonce: edge.nonce,
                    stored: stored.nonce,
                });
            }
        }
        if let Some(revocation) = graph.revocation(edge.from, edge.to) {
            if revocation.nonce >= edge.nonce {
                return Err(EngineError::StaleNonce {
                    from: edge.from,
                    to: edge.to,
                    nonce: edge.nonce,
                    stored: revocation.nonce,
                });
            }
        }

        self.graph.add_signed_edge(signed)?;
        debug!(from = %edge.from, to = %edge.to, nonce = edge.nonce, "Ingested trust edge");
        Ok(GraphChange::Upserted(edge))
    }

    fn ingest_revocation(&mut self, from: NodeId, to: NodeId, nonce: u64, now: Timestamp) -> Result<GraphChange> {
        let graph = self.graph.load()?;
        let Some(stored) = graph.edge(from, to) else {
            return Ok(GraphChange::None);
        };
        if stored.nonce > nonce {
            return Err(EngineError::StaleNonce {
                from,
                to,
                nonce,
                stored: stored.nonce,
            });
        }
        let removed = self.graph.remove_edge(from, to, now)?;
        Ok(GraphChange::Removed(removed))
    }

    /// Sustained low coverage, raised as an alert
    pub fn check_coverage(&mut self) -> Option<AnomalyScore> {
        let anomaly = self.gossip.check_coverage(self.now())?;
        self.alerts.emit(anomaly);
        Some(anomaly)
    }

    pub fn coverage(&self) -> f64 {
        self.gossip.coverage(self.now())
    }

    pub fn gossip(&self) -> &GossipPropagator {
        &self.gossip
    }

    /// Put every registered node in the graph, edges or not
    fn add_registered_nodes(&mut self) -> Result<Vec<NodeId>> {
        let nodes: Vec<NodeId> = (0..self.registry.len() as u32).map(NodeId).collect();
        let graph = self.graph.load()?;
        for &node in &nodes {
            graph.add_node(node);
        }
        Ok(nodes)
    }

    // Detection

    /// Betrayal detection from `source`; members of any cycle found are alerted
    pub fn detect_betrayal(&mut self, source: NodeId) -> Result<BetrayalReport> {
        let now = self.now();
        let graph = self.graph.load()?;
        let reweighted = self
            .belief_weights
            .as_ref()
            .map(|outcome| Self::reweighted(&self.belief, graph, outcome));
        let graph = reweighted.as_ref().unwrap_or(&*graph);

        let report = self.detector.detect(graph, source, now);
        self.findings
            .retain(|_, finding| self.detector.confirms(graph, &finding.evidence, now));
        self.record_report(&report, now);
        Ok(report)
    }

    /// Detection from every node, run in parallel
    pub fn scan_betrayal(&mut self) -> Result<Vec<BetrayalReport>> {
        let now = self.now();
        let graph = self.graph.load()?;
        let reweighted = self
            .belief_weights
            .as_ref()
            .map(|outcome| Self::reweighted(&self.belief, graph, outcome));
        let graph = reweighted.as_ref().unwrap_or(&*graph);

        let sources: Vec<NodeId> = graph.nodes().collect();
        let reports = self.detector.scan(graph, &sources, now);
        self.findings
            .retain(|_, finding| self.detector.confirms(graph, &finding.evidence, now));
        for report in &reports {
            self.record_report(report, now);
        }
        Ok(reports)
    }

    fn reweighted(belief: &BeliefPropagation, graph: &Graph, outcome: &BeliefOutcome) -> Graph {
        let mut copy = graph.clone();
        belief.feedback(&mut copy, outcome);
        copy
    }

    fn record_report(&mut self, report: &BetrayalReport, now: Timestamp) {
        for cycle in &report.cycles {
            for node in cycle.nodes() {
                let finding = Finding {
                    evidence: cycle.clone(),
                    score: report.score,
                    detected_at: now,
                };
                let unchanged = self
                    .findings
                    .get(&node)
                    .map_or(false, |f| f.evidence == finding.evidence && f.score == finding.score);
                self.findings.insert(node, finding);
                if !unchanged {
                    self.alerts
                        .emit(AnomalyScore::new(node, report.score, AnomalyReason::NegativeCycle));
                }
            }
        }
    }

    /// Encoded evidence of the latest cycle found through `node`
    pub fn betrayal_evidence(&self, node: NodeId) -> Option<Vec<u8>> {
        self.findings.get(&node).map(|f| f.evidence.encode())
    }

    pub fn betrayal_evidence_for(&self, did: &Did) -> Result<Option<Vec<u8>>> {
        Ok(self.betrayal_evidence(self.resolve(did)?))
    }

    /// Nodes currently on a recorded betrayal cycle
    pub fn flagged(&self) -> Vec<NodeId> {
        self.findings.keys().copied().collect()
    }

    /// Enforcement record accusing `node` of cycle membership
    pub fn slash_signal(&mut self, node: NodeId) -> Result<SlashSignal> {
        let finding = self
            .findings
            .get(&node)
            .ok_or(DetectionError::NoEvidence(node))?;
        let target = self.registry.did(node).ok_or(EngineError::UnknownNode(node))?;

        self.slash_nonce += 1;
        let anomaly = AnomalyScore::new(node, finding.score, AnomalyReason::NegativeCycle);
        let signal = SlashSignal::for_cycle(target, &finding.evidence, &anomaly, self.clock.now(), self.slash_nonce);
        warn!(
            %node,
            severity = signal.severity,
            detected_at = finding.detected_at,
            "Issued slash signal"
        );
        Ok(signal)
    }

    /// Belief propagation over the current graph.
    ///
    /// Divergent nodes at alert level are raised. With feedback enabled the
    /// beliefs are kept and later detection runs see a reweighted copy of the
    /// graph; paths, proofs and gossip keep the asserted edges.
    pub fn run_belief(&mut self) -> Result<BeliefOutcome> {
        let now = self.now();
        let graph = self.graph.load()?;
        let outcome = self.belief.run(graph, now);

        for anomaly in self.belief.anomalies(&outcome) {
            if anomaly.is_alert() {
                self.alerts.emit(anomaly);
            }
        }
        if self.belief_feedback {
            self.belief_weights = Some(outcome.clone());
            debug!(iterations = outcome.iterations, "Kept beliefs for detection feedback");
        }
        Ok(outcome)
    }

    /// Forget belief feedback and reload the graph from the repository
    pub fn reload_graph(&mut self) -> Result<()> {
        self.belief_weights = None;
        self.graph.invalidate();
        self.add_registered_nodes()?;
        Ok(())
    }

    // Paths

    pub fn find_path(&mut self, source: NodeId, target: NodeId) -> Result<SearchResult> {
        let now = self.now();
        let graph = self.graph.load()?;
        let result = if self.reputation_heuristic {
            let heuristic = ReputationHeuristic::new(&self.ledger, now);
            self.pathfinder.find_path(graph, source, target, &heuristic, now)
        } else {
            self.pathfinder.find_path(graph, source, target, &ZeroHeuristic, now)
        };
        Ok(result)
    }

    /// Find a path from the local node to `target` and sign a proof of it.
    ///
    /// `Ok(None)` when the search finds nothing.
    pub fn prove_path(&mut self, target: NodeId) -> Result<Option<ProofOfPath>> {
        let result = self.find_path(self.local(), target)?;
        let PathOutcome::Found(path) = result.outcome else {
            debug!(%target, outcome = ?result.outcome, "No path to prove");
            return Ok(None);
        };

        let now = self.now();
        let graph = self.graph.load()?;
        let entropy = EntropyStamp::new(now, rand::random());
        let proof = ProofOfPath::build(&path, graph, &self.keypair, now, entropy)?;
        debug!(%target, hops = proof.hop_count(), "Built proof of path");
        Ok(Some(proof))
    }

    /// Verify proof bytes and record the verdict against the sender
    pub fn verify_proof(&mut self, bytes: &[u8]) -> Result<Verification> {
        let now = self.now();
        let graph = self.graph.load()?;
        Ok(self
            .verifier
            .verify(bytes, graph, &self.registry, &mut self.ledger, now)?)
    }

    // Persistence and reporting

    /// Write reputation records to the repository
    pub fn persist(&self) -> Result<usize> {
        Ok(self.ledger.persist(self.graph.repository())?)
    }

    /// Reload reputation records and the graph from the repository
    pub fn restore(&mut self) -> Result<usize> {
        let count = self.ledger.restore(self.graph.repository())?;
        self.reload_graph()?;
        Ok(count)
    }

    pub fn statistics(&mut self) -> Result<EngineStatistics> {
        let coverage = self.coverage();
        let graph = self.graph.load()?;
        Ok(EngineStatistics {
            local: self.keypair.node_id().as_u32(),
            registered: self.registry.len(),
            nodes: graph.node_count(),
            edges: graph.edge_count(),
            flagged: self.findings.len(),
            alerts: self.alerts.len(),
            gossip_seen: self.gossip.seen_count(),
            coverage,
            reputation: self.ledger.statistics(),
        })
    }

    /// Prometheus text exposition of the engine's registry
    pub fn gather_metrics(&self) -> String {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&self.metrics.gather(), &mut buffer) {
            warn!("Failed to encode metrics: {}", e);
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}
