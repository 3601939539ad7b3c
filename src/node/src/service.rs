//! Engine service
//!
//! One tokio task owns the [`TrustEngine`] and handles commands from an mpsc
//! channel in arrival order; [`EngineHandle`] is the cloneable async front.
//! The same task runs periodic maintenance (heartbeats, coverage checks,
//! belief propagation and betrayal detection from the local node).
//!
//! Outgoing gossip is sent from spawned tasks so the engine never waits on the
//! transport. A receiver task feeds incoming gossip back in as commands.

use crate::config::EngineConfig;
use crate::engine::{EngineStatistics, GossipReceipt, Outbound, TrustEngine};
use crate::error::{EngineError, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use trustmesh_core::traits::{EdgeRepository, ScoreRepository, Transport};
use trustmesh_core::NodeId;
use trustmesh_crypto::Did;
use trustmesh_detection::{AlertLog, BeliefOutcome, BetrayalReport, SlashSignal};
use trustmesh_gossip::MessageId;
use trustmesh_pathfinding::{SearchResult, Verification};

type Reply<T> = oneshot::Sender<Result<T>>;

/// Service timing
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub command_buffer: usize,
    pub heartbeat_interval: Duration,
    pub maintenance_interval: Duration,
    pub stats_interval: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

impl From<&EngineConfig> for ServiceConfig {
    fn from(config: &EngineConfig) -> Self {
        Self {
            command_buffer: config.node.command_buffer.max(1),
            heartbeat_interval: Duration::from_secs(config.gossip.heartbeat_interval_secs.max(1)),
            maintenance_interval: Duration::from_secs(config.betrayal.scan_interval_secs.max(1)),
            stats_interval: Duration::from_secs(config.node.stats_interval_secs.max(1)),
        }
    }
}

enum Command {
    RegisterNode { did: Did, reply: Reply<NodeId> },
    TrustScore { did: Did, reply: Reply<f64> },
    AssertEdge { to: NodeId, risk: f64, reply: Reply<MessageId> },
    RevokeEdge { to: NodeId, reply: Reply<MessageId> },
    Gossip { peer: NodeId, bytes: Vec<u8>, reply: Option<Reply<GossipReceipt>> },
    DetectBetrayal { source: NodeId, reply: Reply<BetrayalReport> },
    ScanBetrayal { reply: Reply<Vec<BetrayalReport>> },
    Evidence { did: Did, reply: Reply<Option<Vec<u8>>> },
    Slash { node: NodeId, reply: Reply<SlashSignal> },
    RunBelief { reply: Reply<BeliefOutcome> },
    FindPath { source: NodeId, target: NodeId, reply: Reply<SearchResult> },
    ProvePath { target: NodeId, reply: Reply<Option<Vec<u8>>> },
    VerifyProof { bytes: Vec<u8>, reply: Reply<Verification> },
    Statistics { reply: Reply<EngineStatistics> },
    Persist { reply: Reply<usize> },
    Shutdown { reply: Reply<usize> },
}

/// Cloneable front to a running [`EngineService`]
#[derive(Clone)]
pub struct EngineHandle {
    commands: mpsc::Sender<Command>,
    alerts: Arc<AlertLog>,
    local: NodeId,
}

impl EngineHandle {
    async fn request<T>(&self, command: impl FnOnce(Reply<T>) -> Command) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| EngineError::ServiceClosed)?;
        response.await.map_err(|_| EngineError::ServiceClosed)?
    }

    pub fn local(&self) -> NodeId {
        self.local
    }

    /// Alert log shared with the service; subscribe for the live stream
    pub fn alerts(&self) -> Arc<AlertLog> {
        self.alerts.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    pub async fn register_node(&self, did: Did) -> Result<NodeId> {
        self.request(|reply| Command::RegisterNode { did, reply }).await
    }

    pub async fn trust_score(&self, did: Did) -> Result<f64> {
        self.request(|reply| Command::TrustScore { did, reply }).await
    }

    /// Assert and gossip an edge from the local node; returns the message id
    pub async fn assert_edge(&self, to: NodeId, risk: f64) -> Result<MessageId> {
        self.request(|reply| Command::AssertEdge { to, risk, reply }).await
    }

    pub async fn revoke_edge(&self, to: NodeId) -> Result<MessageId> {
        self.request(|reply| Command::RevokeEdge { to, reply }).await
    }

    /// Hand over gossip bytes and wait for the outcome
    pub async fn handle_gossip(&self, peer: NodeId, bytes: Vec<u8>) -> Result<GossipReceipt> {
        self.request(|reply| Command::Gossip {
            peer,
            bytes,
            reply: Some(reply),
        })
        .await
    }

    /// Hand over gossip bytes without waiting
    pub async fn submit_gossip(&self, peer: NodeId, bytes: Vec<u8>) -> Result<()> {
        self.commands
            .send(Command::Gossip {
                peer,
                bytes,
                reply: None,
            })
            .await
            .map_err(|_| EngineError::ServiceClosed)
    }

    pub async fn detect_betrayal(&self, source: NodeId) -> Result<BetrayalReport> {
        self.request(|reply| Command::DetectBetrayal { source, reply }).await
    }

    pub async fn scan_betrayal(&self) -> Result<Vec<BetrayalReport>> {
        self.request(|reply| Command::ScanBetrayal { reply }).await
    }

    pub async fn betrayal_evidence(&self, did: Did) -> Result<Option<Vec<u8>>> {
        self.request(|reply| Command::Evidence { did, reply }).await
    }

    pub async fn slash_signal(&self, node: NodeId) -> Result<SlashSignal> {
        self.request(|reply| Command::Slash { node, reply }).await
    }

    pub async fn run_belief(&self) -> Result<BeliefOutcome> {
        self.request(|reply| Command::RunBelief { reply }).await
    }

    pub async fn find_path(&self, source: NodeId, target: NodeId) -> Result<SearchResult> {
        self.request(|reply| Command::FindPath { source, target, reply }).await
    }

    /// Serialized proof of a path from the local node, if one exists
    pub async fn prove_path(&self, target: NodeId) -> Result<Option<Vec<u8>>> {
        self.request(|reply| Command::ProvePath { target, reply }).await
    }

    pub async fn verify_proof(&self, bytes: Vec<u8>) -> Result<Verification> {
        self.request(|reply| Command::VerifyProof { bytes, reply }).await
    }

    pub async fn statistics(&self) -> Result<EngineStatistics> {
        self.request(|reply| Command::Statistics { reply }).await
    }

    pub async fn persist(&self) -> Result<usize> {
        self.request(|reply| Command::Persist { reply }).await
    }

    /// Persist scores and stop the service
    pub async fn shutdown(&self) -> Result<usize> {
        self.request(|reply| Command::Shutdown { reply }).await
    }
}

pub struct EngineService<R> {
    engine: TrustEngine<R>,
    transport: Arc<dyn Transport>,
    commands: mpsc::Receiver<Command>,
    config: ServiceConfig,
}

impl<R> EngineService<R>
where
    R: EdgeRepository + ScoreRepository + Send + 'static,
{
    /// Start the service and its gossip receiver
    pub fn spawn(
        engine: TrustEngine<R>,
        transport: Arc<dyn Transport>,
        config: ServiceConfig,
    ) -> (EngineHandle, JoinHandle<Result<()>>) {
        let (tx, rx) = mpsc::channel(config.command_buffer);
        let handle = EngineHandle {
            commands: tx,
            alerts: engine.alerts(),
            local: engine.local(),
        };

        let service = Self {
            engine,
            transport: transport.clone(),
            commands: rx,
            config,
        };
        let task = tokio::spawn(service.run());
        Self::spawn_receiver(transport, handle.clone());

        (handle, task)
    }

    fn spawn_receiver(transport: Arc<dyn Transport>, handle: EngineHandle) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    received = transport.receive() => match received {
                        Ok((peer, bytes)) => {
                            if handle.submit_gossip(peer, bytes).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            debug!("Gossip receiver stopped: {}", e);
                            break;
                        }
                    },
                    _ = handle.commands.closed() => break,
                }
            }
        })
    }

    async fn run(mut self) -> Result<()> {
        info!(local = %self.engine.local(), "Engine service started");

        let start = Instant::now();
        let mut heartbeat = interval_at(start + self.config.heartbeat_interval, self.config.heartbeat_interval);
        let mut maintenance = interval_at(start + self.config.maintenance_interval, self.config.maintenance_interval);
        let mut stats = interval_at(start + self.config.stats_interval, self.config.stats_interval);
        for ticker in [&mut heartbeat, &mut maintenance, &mut stats] {
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        }

        loop {
            tokio::select! {
                command = self.commands.recv() => {
                    let Some(command) = command else {
                        break;
                    };
                    if let Some(reply) = self.dispatch(command) {
                        let persisted = self.engine.persist();
                        info!("Engine service stopping");
                        let _ = reply.send(persisted);
                        return Ok(());
                    }
                }
                _ = heartbeat.tick() => self.heartbeat(),
                _ = maintenance.tick() => self.maintain(),
                _ = stats.tick() => self.log_statistics(),
            }
        }

        // Every handle dropped
        self.engine.persist()?;
        info!("Engine service stopped");
        Ok(())
    }

    /// Handle one command; returns the reply channel on shutdown
    fn dispatch(&mut self, command: Command) -> Option<Reply<usize>> {
        let engine = &mut self.engine;
        match command {
            Command::RegisterNode { did, reply } => {
                let _ = reply.send(engine.register_node(did));
            }
            Command::TrustScore { did, reply } => {
                let _ = reply.send(engine.trust_score(&did));
            }
            Command::AssertEdge { to, risk, reply } => {
                let result = engine.assert_edge(to, risk).map(|out| self.send(out));
                let _ = reply.send(result);
            }
            Command::RevokeEdge { to, reply } => {
                let result = engine.revoke_edge(to).map(|out| self.send(out));
                let _ = reply.send(result);
            }
            Command::Gossip { peer, bytes, reply } => {
                let result = engine.handle_gossip(&bytes);
                match &result {
                    Ok(receipt) => {
                        if let Some(forward) = receipt.forward.clone() {
                            self.send(forward);
                        }
                    }
                    Err(e) => warn!(%peer, "Rejected gossip: {}", e),
                }
                if let Some(reply) = reply {
                    let _ = reply.send(result);
                }
            }
            Command::DetectBetrayal { source, reply } => {
                let _ = reply.send(engine.detect_betrayal(source));
            }
            Command::ScanBetrayal { reply } => {
                let _ = reply.send(engine.scan_betrayal());
            }
            Command::Evidence { did, reply } => {
                let _ = reply.send(engine.betrayal_evidence_for(&did));
            }
            Command::Slash { node, reply } => {
                let _ = reply.send(engine.slash_signal(node));
            }
            Command::RunBelief { reply } => {
                let _ = reply.send(engine.run_belief());
            }
            Command::FindPath { source, target, reply } => {
                let _ = reply.send(engine.find_path(source, target));
            }
            Command::ProvePath { target, reply } => {
                let result = engine
                    .prove_path(target)
                    .and_then(|proof| proof.map(|p| p.to_bytes()).transpose().map_err(EngineError::from));
                let _ = reply.send(result);
            }
            Command::VerifyProof { bytes, reply } => {
                let _ = reply.send(engine.verify_proof(&bytes));
            }
            Command::Statistics { reply } => {
                let _ = reply.send(engine.statistics());
            }
            Command::Persist { reply } => {
                let _ = reply.send(engine.persist());
            }
            Command::Shutdown { reply } => return Some(reply),
        }
        None
    }

    /// Send gossip from a detached task; returns the message id
    fn send(&self, outbound: Outbound) -> MessageId {
        let id = outbound.message.id;
        if outbound.targets.is_empty() {
            return id;
        }
        let bytes = match outbound.to_bytes() {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(%id, "Failed to encode gossip: {}", e);
                return id;
            }
        };

        let transport = self.transport.clone();
        tokio::spawn(async move {
            for peer in outbound.targets {
                if let Err(e) = transport.send(peer, &bytes).await {
                    warn!(%peer, %id, "Failed to send gossip: {}", e);
                }
            }
        });
        id
    }

    fn heartbeat(&mut self) {
        match self.engine.heartbeat() {
            Ok(outbound) => {
                self.send(outbound);
            }
            Err(e) => warn!("Heartbeat failed: {}", e),
        }
    }

    fn maintain(&mut self) {
        self.engine.check_coverage();

        if let Err(e) = self.engine.run_belief() {
            warn!("Belief propagation failed: {}", e);
        }
        let local = self.engine.local();
        match self.engine.detect_betrayal(local) {
            Ok(report) => debug!(
                cycles = report.cycles.len(),
                passes = report.passes,
                truncated = report.truncated,
                "Periodic betrayal detection"
            ),
            Err(e) => warn!("Betrayal detection failed: {}", e),
        }
    }

    fn log_statistics(&mut self) {
        match self.engine.statistics() {
            Ok(stats) => info!(
                nodes = stats.nodes,
                edges = stats.edges,
                flagged = stats.flagged,
                alerts = stats.alerts,
                coverage = stats.coverage,
                mean_reputation = stats.reputation.average_score,
                "Engine statistics"
            ),
            Err(e) => warn!("Failed to collect statistics: {}", e),
        }
    }
}
