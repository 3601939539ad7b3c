//! Integration tests for the engine service over the in-process network
//!
//! Tests:
//! - Edge assertions and revocations relayed along graph edges
//! - Betrayal alerts on the subscription stream
//! - Proof of path between services
//! - Reputation surviving a shutdown and restart on sled

use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tokio_test::assert_ok;
use trustmesh_core::traits::{EdgeRepository, ScoreRepository};
use trustmesh_core::{AnomalyReason, ManualClock, NodeId, PopVerdict, NANOS_PER_SEC};
use trustmesh_crypto::NodeKeypair;
use trustmesh_graph::{MemoryRepository, SledRepository};
use trustmesh_node::{
    ChannelNetwork, EngineConfig, EngineHandle, EngineService, Result, ServiceConfig, TrustEngine,
};

fn members(n: usize) -> Vec<NodeKeypair> {
    (0..n)
        .map(|i| NodeKeypair::from_seed(NodeId(0), &[i as u8 + 1; 32]))
        .collect()
}

fn config(keys: &[NodeKeypair]) -> EngineConfig {
    let mut config = EngineConfig::default();
    config.node.members = keys.iter().map(|k| k.did().to_hex()).collect();
    config.gossip.forward_probability = 1.0;
    config
}

fn start<R>(
    network: &Arc<ChannelNetwork>,
    keys: &[NodeKeypair],
    local: usize,
    repo: R,
    clock: Arc<ManualClock>,
) -> (EngineHandle, JoinHandle<Result<()>>)
where
    R: EdgeRepository + ScoreRepository + Send + 'static,
{
    let config = config(keys);
    let engine = TrustEngine::new(&config, keys[local].clone(), repo, clock)
        .unwrap()
        .with_gossip_seed(&config, local as u64);
    let transport = Arc::new(network.join(engine.local()));
    EngineService::spawn(engine, transport, ServiceConfig::from(&config))
}

/// Poll `handle` until it holds `edges` edges
async fn wait_for_edges(handle: &EngineHandle, edges: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if handle.statistics().await.unwrap().edges == edges {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {} edges", edges));
}

#[tokio::test]
async fn test_assertions_and_revocations_spread() {
    let keys = members(3);
    let clock = Arc::new(ManualClock::new(NANOS_PER_SEC));
    let network = ChannelNetwork::new();
    let handles: Vec<_> = (0..3)
        .map(|i| start(&network, &keys, i, MemoryRepository::new(), clock.clone()).0)
        .collect();

    // 1 -> 2 lets node 1 relay what it hears from node 0
    assert_ok!(handles[1].assert_edge(NodeId(2), -0.3).await);
    wait_for_edges(&handles[2], 1).await;

    assert_ok!(handles[0].assert_edge(NodeId(1), -0.4).await);
    wait_for_edges(&handles[0], 1).await;
    wait_for_edges(&handles[1], 2).await;
    wait_for_edges(&handles[2], 2).await;

    assert_ok!(handles[0].revoke_edge(NodeId(1)).await);
    wait_for_edges(&handles[0], 0).await;
    wait_for_edges(&handles[1], 1).await;
    wait_for_edges(&handles[2], 1).await;
}

#[tokio::test]
async fn test_betrayal_alerts_are_streamed() {
    let keys = members(3);
    let clock = Arc::new(ManualClock::new(NANOS_PER_SEC));
    let network = ChannelNetwork::new();
    let handles: Vec<_> = (0..3)
        .map(|i| start(&network, &keys, i, MemoryRepository::new(), clock.clone()).0)
        .collect();
    let mut alerts = handles[0].alerts().subscribe();

    // Asserted against the flow so each edge is relayed back to node 0
    handles[2].assert_edge(NodeId(0), -0.8).await.unwrap();
    wait_for_edges(&handles[0], 1).await;
    handles[1].assert_edge(NodeId(2), 0.2).await.unwrap();
    wait_for_edges(&handles[0], 2).await;
    handles[0].assert_edge(NodeId(1), 0.2).await.unwrap();
    wait_for_edges(&handles[0], 3).await;

    let report = handles[0].detect_betrayal(NodeId(0)).await.unwrap();
    assert!(report.has_betrayal());

    let alert = tokio::time::timeout(Duration::from_secs(5), alerts.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(alert.anomaly.reason, AnomalyReason::NegativeCycle);

    let evidence = handles[0].betrayal_evidence(keys[1].did()).await.unwrap();
    assert!(evidence.is_some());
    let signal = handles[0].slash_signal(NodeId(2)).await.unwrap();
    assert_eq!(signal.target, keys[2].did());
}

#[tokio::test]
async fn test_proof_of_path_between_services() {
    let keys = members(3);
    let clock = Arc::new(ManualClock::new(NANOS_PER_SEC));
    let network = ChannelNetwork::new();
    let handles: Vec<_> = (0..3)
        .map(|i| start(&network, &keys, i, MemoryRepository::new(), clock.clone()).0)
        .collect();

    handles[1].assert_edge(NodeId(2), -0.7).await.unwrap();
    wait_for_edges(&handles[2], 1).await;
    handles[0].assert_edge(NodeId(1), -0.7).await.unwrap();
    wait_for_edges(&handles[2], 2).await;

    let proof = handles[0].prove_path(NodeId(1)).await.unwrap().unwrap();
    let verification = handles[2].verify_proof(proof.clone()).await.unwrap();
    assert_eq!(verification.verdict, PopVerdict::Valid);
    assert_eq!(verification.sender, NodeId(0));

    let replay = handles[2].verify_proof(proof).await.unwrap();
    assert_eq!(replay.verdict, PopVerdict::Replay);
}

#[tokio::test]
async fn test_reputation_survives_restart() {
    let temp_dir = TempDir::new().unwrap();
    let keys = members(2);
    let clock = Arc::new(ManualClock::new(NANOS_PER_SEC));
    let network = ChannelNetwork::new();

    let (prover, _) = start(&network, &keys, 0, MemoryRepository::new(), clock.clone());
    let repo = SledRepository::open(temp_dir.path()).unwrap();
    let (verifier, task) = start(&network, &keys, 1, repo, clock.clone());

    prover.assert_edge(NodeId(1), -0.6).await.unwrap();
    wait_for_edges(&verifier, 1).await;

    let proof = prover.prove_path(NodeId(1)).await.unwrap().unwrap();
    let verification = verifier.verify_proof(proof).await.unwrap();
    assert_eq!(verification.verdict, PopVerdict::Valid);
    let score = verifier.trust_score(keys[0].did()).await.unwrap();
    assert!(score > 0.5);

    assert!(verifier.shutdown().await.unwrap() >= 1);
    task.await.unwrap().unwrap();
    assert!(verifier.statistics().await.is_err());

    let repo = SledRepository::open(temp_dir.path()).unwrap();
    let (restarted, _) = start(&network, &keys, 1, repo, clock);
    assert_eq!(restarted.trust_score(keys[0].did()).await.unwrap(), score);
    // The asserted edge came back from storage too
    assert_eq!(restarted.statistics().await.unwrap().edges, 1);
}
