//! Engine configuration loading and validation

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use trustmesh_core::NANOS_PER_SEC;
use trustmesh_detection::{BeliefConfig, BetrayalConfig};
use trustmesh_gossip::GossipConfig;
use trustmesh_graph::SledConfig;
use trustmesh_pathfinding::{PathConfig, VerifierConfig};
use trustmesh_reputation::LedgerConfig;

/// Complete engine configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub node: NodeSection,

    #[serde(default)]
    pub storage: StorageSection,

    #[serde(default)]
    pub betrayal: BetrayalSection,

    #[serde(default)]
    pub belief: BeliefSection,

    #[serde(default)]
    pub reputation: ReputationSection,

    #[serde(default)]
    pub pathfinding: PathfindingSection,

    #[serde(default)]
    pub gossip: GossipSection,

    #[serde(default)]
    pub verifier: VerifierSection,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NodeSection {
    #[serde(default = "default_node_id")]
    pub id: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Seed file of the local keypair
    #[serde(default = "default_key_path")]
    pub key_path: PathBuf,
    #[serde(default = "default_true")]
    pub auto_generate_keys: bool,
    /// Hex DIDs registered in this order at startup, so handles agree across
    /// nodes sharing the list
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default = "default_command_buffer")]
    pub command_buffer: usize,
    #[serde(default = "default_alert_capacity")]
    pub alert_capacity: usize,
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
    #[serde(default = "default_stats_interval")]
    pub stats_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageSection {
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
    #[serde(default = "default_cache_mb")]
    pub cache_mb: u64,
    #[serde(default = "default_flush_every_ms")]
    pub flush_every_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BetrayalSection {
    /// Relaxation pass cap; omitted runs the full |V|-1 passes
    #[serde(default)]
    pub max_passes: Option<usize>,
    #[serde(default = "default_score_per_member")]
    pub score_per_member: f64,
    #[serde(default = "default_scan_interval")]
    pub scan_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BeliefSection {
    #[serde(default = "default_prior")]
    pub prior: f64,
    #[serde(default = "default_half")]
    pub message_damping: f64,
    #[serde(default = "default_half")]
    pub belief_damping: f64,
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    #[serde(default = "default_divergence_cutoff")]
    pub divergence_cutoff: f64,
    /// Reweight edges by belief before the next betrayal scan
    #[serde(default)]
    pub feedback: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReputationSection {
    #[serde(default = "default_damping")]
    pub damping: f64,
    #[serde(default = "default_half_life_days")]
    pub half_life_days: f64,
    #[serde(default = "default_min_score")]
    pub min_score: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PathfindingSection {
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    #[serde(default)]
    pub min_trust_level: i8,
    /// Guide A* by reputation instead of running plain Dijkstra
    #[serde(default = "default_true")]
    pub reputation_heuristic: bool,
    /// Lifetime of edges asserted by this node
    #[serde(default = "default_edge_ttl")]
    pub edge_ttl_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GossipSection {
    #[serde(default = "default_forward_probability")]
    pub forward_probability: f64,
    #[serde(default = "default_reference_count")]
    pub reference_count: usize,
    #[serde(default = "default_gossip_seen")]
    pub seen_capacity: usize,
    #[serde(default = "default_pool_capacity")]
    pub pool_capacity: usize,
    #[serde(default = "default_replay_window")]
    pub replay_window_secs: u64,
    #[serde(default = "default_activity_window")]
    pub activity_window_secs: u64,
    #[serde(default = "default_half")]
    pub coverage_threshold: f64,
    #[serde(default = "default_low_coverage_window")]
    pub low_coverage_window_secs: u64,
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VerifierSection {
    #[serde(default = "default_max_proof_age")]
    pub max_proof_age_secs: u64,
    #[serde(default = "default_verifier_seen")]
    pub seen_capacity: usize,
}

// Default value functions
fn default_true() -> bool { true }
fn default_half() -> f64 { 0.5 }
fn default_node_id() -> String { "trustmesh-node".to_string() }
fn default_data_dir() -> PathBuf { PathBuf::from("./data") }
fn default_log_level() -> String { "info".to_string() }
fn default_key_path() -> PathBuf { PathBuf::from("keys/node.key") }
fn default_command_buffer() -> usize { 256 }
fn default_alert_capacity() -> usize { 1000 }
fn default_stats_interval() -> u64 { 60 }
fn default_storage_path() -> PathBuf { PathBuf::from("trustmesh.db") }
fn default_cache_mb() -> u64 { 4 }
fn default_flush_every_ms() -> u64 { 1000 }
fn default_score_per_member() -> f64 { 0.2 }
fn default_scan_interval() -> u64 { 30 }
fn default_prior() -> f64 { 0.5 }
fn default_epsilon() -> f64 { 1e-4 }
fn default_max_iterations() -> usize { 100 }
fn default_divergence_cutoff() -> f64 { 0.3 }
fn default_damping() -> f64 { 0.7 }
fn default_half_life_days() -> f64 { 30.0 }
fn default_min_score() -> f64 { 1e-6 }
fn default_max_depth() -> usize { 8 }
fn default_edge_ttl() -> u64 { 7 * 24 * 3600 }
fn default_forward_probability() -> f64 { 0.7 }
fn default_reference_count() -> usize { 3 }
fn default_gossip_seen() -> usize { 4096 }
fn default_pool_capacity() -> usize { 256 }
fn default_replay_window() -> u64 { 60 }
fn default_activity_window() -> u64 { 30 }
fn default_low_coverage_window() -> u64 { 60 }
fn default_heartbeat_interval() -> u64 { 10 }
fn default_max_proof_age() -> u64 { 3600 }
fn default_verifier_seen() -> usize { 10_000 }

impl Default for NodeSection {
    fn default() -> Self {
        Self {
            id: default_node_id(),
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            key_path: default_key_path(),
            auto_generate_keys: true,
            members: Vec::new(),
            command_buffer: default_command_buffer(),
            alert_capacity: default_alert_capacity(),
            metrics_enabled: true,
            stats_interval_secs: default_stats_interval(),
        }
    }
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
            cache_mb: default_cache_mb(),
            flush_every_ms: default_flush_every_ms(),
        }
    }
}

impl Default for BetrayalSection {
    fn default() -> Self {
        Self {
            max_passes: None,
            score_per_member: default_score_per_member(),
            scan_interval_secs: default_scan_interval(),
        }
    }
}

impl Default for BeliefSection {
    fn default() -> Self {
        Self {
            prior: default_prior(),
            message_damping: default_half(),
            belief_damping: default_half(),
            epsilon: default_epsilon(),
            max_iterations: default_max_iterations(),
            divergence_cutoff: default_divergence_cutoff(),
            feedback: false,
        }
    }
}

impl Default for ReputationSection {
    fn default() -> Self {
        Self {
            damping: default_damping(),
            half_life_days: default_half_life_days(),
            min_score: default_min_score(),
        }
    }
}

impl Default for PathfindingSection {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            min_trust_level: 0,
            reputation_heuristic: true,
            edge_ttl_secs: default_edge_ttl(),
        }
    }
}

impl Default for GossipSection {
    fn default() -> Self {
        Self {
            forward_probability: default_forward_probability(),
            reference_count: default_reference_count(),
            seen_capacity: default_gossip_seen(),
            pool_capacity: default_pool_capacity(),
            replay_window_secs: default_replay_window(),
            activity_window_secs: default_activity_window(),
            coverage_threshold: default_half(),
            low_coverage_window_secs: default_low_coverage_window(),
            heartbeat_interval_secs: default_heartbeat_interval(),
        }
    }
}

impl Default for VerifierSection {
    fn default() -> Self {
        Self {
            max_proof_age_secs: default_max_proof_age(),
            seen_capacity: default_verifier_seen(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read configuration file {:?}", path.as_ref()))?;

        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("Failed to parse configuration file")
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.node.command_buffer == 0 {
            bail!("node.command_buffer must be positive");
        }
        for member in &self.node.members {
            if member.len() != 64 || hex::decode(member).is_err() {
                bail!("node.members entry {:?} is not a 32-byte hex DID", member);
            }
        }

        if !(self.betrayal.score_per_member > 0.0 && self.betrayal.score_per_member <= 1.0) {
            bail!("betrayal.score_per_member must be within (0, 1]");
        }

        let belief = &self.belief;
        for (name, value) in [
            ("belief.prior", belief.prior),
            ("belief.message_damping", belief.message_damping),
            ("belief.belief_damping", belief.belief_damping),
            ("belief.divergence_cutoff", belief.divergence_cutoff),
        ] {
            if !(0.0..=1.0).contains(&value) {
                bail!("{} must be within [0, 1]", name);
            }
        }
        if belief.epsilon <= 0.0 {
            bail!("belief.epsilon must be positive");
        }

        if !(self.reputation.half_life_days > 0.0 && self.reputation.half_life_days.is_finite()) {
            bail!("reputation.half_life_days must be positive");
        }
        self.ledger_config().validate()?;

        if !(-7..=7).contains(&self.pathfinding.min_trust_level) {
            bail!("pathfinding.min_trust_level must be within -7..=7");
        }
        if self.pathfinding.max_depth == 0 {
            bail!("pathfinding.max_depth must be positive");
        }

        let gossip = &self.gossip;
        if !(0.0..=1.0).contains(&gossip.forward_probability) {
            bail!("gossip.forward_probability must be within [0, 1]");
        }
        if !(0.0..=1.0).contains(&gossip.coverage_threshold) {
            bail!("gossip.coverage_threshold must be within [0, 1]");
        }
        if gossip.seen_capacity == 0 || gossip.pool_capacity == 0 {
            bail!("gossip capacities must be positive");
        }
        if gossip.heartbeat_interval_secs == 0 {
            bail!("gossip.heartbeat_interval_secs must be positive");
        }

        if self.verifier.max_proof_age_secs == 0 {
            bail!("verifier.max_proof_age_secs must be positive");
        }

        Ok(())
    }

    /// Get absolute data directory path
    pub fn data_dir(&self) -> PathBuf {
        if self.node.data_dir.is_absolute() {
            self.node.data_dir.clone()
        } else {
            std::env::current_dir()
                .unwrap_or_default()
                .join(&self.node.data_dir)
        }
    }

    /// Get absolute storage path
    pub fn storage_path(&self) -> PathBuf {
        if self.storage.path.is_absolute() {
            self.storage.path.clone()
        } else {
            self.data_dir().join(&self.storage.path)
        }
    }

    /// Get absolute key path
    pub fn key_path(&self) -> PathBuf {
        if self.node.key_path.is_absolute() {
            self.node.key_path.clone()
        } else {
            self.data_dir().join(&self.node.key_path)
        }
    }

    pub fn sled_config(&self) -> SledConfig {
        SledConfig {
            path: self.storage_path(),
            cache_mb: self.storage.cache_mb,
            flush_every_ms: (self.storage.flush_every_ms > 0).then_some(self.storage.flush_every_ms),
        }
    }

    pub fn betrayal_config(&self) -> BetrayalConfig {
        BetrayalConfig {
            max_passes: self.betrayal.max_passes,
            score_per_member: self.betrayal.score_per_member,
        }
    }

    pub fn belief_config(&self) -> BeliefConfig {
        BeliefConfig {
            prior: self.belief.prior,
            message_damping: self.belief.message_damping,
            belief_damping: self.belief.belief_damping,
            epsilon: self.belief.epsilon,
            max_iterations: self.belief.max_iterations,
            divergence_cutoff: self.belief.divergence_cutoff,
        }
    }

    pub fn ledger_config(&self) -> LedgerConfig {
        LedgerConfig {
            damping: self.reputation.damping,
            half_life: Duration::try_from_secs_f64(self.reputation.half_life_days * 24.0 * 3600.0)
                .unwrap_or(Duration::ZERO),
            min_score: self.reputation.min_score,
            ..Default::default()
        }
    }

    pub fn path_config(&self) -> PathConfig {
        PathConfig {
            max_depth: self.pathfinding.max_depth,
            min_trust_level: self.pathfinding.min_trust_level,
        }
    }

    pub fn gossip_config(&self) -> GossipConfig {
        let g = &self.gossip;
        GossipConfig {
            forward_probability: g.forward_probability,
            reference_count: g.reference_count,
            seen_capacity: g.seen_capacity,
            pool_capacity: g.pool_capacity,
            replay_window: g.replay_window_secs * NANOS_PER_SEC,
            activity_window: g.activity_window_secs * NANOS_PER_SEC,
            coverage_threshold: g.coverage_threshold,
            low_coverage_window: g.low_coverage_window_secs * NANOS_PER_SEC,
        }
    }

    pub fn verifier_config(&self) -> VerifierConfig {
        VerifierConfig {
            max_proof_age: self.verifier.max_proof_age_secs * NANOS_PER_SEC,
            seen_capacity: self.verifier.seen_capacity,
        }
    }

    pub fn edge_ttl(&self) -> u64 {
        self.pathfinding.edge_ttl_secs.saturating_mul(NANOS_PER_SEC)
    }
}
