//! Reputation ledger
//!
//! One record per node, created at its first verification and never deleted.
//! Each verification blends the node's success rate into its score:
//!
//! ```text
//! score = damping × decayed(old) + (1 − damping) × successful / total
//! ```
//!
//! Stored scores are not rewritten as time passes. Decay is applied on read:
//!
//! ```text
//! decayed = max(min_score, score × 0.5^((now − last_verified) / half_life))
//! ```
//!
//! The ledger is not internally synchronised; its owner serialises mutation.

use crate::error::Result;
use crate::metrics::LedgerMetrics;
use crate::types::{LedgerConfig, LedgerStatistics};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use trustmesh_core::traits::ScoreRepository;
use trustmesh_core::{damped_update, Clock, NodeId, PopVerdict, ReputationScore, SystemClock, Timestamp};

/// Decay multiplier after `elapsed` nanoseconds.
///
/// Lies in (0, 1] and is non-increasing in `elapsed`.
pub fn decay_factor(elapsed: u64, half_life: Duration) -> f64 {
    let half_life = half_life.as_nanos() as f64;
    if elapsed == 0 || half_life <= 0.0 {
        return 1.0;
    }
    0.5f64.powf(elapsed as f64 / half_life)
}

pub struct ReputationLedger {
    scores: HashMap<NodeId, ReputationScore>,
    config: LedgerConfig,
    clock: Arc<dyn Clock>,
    metrics: Option<LedgerMetrics>,
}

impl ReputationLedger {
    /// Ledger with default configuration on the wall clock
    pub fn new() -> Self {
        Self::with_clock(LedgerConfig::default(), Arc::new(SystemClock))
    }

    pub fn with_clock(config: LedgerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            scores: HashMap::new(),
            config,
            clock,
            metrics: None,
        }
    }

    /// Record every update in `metrics`
    pub fn with_metrics(mut self, metrics: LedgerMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Apply a verification outcome for `node` observed at `timestamp`
    pub fn update(&mut self, node: NodeId, verdict: &PopVerdict, timestamp: Timestamp) -> ReputationScore {
        let config = &self.config;
        let record = self
            .scores
            .entry(node)
            .or_insert_with(|| ReputationScore::new(node, timestamp));

        let elapsed = timestamp.saturating_sub(record.last_verified);
        let old = (record.score * decay_factor(elapsed, config.half_life)).max(config.min_score);

        record.total_checks += 1;
        if verdict.is_valid() {
            record.successful_checks += 1;
        }

        let observed = record.successful_checks as f64 / record.total_checks as f64;
        record.score = damped_update(old, observed, config.damping).clamp(config.min_score, 1.0);
        record.last_verified = record.last_verified.max(timestamp);

        debug!(
            %node,
            %verdict,
            score = record.score,
            total = record.total_checks,
            successful = record.successful_checks,
            "Reputation updated"
        );

        let updated = *record;
        if let Some(metrics) = &self.metrics {
            metrics.record_update(verdict, updated.score);
            metrics.record_totals(self.scores.len(), self.mean_stored_score());
        }
        updated
    }

    /// Score of `node` decayed to `now` under `half_life`; pure
    pub fn decay(&self, node: NodeId, now: Timestamp, half_life: Duration) -> f64 {
        match self.scores.get(&node) {
            Some(record) => {
                let elapsed = now.saturating_sub(record.last_verified);
                (record.score * decay_factor(elapsed, half_life)).max(self.config.min_score)
            }
            None => self.config.initial_score,
        }
    }

    /// Current score: decayed to the clock's now, 0.5 for unknown nodes
    pub fn get(&self, node: NodeId) -> f64 {
        self.get_at(node, self.clock.now())
    }

    pub fn get_at(&self, node: NodeId, now: Timestamp) -> f64 {
        self.decay(node, now, self.config.half_life)
    }

    /// Stored record, without decay
    pub fn record(&self, node: NodeId) -> Option<&ReputationScore> {
        self.scores.get(&node)
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.scores.contains_key(&node)
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Highest decayed scores first
    pub fn ranked(&self, limit: usize) -> Vec<(NodeId, f64)> {
        let now = self.clock.now();
        let mut nodes: Vec<(NodeId, f64)> = self
            .scores
            .keys()
            .map(|&node| (node, self.get_at(node, now)))
            .collect();

        nodes.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        nodes.truncate(limit);
        nodes
    }

    pub fn statistics(&self) -> LedgerStatistics {
        let now = self.clock.now();
        let mut stats = LedgerStatistics::default();
        if self.scores.is_empty() {
            return stats;
        }

        stats.lowest_score = f64::MAX;
        for record in self.scores.values() {
            let score = self.get_at(record.node, now);
            stats.tracked_nodes += 1;
            stats.total_checks += record.total_checks;
            stats.successful_checks += record.successful_checks;
            stats.average_score += score;
            stats.highest_score = stats.highest_score.max(score);
            stats.lowest_score = stats.lowest_score.min(score);
        }
        stats.average_score /= stats.tracked_nodes as f64;
        stats
    }

    /// Write every record to `repo`, returning the number written
    pub fn persist(&self, repo: &dyn ScoreRepository) -> Result<usize> {
        for record in self.scores.values() {
            repo.put_score(record)?;
        }
        repo.sync()?;
        info!(count = self.scores.len(), "Persisted reputation ledger");
        Ok(self.scores.len())
    }

    /// Replace the in-memory records with those in `repo`
    pub fn restore(&mut self, repo: &dyn ScoreRepository) -> Result<usize> {
        let records = repo.load_scores()?;
        self.scores = records.into_iter().map(|r| (r.node, r)).collect();

        if let Some(metrics) = &self.metrics {
            metrics.record_totals(self.scores.len(), self.mean_stored_score());
        }
        info!(count = self.scores.len(), "Restored reputation ledger");
        Ok(self.scores.len())
    }

    fn mean_stored_score(&self) -> f64 {
        if self.scores.is_empty() {
            return 0.0;
        }
        self.scores.values().map(|r| r.score).sum::<f64>() / self.scores.len() as f64
    }
}

impl Default for ReputationLedger {
    fn default() -> Self {
        Self::new()
    }
}
